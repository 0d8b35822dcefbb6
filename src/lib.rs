//! # placesmerge - Browser history merging
//!
//! Merges a source history database into a destination one, preserving every
//! place and the navigation chain between visits, without duplicating places,
//! visits or origins and without the two stores sharing row ids.
//!
//! placesmerge provides:
//! - A deterministic URL content hash used as the cross-store place key
//! - Origin and place upserts keyed by natural keys, not row ids
//! - Two-phase visit graph remapping of `from_visit` links
//! - Source adapters for Firefox (peer store) and Chromium (foreign store) histories

pub mod hash;
pub mod place;
pub mod visit;
pub mod storage;
pub mod merge;
pub mod source;
pub mod ui;
pub mod config;

// Re-exports for convenient access
pub use hash::url_hash;
pub use place::{OriginRecord, PlaceRecord, UpsertPolicy};
pub use visit::{VisitRecord, VisitIdMap};
pub use storage::HistoryStore;
pub use merge::{MergeOrchestrator, MergeReport, MergePass};
pub use source::{HistorySource, SourceKind};

/// Result type alias for placesmerge operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error types for placesmerge operations
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Malformed input: {0}")]
    MalformedInput(String),

    #[error("Consistency violation: {0}")]
    ConsistencyViolation(String),

    #[error("Storage error: {0}")]
    Storage(#[from] rusqlite::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Unsupported schema: {0}")]
    UnsupportedSchema(String),

    #[error("{pass} pass failed, nothing from it was saved: {source}")]
    PassFailed {
        pass: MergePass,
        #[source]
        source: Box<Error>,
    },
}

impl Error {
    /// The underlying error, looking through pass wrappers
    pub fn root(&self) -> &Error {
        match self {
            Error::PassFailed { source, .. } => source.root(),
            other => other,
        }
    }
}
