//! Visit types - navigation events and the source→destination id mapping
//!
//! A visit's `from_visit` names the visit that navigationally preceded it.
//! Sources express it in their own id space, so it stays provisional until the
//! whole batch has been imported and [`VisitIdMap`] can translate it.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// `from_visit` value meaning "no known predecessor".
pub const NO_VISIT: i64 = 0;

/// Visit types understood by the destination (`moz_historyvisits.visit_type`).
pub mod visit_type {
    pub const LINK: i64 = 1;
    pub const TYPED: i64 = 2;
    pub const BOOKMARK: i64 = 3;
    pub const EMBED: i64 = 4;
    pub const REDIRECT_PERMANENT: i64 = 5;
    pub const REDIRECT_TEMPORARY: i64 = 6;
    pub const FRAMED_LINK: i64 = 8;
    pub const RELOAD: i64 = 9;
}

/// One visit as read from a source. Ids are source-local.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VisitRecord {
    pub id: i64,
    /// Source-local id of the preceding visit, or [`NO_VISIT`]
    pub from_visit: i64,
    /// URL of the visited place; resolved to a destination place by content hash
    pub url: String,
    /// Microseconds since the Unix epoch
    pub visit_date: i64,
    pub visit_type: Option<i64>,
    pub session: Option<i64>,
}

/// A visit row in the destination.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Visit {
    pub id: i64,
    pub from_visit: i64,
    pub place_id: i64,
    pub visit_date: i64,
    pub visit_type: Option<i64>,
    pub session: Option<i64>,
}

/// Partial function from source visit ids to destination visit ids.
///
/// Filled during node import for every source visit, whether it was inserted
/// or matched an existing destination visit.
#[derive(Debug, Default, Clone)]
pub struct VisitIdMap {
    ids: HashMap<i64, i64>,
}

impl VisitIdMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            ids: HashMap::with_capacity(capacity),
        }
    }

    pub fn insert(&mut self, source_id: i64, dest_id: i64) {
        self.ids.insert(source_id, dest_id);
    }

    pub fn get(&self, source_id: i64) -> Option<i64> {
        self.ids.get(&source_id).copied()
    }

    /// Translate a provisional `from_visit` into destination space.
    ///
    /// `NO_VISIT` stays `NO_VISIT`; an id outside the batch becomes `None`.
    pub fn translate(&self, raw_from_visit: i64) -> Option<i64> {
        if raw_from_visit == NO_VISIT {
            return Some(NO_VISIT);
        }
        self.get(raw_from_visit)
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }
}
