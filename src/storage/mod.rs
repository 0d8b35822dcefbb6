//! Storage Layer - SQLite-backed destination history
//!
//! The destination follows the browser's own layout:
//! - moz_origins(prefix, host, frecency)
//! - moz_places(url, title, rev_host, counters, guid, url_hash, origin_id)
//! - moz_historyvisits(from_visit, place_id, visit_date, visit_type, session)

pub mod schema;
pub mod sqlite;

pub use sqlite::{HistoryStore, DbStats, IntegrityReport};
