//! Source adapters
//!
//! A source exposes the capability set the merge core needs:
//! origins, places and visits already converted into destination terms
//! (Unix-epoch microseconds, destination visit types), plus the upsert policy
//! that fits its visit-counting convention.
//!
//! - [`FirefoxSource`]: a peer `places.sqlite`; first seen wins
//! - [`ChromiumSource`]: a foreign `History` database; newer counters win
//! - [`InMemorySource`]: records assembled by the caller

pub mod firefox;
pub mod chromium;
pub mod memory;

pub use firefox::FirefoxSource;
pub use chromium::ChromiumSource;
pub use memory::InMemorySource;

use std::fmt;
use std::path::Path;
use std::str::FromStr;
use rusqlite::types::ValueRef;
use rusqlite::{Connection, OpenFlags, Row};
use serde::{Deserialize, Serialize};
use crate::{Error, Result};
use crate::place::{OriginRecord, PlaceRecord, UpsertPolicy};
use crate::storage::schema::has_table;
use crate::ui::progress_message::ProgressSink;
use crate::visit::VisitRecord;

/// SQLite VM steps between liveness signals during a source scan
pub const DEFAULT_LIVENESS_OPS: i32 = 3_000_000;

/// Supported source history formats
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceKind {
    /// Firefox `places.sqlite`, same layout as the destination
    Firefox,
    /// Chromium-family `History` database
    Chromium,
}

impl SourceKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            SourceKind::Firefox => "firefox",
            SourceKind::Chromium => "chromium",
        }
    }

    /// Policy for places already present in the destination
    pub fn default_policy(&self) -> UpsertPolicy {
        match self {
            SourceKind::Firefox => UpsertPolicy::SkipIfPresent,
            SourceKind::Chromium => UpsertPolicy::RefreshIfNewer,
        }
    }

    /// Recognize a source by its tables
    pub fn detect(conn: &Connection) -> Result<Option<Self>> {
        if has_table(conn, "moz_places")? && has_table(conn, "moz_historyvisits")? {
            return Ok(Some(SourceKind::Firefox));
        }
        if has_table(conn, "urls")? && has_table(conn, "visits")? {
            return Ok(Some(SourceKind::Chromium));
        }
        Ok(None)
    }
}

impl FromStr for SourceKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "firefox" | "mozilla" | "places" => Ok(SourceKind::Firefox),
            "chromium" | "chrome" | "edge" | "brave" => Ok(SourceKind::Chromium),
            _ => Err(Error::UnsupportedSchema(format!("Unknown source format: {}", s))),
        }
    }
}

impl fmt::Display for SourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// What the merge core reads from a source
pub trait HistorySource {
    fn kind(&self) -> SourceKind;

    fn policy(&self) -> UpsertPolicy {
        self.kind().default_policy()
    }

    /// Origins to upsert before any place; sources that derive origins from
    /// place URLs return none here.
    fn read_origins(&self) -> Result<Vec<OriginRecord>> {
        Ok(Vec::new())
    }

    fn read_places(&self) -> Result<Vec<PlaceRecord>>;

    /// Visits in source-chronological order
    fn read_visits(&self) -> Result<Vec<VisitRecord>>;
}

/// Periodic "still working" signal while a source query runs
#[derive(Debug, Clone)]
pub struct Liveness {
    pub sink: ProgressSink,
    pub ops: i32,
}

impl Liveness {
    pub fn new(sink: ProgressSink, ops: i32) -> Self {
        Self { sink, ops }
    }

    /// Hook the signal into a connection; never interrupts a query
    pub fn install(&self, conn: &Connection) {
        let sink = self.sink.clone();
        conn.progress_handler(
            self.ops,
            Some(move || {
                sink.still_working();
                false
            }),
        );
    }
}

impl Default for Liveness {
    fn default() -> Self {
        Self::new(ProgressSink::none(), DEFAULT_LIVENESS_OPS)
    }
}

/// Open a source database read-only, detecting or checking its format
pub fn open_source(path: &Path, expected: Option<SourceKind>, liveness: &Liveness) -> Result<Box<dyn HistorySource>> {
    let conn = Connection::open_with_flags(
        path,
        OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX,
    )?;

    let detected = SourceKind::detect(&conn)?.ok_or_else(|| {
        Error::UnsupportedSchema(format!(
            "{} does not look like a Firefox or Chromium history database",
            path.display()
        ))
    })?;

    if let Some(expected) = expected {
        if expected != detected {
            return Err(Error::UnsupportedSchema(format!(
                "{} looks like a {} history database, not {}",
                path.display(),
                detected,
                expected
            )));
        }
    }

    tracing::debug!("Source {} detected as {}", path.display(), detected);
    liveness.install(&conn);
    Ok(match detected {
        SourceKind::Firefox => Box::new(FirefoxSource::from_connection(conn)?),
        SourceKind::Chromium => Box::new(ChromiumSource::from_connection(conn)?),
    })
}

/// Read a text column, replacing invalid UTF-8 instead of failing the scan
pub(crate) fn lossy_text(row: &Row, idx: usize) -> rusqlite::Result<Option<String>> {
    Ok(match row.get_ref(idx)? {
        ValueRef::Null => None,
        ValueRef::Text(bytes) | ValueRef::Blob(bytes) => Some(String::from_utf8_lossy(bytes).into_owned()),
        ValueRef::Integer(i) => Some(i.to_string()),
        ValueRef::Real(f) => Some(f.to_string()),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_roundtrip_and_policy() {
        for kind in [SourceKind::Firefox, SourceKind::Chromium] {
            assert_eq!(kind.as_str().parse::<SourceKind>().unwrap(), kind);
        }
        assert_eq!("Chrome".parse::<SourceKind>().unwrap(), SourceKind::Chromium);
        assert!("safari".parse::<SourceKind>().is_err());
        assert_eq!(SourceKind::Firefox.default_policy(), UpsertPolicy::SkipIfPresent);
        assert_eq!(SourceKind::Chromium.default_policy(), UpsertPolicy::RefreshIfNewer);
    }

    #[test]
    fn test_detect() {
        let conn = Connection::open_in_memory().unwrap();
        assert_eq!(SourceKind::detect(&conn).unwrap(), None);

        conn.execute_batch("CREATE TABLE urls (id INTEGER); CREATE TABLE visits (id INTEGER);").unwrap();
        assert_eq!(SourceKind::detect(&conn).unwrap(), Some(SourceKind::Chromium));

        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch("CREATE TABLE moz_places (id INTEGER); CREATE TABLE moz_historyvisits (id INTEGER);").unwrap();
        assert_eq!(SourceKind::detect(&conn).unwrap(), Some(SourceKind::Firefox));
    }

    #[test]
    fn test_lossy_text() {
        let conn = Connection::open_in_memory().unwrap();
        let value = conn
            .query_row("SELECT CAST(X'48E96C6C6F' AS TEXT), NULL", [], |row| {
                Ok((lossy_text(row, 0)?, lossy_text(row, 1)?))
            })
            .unwrap();
        assert_eq!(value.0.as_deref(), Some("H\u{FFFD}llo"));
        assert_eq!(value.1, None);
    }

    #[test]
    fn test_open_source_rejects_unknown_schema() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("other.sqlite");
        Connection::open(&path).unwrap().execute_batch("CREATE TABLE t (x)").unwrap();

        let err = open_source(&path, None, &Liveness::default()).err().unwrap();
        assert!(matches!(err, Error::UnsupportedSchema(_)));
    }
}
