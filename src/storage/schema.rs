//! Database schema definitions
//!
//! Column names follow the Firefox `places.sqlite` layout so an existing
//! profile database can be merged into directly.

use rusqlite::{Connection, OptionalExtension};

/// SQL to create the origins table
pub const CREATE_ORIGINS_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS moz_origins (
    id INTEGER PRIMARY KEY,
    prefix TEXT NOT NULL,
    host TEXT NOT NULL,
    frecency INTEGER NOT NULL,
    UNIQUE (prefix, host)
)
"#;

/// SQL to create the places table
pub const CREATE_PLACES_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS moz_places (
    id INTEGER PRIMARY KEY,
    url LONGVARCHAR,
    title LONGVARCHAR,
    rev_host LONGVARCHAR,
    visit_count INTEGER DEFAULT 0,
    hidden INTEGER DEFAULT 0 NOT NULL,
    typed INTEGER DEFAULT 0 NOT NULL,
    frecency INTEGER DEFAULT -1 NOT NULL,
    last_visit_date INTEGER,
    guid TEXT,
    foreign_count INTEGER DEFAULT 0 NOT NULL,
    url_hash INTEGER DEFAULT 0 NOT NULL,
    description TEXT,
    preview_image_url TEXT,
    origin_id INTEGER REFERENCES moz_origins(id)
)
"#;

/// SQL to create the visits table
pub const CREATE_HISTORYVISITS_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS moz_historyvisits (
    id INTEGER PRIMARY KEY,
    from_visit INTEGER,
    place_id INTEGER,
    visit_date INTEGER,
    visit_type INTEGER,
    session INTEGER
)
"#;

/// Lookup indexes a fresh destination gets
pub const CREATE_INDEXES: &[&str] = &[
    "CREATE UNIQUE INDEX IF NOT EXISTS moz_places_guid_uniqueindex ON moz_places(guid)",
    "CREATE INDEX IF NOT EXISTS moz_places_hostindex ON moz_places(rev_host)",
    "CREATE INDEX IF NOT EXISTS moz_places_lastvisitdateindex ON moz_places(last_visit_date)",
    "CREATE INDEX IF NOT EXISTS moz_historyvisits_fromindex ON moz_historyvisits(from_visit)",
    "CREATE INDEX IF NOT EXISTS moz_historyvisits_dateindex ON moz_historyvisits(visit_date)",
];

/// Uniqueness constraints the merge relies on for `ON CONFLICT` upserts.
///
/// Created on every destination opened for merging, including existing
/// browser databases that only carry plain indexes on these columns.
/// They stay in the destination after the merge.
pub const MERGE_INDEXES: &[(&str, &str)] = &[
    (
        "origin (prefix, host)",
        "CREATE UNIQUE INDEX IF NOT EXISTS placesmerge_origins_key ON moz_origins(prefix, host)",
    ),
    (
        "place url_hash",
        "CREATE UNIQUE INDEX IF NOT EXISTS placesmerge_places_url_hash ON moz_places(url_hash)",
    ),
    (
        "visit (place_id, visit_date)",
        "CREATE UNIQUE INDEX IF NOT EXISTS placesmerge_visits_place_date ON moz_historyvisits(place_id, visit_date)",
    ),
];

/// Tables a destination must expose to be merged into
pub const REQUIRED_TABLES: &[&str] = &["moz_origins", "moz_places", "moz_historyvisits"];

/// All schema creation statements
pub fn all_schema_statements() -> Vec<&'static str> {
    let mut stmts = vec![
        CREATE_ORIGINS_TABLE,
        CREATE_PLACES_TABLE,
        CREATE_HISTORYVISITS_TABLE,
    ];
    stmts.extend(CREATE_INDEXES.iter().copied());
    stmts
}

/// Check whether a table exists in the connected database
pub fn has_table(conn: &Connection, name: &str) -> rusqlite::Result<bool> {
    conn.query_row(
        "SELECT 1 FROM sqlite_master WHERE type = 'table' AND name = ?1",
        [name],
        |_| Ok(()),
    )
    .optional()
    .map(|found| found.is_some())
}
