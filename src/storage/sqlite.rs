//! SQLite storage implementation for the destination history database

use std::path::Path;
use rusqlite::functions::FunctionFlags;
use rusqlite::{Connection, ErrorCode, OpenFlags, OptionalExtension, params};
use serde::Serialize;
use crate::{Result, Error};
use crate::hash::url_hash_i64;
use crate::place::{OriginRecord, Place, PlaceRecord, generate_guid};
use crate::visit::Visit;
use super::schema;

/// How a destination is prepared when opened
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Setup {
    /// Create the schema if missing, then add merge indexes
    Create,
    /// Require the schema, then add merge indexes
    Merge,
    /// Require the schema, touch nothing
    Inspect,
}

/// SQLite-backed destination store: origins, places and visits
pub struct HistoryStore {
    conn: Connection,
}

impl HistoryStore {
    /// Open an existing history database for merging
    pub fn open(path: &Path) -> Result<Self> {
        let conn = Connection::open(path)?;
        Self::prepare(conn, Setup::Merge)
    }

    /// Open a database file, creating an empty history schema if needed
    pub fn create(path: &Path) -> Result<Self> {
        let conn = Connection::open(path)?;
        Self::prepare(conn, Setup::Create)
    }

    /// Open a history database read-only, without adding merge indexes
    pub fn inspect(path: &Path) -> Result<Self> {
        let conn = Connection::open_with_flags(
            path,
            OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX,
        )?;
        Self::prepare(conn, Setup::Inspect)
    }

    /// Open an in-memory database (for testing)
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        Self::prepare(conn, Setup::Create)
    }

    fn prepare(conn: Connection, setup: Setup) -> Result<Self> {
        // Places without an origin store origin_id 0, which references no row.
        // Browsers leave these keys unenforced; bundled SQLite enforces them.
        conn.pragma_update(None, "foreign_keys", false)?;
        let store = Self { conn };
        store.register_functions()?;
        match setup {
            Setup::Create => {
                store.initialize_schema()?;
                store.ensure_merge_indexes()?;
            }
            Setup::Merge => {
                store.require_schema()?;
                store.ensure_merge_indexes()?;
            }
            Setup::Inspect => store.require_schema()?,
        }
        Ok(store)
    }

    /// Initialize the database schema
    fn initialize_schema(&self) -> Result<()> {
        for stmt in schema::all_schema_statements() {
            self.conn.execute(stmt, [])?;
        }
        Ok(())
    }

    fn require_schema(&self) -> Result<()> {
        for table in schema::REQUIRED_TABLES {
            if !schema::has_table(&self.conn, table)? {
                return Err(Error::UnsupportedSchema(format!(
                    "destination has no {} table; not a browser history database",
                    table
                )));
            }
        }
        Ok(())
    }

    fn ensure_merge_indexes(&self) -> Result<()> {
        for (name, stmt) in schema::MERGE_INDEXES {
            self.conn.execute(stmt, []).map_err(|e| match e {
                rusqlite::Error::SqliteFailure(ref err, _) if err.code == ErrorCode::ConstraintViolation => {
                    Error::ConsistencyViolation(format!(
                        "destination already holds duplicate rows for {}",
                        name
                    ))
                }
                other => other.into(),
            })?;
        }
        Ok(())
    }

    /// Register `hash(url)` and `generate_guid()` for triggers and ad-hoc SQL
    fn register_functions(&self) -> Result<()> {
        self.conn.create_scalar_function(
            "hash",
            1,
            FunctionFlags::SQLITE_UTF8 | FunctionFlags::SQLITE_DETERMINISTIC,
            |ctx| {
                let url: String = ctx.get(0)?;
                url_hash_i64(&url).map_err(|e| rusqlite::Error::UserFunctionError(Box::new(e)))
            },
        )?;
        self.conn.create_scalar_function(
            "generate_guid",
            0,
            FunctionFlags::SQLITE_UTF8,
            |_| Ok(generate_guid()),
        )?;
        Ok(())
    }

    /// Underlying connection, for read-only queries
    pub fn connection(&self) -> &Connection {
        &self.conn
    }

    // ========== Transactions ==========

    /// Run `f` inside one transaction: committed on `Ok`, rolled back on `Err`.
    ///
    /// Nothing `f` wrote is visible after an error.
    pub fn in_transaction<T>(&mut self, f: impl FnOnce(&Self) -> Result<T>) -> Result<T> {
        self.conn.execute_batch("BEGIN IMMEDIATE")?;

        let outcome = f(self).and_then(|value| {
            self.conn.execute_batch("COMMIT")?;
            Ok(value)
        });

        if outcome.is_err() && !self.conn.is_autocommit() {
            if let Err(e) = self.conn.execute_batch("ROLLBACK") {
                tracing::warn!("Rollback failed: {}", e);
            }
        }
        outcome
    }

    // ========== Origin Operations ==========

    /// Insert an origin unless `(prefix, host)` is already present.
    ///
    /// Returns the new id, or `None` when the key already existed.
    pub fn insert_origin(&self, origin: &OriginRecord) -> Result<Option<i64>> {
        let inserted = self.conn.execute(
            r#"
            INSERT INTO moz_origins (prefix, host, frecency)
            VALUES (?1, ?2, ?3)
            ON CONFLICT(prefix, host) DO NOTHING
            "#,
            params![origin.prefix, origin.host, origin.frecency],
        )?;
        Ok((inserted == 1).then(|| self.conn.last_insert_rowid()))
    }

    /// Find an origin id by exact key
    pub fn find_origin(&self, prefix: &str, host: &str) -> Result<Option<i64>> {
        self.conn
            .query_row(
                "SELECT id FROM moz_origins WHERE prefix = ?1 AND host = ?2",
                params![prefix, host],
                |row| row.get(0),
            )
            .optional()
            .map_err(Into::into)
    }

    /// Count all origins
    pub fn count_origins(&self) -> Result<usize> {
        let count: i64 = self.conn.query_row("SELECT COUNT(*) FROM moz_origins", [], |row| row.get(0))?;
        Ok(count as usize)
    }

    // ========== Place Operations ==========

    /// Insert a place unless its content hash is already present.
    ///
    /// Returns the new id, or `None` when the hash already existed.
    pub fn insert_place(&self, place: &PlaceRecord, url_hash: i64, guid: &str, origin_id: i64) -> Result<Option<i64>> {
        let inserted = self.conn.execute(
            r#"
            INSERT INTO moz_places (url, title, rev_host, visit_count, hidden, typed, frecency,
                last_visit_date, guid, foreign_count, url_hash, description, preview_image_url, origin_id)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14)
            ON CONFLICT(url_hash) DO NOTHING
            "#,
            params![
                place.url,
                place.title,
                place.rev_host,
                place.visit_count,
                place.hidden,
                place.typed,
                place.frecency,
                place.last_visit_date,
                guid,
                place.foreign_count,
                url_hash,
                place.description,
                place.preview_image_url,
                origin_id,
            ],
        )?;
        Ok((inserted == 1).then(|| self.conn.last_insert_rowid()))
    }

    /// All places carrying a content hash (at most one in a consistent store)
    pub fn find_places_by_hash(&self, url_hash: i64) -> Result<Vec<Place>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, url, title, rev_host, visit_count, last_visit_date, guid, url_hash, origin_id
             FROM moz_places WHERE url_hash = ?1"
        )?;

        let places = stmt
            .query_map([url_hash], |row| self.row_to_place(row))?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        Ok(places)
    }

    /// Get a place by id
    pub fn get_place(&self, id: i64) -> Result<Option<Place>> {
        self.conn
            .query_row(
                "SELECT id, url, title, rev_host, visit_count, last_visit_date, guid, url_hash, origin_id
                 FROM moz_places WHERE id = ?1",
                [id],
                |row| self.row_to_place(row),
            )
            .optional()
            .map_err(Into::into)
    }

    /// Whether any place already uses this GUID
    pub fn guid_exists(&self, guid: &str) -> Result<bool> {
        let found = self.conn
            .query_row("SELECT 1 FROM moz_places WHERE guid = ?1", [guid], |_| Ok(()))
            .optional()?;
        Ok(found.is_some())
    }

    /// Overwrite visit counter and last-visit date when `last_visit_date` is
    /// strictly newer than the stored one (a missing stored date is older).
    ///
    /// Returns whether the row changed.
    pub fn refresh_place_counters(&self, id: i64, visit_count: i64, last_visit_date: i64) -> Result<bool> {
        let updated = self.conn.execute(
            r#"
            UPDATE moz_places SET visit_count = ?1, last_visit_date = ?2
            WHERE id = ?3 AND (last_visit_date IS NULL OR last_visit_date < ?2)
            "#,
            params![visit_count, last_visit_date, id],
        )?;
        Ok(updated == 1)
    }

    /// Count all places
    pub fn count_places(&self) -> Result<usize> {
        let count: i64 = self.conn.query_row("SELECT COUNT(*) FROM moz_places", [], |row| row.get(0))?;
        Ok(count as usize)
    }

    /// Helper to convert a row to a Place
    fn row_to_place(&self, row: &rusqlite::Row) -> rusqlite::Result<Place> {
        Ok(Place {
            id: row.get(0)?,
            url: row.get(1)?,
            title: row.get(2)?,
            rev_host: row.get(3)?,
            visit_count: row.get::<_, Option<i64>>(4)?.unwrap_or(0),
            last_visit_date: row.get(5)?,
            guid: row.get::<_, Option<String>>(6)?.unwrap_or_default(),
            url_hash: row.get(7)?,
            origin_id: row.get::<_, Option<i64>>(8)?.unwrap_or(crate::place::NO_ORIGIN),
        })
    }

    // ========== Visit Operations ==========

    /// Insert a visit unless `(place_id, visit_date)` is already present.
    ///
    /// Returns the new id, or `None` when the pair already existed.
    pub fn insert_visit(
        &self,
        from_visit: i64,
        place_id: i64,
        visit_date: i64,
        visit_type: Option<i64>,
        session: Option<i64>,
    ) -> Result<Option<i64>> {
        let inserted = self.conn.execute(
            r#"
            INSERT INTO moz_historyvisits (from_visit, place_id, visit_date, visit_type, session)
            VALUES (?1, ?2, ?3, ?4, ?5)
            ON CONFLICT(place_id, visit_date) DO NOTHING
            "#,
            params![from_visit, place_id, visit_date, visit_type, session],
        )?;
        Ok((inserted == 1).then(|| self.conn.last_insert_rowid()))
    }

    /// Find a visit id by its natural key
    pub fn find_visit(&self, place_id: i64, visit_date: i64) -> Result<Option<i64>> {
        self.conn
            .query_row(
                "SELECT id FROM moz_historyvisits WHERE place_id = ?1 AND visit_date = ?2",
                params![place_id, visit_date],
                |row| row.get(0),
            )
            .optional()
            .map_err(Into::into)
    }

    /// Current `from_visit` of a visit, `None` if the visit does not exist
    pub fn from_visit_of(&self, id: i64) -> Result<Option<i64>> {
        let value: Option<Option<i64>> = self.conn
            .query_row("SELECT from_visit FROM moz_historyvisits WHERE id = ?1", [id], |row| row.get(0))
            .optional()?;
        Ok(value.map(|from| from.unwrap_or(crate::visit::NO_VISIT)))
    }

    /// Rewrite the `from_visit` of a visit
    pub fn set_from_visit(&self, id: i64, from_visit: i64) -> Result<()> {
        self.conn.execute(
            "UPDATE moz_historyvisits SET from_visit = ?1 WHERE id = ?2",
            params![from_visit, id],
        )?;
        Ok(())
    }

    /// Get a visit by id
    pub fn get_visit(&self, id: i64) -> Result<Option<Visit>> {
        self.conn
            .query_row(
                "SELECT id, from_visit, place_id, visit_date, visit_type, session FROM moz_historyvisits WHERE id = ?1",
                [id],
                |row| self.row_to_visit(row),
            )
            .optional()
            .map_err(Into::into)
    }

    /// All visits of a place, oldest first
    pub fn visits_for_place(&self, place_id: i64) -> Result<Vec<Visit>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, from_visit, place_id, visit_date, visit_type, session
             FROM moz_historyvisits WHERE place_id = ?1 ORDER BY visit_date"
        )?;

        let visits = stmt
            .query_map([place_id], |row| self.row_to_visit(row))?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        Ok(visits)
    }

    /// Count all visits
    pub fn count_visits(&self) -> Result<usize> {
        let count: i64 = self.conn.query_row("SELECT COUNT(*) FROM moz_historyvisits", [], |row| row.get(0))?;
        Ok(count as usize)
    }

    /// Helper to convert a row to a Visit
    fn row_to_visit(&self, row: &rusqlite::Row) -> rusqlite::Result<Visit> {
        Ok(Visit {
            id: row.get(0)?,
            from_visit: row.get::<_, Option<i64>>(1)?.unwrap_or(crate::visit::NO_VISIT),
            place_id: row.get(2)?,
            visit_date: row.get(3)?,
            visit_type: row.get(4)?,
            session: row.get(5)?,
        })
    }

    // ========== Statistics & Integrity ==========

    /// Get database statistics
    pub fn stats(&self) -> Result<DbStats> {
        Ok(DbStats {
            origins: self.count_origins()?,
            places: self.count_places()?,
            visits: self.count_visits()?,
        })
    }

    /// Check the invariants a completed merge guarantees
    pub fn verify(&self) -> Result<IntegrityReport> {
        let mut stmt = self.conn.prepare(
            "SELECT url_hash, COUNT(*) FROM moz_places GROUP BY url_hash HAVING COUNT(*) > 1"
        )?;
        let duplicate_hashes = stmt
            .query_map([], |row| Ok((row.get(0)?, row.get::<_, i64>(1)? as usize)))?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        let mut stmt = self.conn.prepare(
            "SELECT prefix, host, COUNT(*) FROM moz_origins GROUP BY prefix, host HAVING COUNT(*) > 1"
        )?;
        let duplicate_origins = stmt
            .query_map([], |row| Ok((row.get(0)?, row.get(1)?, row.get::<_, i64>(2)? as usize)))?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        let mut stmt = self.conn.prepare(
            "SELECT place_id, visit_date, COUNT(*) FROM moz_historyvisits
             GROUP BY place_id, visit_date HAVING COUNT(*) > 1"
        )?;
        let duplicate_visits = stmt
            .query_map([], |row| Ok((row.get(0)?, row.get(1)?, row.get::<_, i64>(2)? as usize)))?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        let mut stmt = self.conn.prepare(
            r#"
            SELECT v.id, v.from_visit FROM moz_historyvisits v
            WHERE v.from_visit IS NOT NULL AND v.from_visit <> 0
              AND NOT EXISTS (SELECT 1 FROM moz_historyvisits p WHERE p.id = v.from_visit)
            "#
        )?;
        let dangling_from_visits = stmt
            .query_map([], |row| Ok((row.get(0)?, row.get(1)?)))?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        Ok(IntegrityReport {
            duplicate_hashes,
            duplicate_origins,
            duplicate_visits,
            dangling_from_visits,
        })
    }
}

/// Database statistics
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DbStats {
    pub origins: usize,
    pub places: usize,
    pub visits: usize,
}

impl std::fmt::Display for DbStats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "Database Statistics:")?;
        writeln!(f, "  Origins: {}", self.origins)?;
        writeln!(f, "  Places: {}", self.places)?;
        writeln!(f, "  Visits: {}", self.visits)
    }
}

/// Violations of the merge invariants found in a store
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct IntegrityReport {
    /// (url_hash, rows)
    pub duplicate_hashes: Vec<(i64, usize)>,
    /// (prefix, host, rows)
    pub duplicate_origins: Vec<(String, String, usize)>,
    /// (place_id, visit_date, rows)
    pub duplicate_visits: Vec<(i64, i64, usize)>,
    /// (visit id, from_visit pointing nowhere)
    pub dangling_from_visits: Vec<(i64, i64)>,
}

impl IntegrityReport {
    pub fn is_clean(&self) -> bool {
        self.duplicate_hashes.is_empty()
            && self.duplicate_origins.is_empty()
            && self.duplicate_visits.is_empty()
            && self.dangling_from_visits.is_empty()
    }
}

impl std::fmt::Display for IntegrityReport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "Integrity Report:")?;
        writeln!(f, "  Duplicate place hashes: {}", self.duplicate_hashes.len())?;
        writeln!(f, "  Duplicate origins: {}", self.duplicate_origins.len())?;
        writeln!(f, "  Duplicate visits: {}", self.duplicate_visits.len())?;
        writeln!(f, "  Dangling from_visit edges: {}", self.dangling_from_visits.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hash::url_hash;
    use crate::place::NO_ORIGIN;

    fn sample_place(url: &str) -> PlaceRecord {
        let mut place = PlaceRecord::new(url);
        place.visit_count = 1;
        place.last_visit_date = Some(1_000);
        place
    }

    #[test]
    fn test_origin_insert_is_idempotent() {
        let store = HistoryStore::open_in_memory().unwrap();
        let origin = OriginRecord::new("https://", "example.com", 100);

        let id = store.insert_origin(&origin).unwrap().unwrap();
        assert_eq!(store.insert_origin(&origin).unwrap(), None);
        assert_eq!(store.find_origin("https://", "example.com").unwrap(), Some(id));
        assert_eq!(store.find_origin("http://", "example.com").unwrap(), None);
        assert_eq!(store.count_origins().unwrap(), 1);
    }

    #[test]
    fn test_place_insert_conflicts_on_hash() {
        let store = HistoryStore::open_in_memory().unwrap();
        let place = sample_place("https://a.example/");
        let hash = url_hash_i64(&place.url).unwrap();

        let id = store.insert_place(&place, hash, "guid-one----", 0).unwrap().unwrap();
        assert_eq!(store.insert_place(&place, hash, "guid-two----", 0).unwrap(), None);

        let found = store.find_places_by_hash(hash).unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].id, id);
        assert_eq!(found[0].guid, "guid-one----");
        assert!(store.guid_exists("guid-one----").unwrap());
        assert!(!store.guid_exists("guid-two----").unwrap());
    }

    #[test]
    fn test_place_without_origin_on_existing_profile() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("places.sqlite");
        {
            let conn = Connection::open(&path).unwrap();
            for stmt in schema::all_schema_statements() {
                conn.execute(stmt, []).unwrap();
            }
        }

        let store = HistoryStore::open(&path).unwrap();
        let place = PlaceRecord::new("place:sort=8");
        let hash = url_hash_i64(&place.url).unwrap();
        let id = store.insert_place(&place, hash, "noorigin----", NO_ORIGIN).unwrap().unwrap();
        assert_eq!(store.get_place(id).unwrap().unwrap().origin_id, NO_ORIGIN);
        assert!(store.insert_visit(0, id, 100, Some(1), None).unwrap().is_some());
    }

    #[test]
    fn test_refresh_only_when_newer() {
        let store = HistoryStore::open_in_memory().unwrap();
        let place = sample_place("https://a.example/");
        let hash = url_hash_i64(&place.url).unwrap();
        let id = store.insert_place(&place, hash, "guid-one----", 0).unwrap().unwrap();

        assert!(!store.refresh_place_counters(id, 9, 500).unwrap());
        assert!(!store.refresh_place_counters(id, 9, 1_000).unwrap());
        assert!(store.refresh_place_counters(id, 9, 2_000).unwrap());

        let stored = store.get_place(id).unwrap().unwrap();
        assert_eq!(stored.visit_count, 9);
        assert_eq!(stored.last_visit_date, Some(2_000));
    }

    #[test]
    fn test_refresh_when_stored_date_missing() {
        let store = HistoryStore::open_in_memory().unwrap();
        let place = PlaceRecord::new("https://a.example/");
        let hash = url_hash_i64(&place.url).unwrap();
        let id = store.insert_place(&place, hash, "guid-one----", 0).unwrap().unwrap();

        assert!(store.refresh_place_counters(id, 3, -5).unwrap());
        assert_eq!(store.get_place(id).unwrap().unwrap().last_visit_date, Some(-5));
    }

    #[test]
    fn test_visit_crud() {
        let store = HistoryStore::open_in_memory().unwrap();
        let place = sample_place("https://a.example/");
        let hash = url_hash_i64(&place.url).unwrap();
        let place_id = store.insert_place(&place, hash, "guid-one----", 0).unwrap().unwrap();

        let first = store.insert_visit(0, place_id, 10, Some(1), None).unwrap().unwrap();
        let second = store.insert_visit(77, place_id, 20, Some(1), None).unwrap().unwrap();
        assert_eq!(store.insert_visit(0, place_id, 10, Some(1), None).unwrap(), None);
        assert_eq!(store.find_visit(place_id, 20).unwrap(), Some(second));

        assert_eq!(store.from_visit_of(second).unwrap(), Some(77));
        store.set_from_visit(second, first).unwrap();
        assert_eq!(store.get_visit(second).unwrap().unwrap().from_visit, first);
        assert_eq!(store.from_visit_of(9_999).unwrap(), None);

        let visits = store.visits_for_place(place_id).unwrap();
        assert_eq!(visits.iter().map(|v| v.id).collect::<Vec<_>>(), vec![first, second]);
    }

    #[test]
    fn test_sql_functions() {
        let store = HistoryStore::open_in_memory().unwrap();
        let hashed: i64 = store
            .connection()
            .query_row("SELECT hash('https://a.example/')", [], |row| row.get(0))
            .unwrap();
        assert_eq!(hashed as u64, url_hash("https://a.example/").unwrap());

        let guid: String = store
            .connection()
            .query_row("SELECT GENERATE_GUID()", [], |row| row.get(0))
            .unwrap();
        assert_eq!(guid.len(), 12);

        let malformed = store
            .connection()
            .query_row("SELECT hash('no-scheme')", [], |row| row.get::<_, i64>(0));
        assert!(malformed.is_err());
    }

    #[test]
    fn test_transaction_rolls_back_on_error() {
        let mut store = HistoryStore::open_in_memory().unwrap();
        let result: Result<()> = store.in_transaction(|s| {
            s.insert_origin(&OriginRecord::new("https://", "a.example", 1))?;
            Err(Error::ConsistencyViolation("boom".into()))
        });
        assert!(result.is_err());
        assert_eq!(store.count_origins().unwrap(), 0);

        store
            .in_transaction(|s| s.insert_origin(&OriginRecord::new("https://", "a.example", 1)))
            .unwrap();
        assert_eq!(store.count_origins().unwrap(), 1);
    }

    #[test]
    fn test_verify_reports_dangling_edges() {
        let store = HistoryStore::open_in_memory().unwrap();
        let place = sample_place("https://a.example/");
        let hash = url_hash_i64(&place.url).unwrap();
        let place_id = store.insert_place(&place, hash, "guid-one----", 0).unwrap().unwrap();
        let visit = store.insert_visit(0, place_id, 10, None, None).unwrap().unwrap();

        assert!(store.verify().unwrap().is_clean());

        store.set_from_visit(visit, 4_242).unwrap();
        let report = store.verify().unwrap();
        assert!(!report.is_clean());
        assert_eq!(report.dangling_from_visits, vec![(visit, 4_242)]);
    }

    #[test]
    fn test_open_rejects_duplicate_hashes() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("places.sqlite");
        {
            let conn = Connection::open(&path).unwrap();
            for stmt in schema::all_schema_statements() {
                conn.execute(stmt, []).unwrap();
            }
            conn.execute_batch(
                "INSERT INTO moz_places (url, guid, url_hash) VALUES ('https://a/', 'g1', 42);
                 INSERT INTO moz_places (url, guid, url_hash) VALUES ('https://b/', 'g2', 42);",
            )
            .unwrap();
        }

        let err = HistoryStore::open(&path).err().unwrap();
        assert!(matches!(err, Error::ConsistencyViolation(_)));

        let report = HistoryStore::inspect(&path).unwrap().verify().unwrap();
        assert_eq!(report.duplicate_hashes, vec![(42, 2)]);
    }

    #[test]
    fn test_open_requires_schema() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("empty.sqlite");
        Connection::open(&path).unwrap().execute_batch("CREATE TABLE other (x)").unwrap();

        assert!(matches!(HistoryStore::open(&path), Err(Error::UnsupportedSchema(_))));
        assert!(HistoryStore::create(&path).is_ok());
        assert!(HistoryStore::open(&path).is_ok());
    }
}
