//! Chromium `History` source (foreign store)
//!
//! Chromium stores one `urls` row per URL and one `visits` row per visit, with
//! timestamps in microseconds since 1601-01-01. Rows are read once, joined and
//! ordered by visit time, then split into places and visits.

use std::cell::OnceCell;
use std::collections::HashSet;
use rusqlite::Connection;
use crate::{Error, Result};
use crate::place::{OriginRecord, PlaceRecord, reversed_host};
use crate::storage::schema::has_table;
use crate::visit::{NO_VISIT, VisitRecord, visit_type};
use super::{HistorySource, SourceKind, lossy_text};

/// Microseconds between 1601-01-01 and 1970-01-01
pub const WINDOWS_EPOCH_OFFSET_MICROS: i64 = 11_644_473_600_000_000;

const CORE_MASK: u32 = 0xFF;
const CLIENT_REDIRECT: u32 = 0x4000_0000;
const SERVER_REDIRECT: u32 = 0x8000_0000;

/// Convert a Chromium timestamp to Unix-epoch microseconds
pub fn to_unix_micros(chromium_time: i64) -> i64 {
    chromium_time - WINDOWS_EPOCH_OFFSET_MICROS
}

/// Map a Chromium page transition to a destination visit type.
///
/// Redirect qualifiers win over the core type.
pub fn visit_type_for(transition: i64) -> i64 {
    // Stored as a signed 32-bit value in some versions
    let transition = transition as u32;
    if transition & SERVER_REDIRECT != 0 {
        return visit_type::REDIRECT_PERMANENT;
    }
    if transition & CLIENT_REDIRECT != 0 {
        return visit_type::REDIRECT_TEMPORARY;
    }
    match transition & CORE_MASK {
        // link, auto toplevel, form submit
        0 | 6 | 7 => visit_type::LINK,
        // typed, generated, keyword, keyword generated
        1 | 5 | 9 | 10 => visit_type::TYPED,
        2 => visit_type::BOOKMARK,
        3 => visit_type::EMBED,
        4 => visit_type::FRAMED_LINK,
        8 => visit_type::RELOAD,
        _ => visit_type::LINK,
    }
}

/// One joined `visits` × `urls` row
#[derive(Debug, Clone)]
struct ChromiumRow {
    visit_id: i64,
    url_id: i64,
    visit_time: i64,
    from_visit: i64,
    transition: i64,
    url: String,
    title: Option<String>,
    visit_count: i64,
    typed_count: i64,
    last_visit_time: i64,
    hidden: i64,
}

pub struct ChromiumSource {
    conn: Connection,
    rows: OnceCell<Vec<ChromiumRow>>,
}

impl ChromiumSource {
    /// Wrap an open connection after checking it carries the Chromium tables
    pub fn from_connection(conn: Connection) -> Result<Self> {
        for table in ["urls", "visits"] {
            if !has_table(&conn, table)? {
                return Err(Error::UnsupportedSchema(format!(
                    "Chromium source has no {} table",
                    table
                )));
            }
        }
        Ok(Self {
            conn,
            rows: OnceCell::new(),
        })
    }

    fn rows(&self) -> Result<&[ChromiumRow]> {
        if let Some(rows) = self.rows.get() {
            return Ok(rows);
        }
        let rows = self.fetch()?;
        Ok(self.rows.get_or_init(|| rows))
    }

    fn fetch(&self) -> Result<Vec<ChromiumRow>> {
        let mut stmt = self.conn.prepare(
            r#"
            SELECT visits.id, visits.url, visits.visit_time, visits.from_visit, visits.transition,
                   urls.url, urls.title, urls.visit_count, urls.typed_count, urls.last_visit_time, urls.hidden
            FROM visits
            LEFT JOIN urls ON urls.id = visits.url
            ORDER BY visits.visit_time, visits.id
            "#,
        )?;

        let raw = stmt
            .query_map([], |row| {
                Ok((
                    row.get::<_, i64>(0)?,
                    row.get::<_, Option<i64>>(1)?.unwrap_or(0),
                    row.get::<_, Option<i64>>(2)?.unwrap_or(0),
                    row.get::<_, Option<i64>>(3)?.unwrap_or(NO_VISIT),
                    row.get::<_, Option<i64>>(4)?.unwrap_or(0),
                    lossy_text(row, 5)?,
                    lossy_text(row, 6)?,
                    row.get::<_, Option<i64>>(7)?.unwrap_or(0),
                    row.get::<_, Option<i64>>(8)?.unwrap_or(0),
                    row.get::<_, Option<i64>>(9)?.unwrap_or(0),
                    row.get::<_, Option<i64>>(10)?.unwrap_or(0),
                ))
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        raw.into_iter()
            .map(|(visit_id, url_id, visit_time, from_visit, transition, url, title, visit_count, typed_count, last_visit_time, hidden)| {
                let url = url.ok_or_else(|| {
                    Error::ConsistencyViolation(format!(
                        "source visit {} references url {} which the source does not contain",
                        visit_id, url_id
                    ))
                })?;
                Ok(ChromiumRow {
                    visit_id,
                    url_id,
                    visit_time,
                    from_visit,
                    transition,
                    url,
                    title,
                    visit_count,
                    typed_count,
                    last_visit_time,
                    hidden,
                })
            })
            .collect()
    }

    fn to_place(row: &ChromiumRow) -> Result<PlaceRecord> {
        let origin = OriginRecord::from_url(&row.url, -1)?;
        let host = url::Url::parse(&row.url)
            .ok()
            .and_then(|u| u.host_str().map(str::to_string))
            .unwrap_or_default();

        Ok(PlaceRecord {
            url: row.url.clone(),
            title: row.title.clone(),
            rev_host: Some(reversed_host(&host)),
            visit_count: row.visit_count,
            hidden: row.hidden,
            typed: row.typed_count,
            frecency: -1,
            // 0 means "never" in Chromium
            last_visit_date: (row.last_visit_time != 0).then(|| to_unix_micros(row.last_visit_time)),
            guid: None,
            foreign_count: 0,
            source_hash: None,
            description: None,
            preview_image_url: None,
            origin: Some(origin),
        })
    }
}

impl HistorySource for ChromiumSource {
    fn kind(&self) -> SourceKind {
        SourceKind::Chromium
    }

    /// One place per visited URL, in order of first visit
    fn read_places(&self) -> Result<Vec<PlaceRecord>> {
        let mut seen = HashSet::new();
        self.rows()?
            .iter()
            .filter(|row| seen.insert(row.url_id))
            .map(Self::to_place)
            .collect()
    }

    fn read_visits(&self) -> Result<Vec<VisitRecord>> {
        Ok(self
            .rows()?
            .iter()
            .map(|row| VisitRecord {
                id: row.visit_id,
                from_visit: row.from_visit,
                url: row.url.clone(),
                visit_date: to_unix_micros(row.visit_time),
                visit_type: Some(visit_type_for(row.transition)),
                session: None,
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const CHROMIUM_SCHEMA: &str = r#"
        CREATE TABLE urls (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            url LONGVARCHAR,
            title LONGVARCHAR,
            visit_count INTEGER DEFAULT 0 NOT NULL,
            typed_count INTEGER DEFAULT 0 NOT NULL,
            last_visit_time INTEGER NOT NULL,
            hidden INTEGER DEFAULT 0 NOT NULL
        );
        CREATE TABLE visits (
            id INTEGER PRIMARY KEY,
            url INTEGER NOT NULL,
            visit_time INTEGER NOT NULL,
            from_visit INTEGER,
            transition INTEGER DEFAULT 0 NOT NULL
        );
    "#;

    fn chromium_source(sql: &str) -> ChromiumSource {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch(CHROMIUM_SCHEMA).unwrap();
        conn.execute_batch(sql).unwrap();
        ChromiumSource::from_connection(conn).unwrap()
    }

    #[test]
    fn test_epoch_conversion() {
        assert_eq!(to_unix_micros(WINDOWS_EPOCH_OFFSET_MICROS), 0);
        assert_eq!(to_unix_micros(13_300_000_000_000_000), 13_300_000_000_000_000 - 11_644_473_600_000_000);
    }

    #[test]
    fn test_transition_mapping() {
        assert_eq!(visit_type_for(0), visit_type::LINK);
        assert_eq!(visit_type_for(1), visit_type::TYPED);
        assert_eq!(visit_type_for(0x3000_0001), visit_type::TYPED);
        assert_eq!(visit_type_for(8), visit_type::RELOAD);
        assert_eq!(visit_type_for(0x8000_0000 | 0x2000_0000), visit_type::REDIRECT_PERMANENT);
        assert_eq!(visit_type_for(-2_147_483_648), visit_type::REDIRECT_PERMANENT);
        assert_eq!(visit_type_for(0x4000_0000), visit_type::REDIRECT_TEMPORARY);
        assert_eq!(visit_type_for(3), visit_type::EMBED);
        assert_eq!(visit_type_for(0xEE), visit_type::LINK);
    }

    #[test]
    fn test_places_deduplicated_in_visit_order() {
        let source = chromium_source(
            r#"
            INSERT INTO urls VALUES (1, 'https://b.example/', 'B', 1, 0, 13300000000000300, 0);
            INSERT INTO urls VALUES (2, 'http://a.example:8080/x', 'A', 2, 1, 13300000000000200, 0);
            INSERT INTO visits VALUES (10, 2, 13300000000000100, 0, 1);
            INSERT INTO visits VALUES (11, 2, 13300000000000200, 10, 0);
            INSERT INTO visits VALUES (12, 1, 13300000000000300, 11, 0);
            "#,
        );

        let places = source.read_places().unwrap();
        assert_eq!(places.len(), 2);
        assert_eq!(places[0].url, "http://a.example:8080/x");
        assert_eq!(places[0].rev_host.as_deref(), Some("elpmaxe.a."));
        assert_eq!(places[0].typed, 1);
        assert_eq!(places[0].last_visit_date, Some(to_unix_micros(13_300_000_000_000_200)));
        assert_eq!(places[0].origin, Some(OriginRecord::new("http://", "a.example:8080", -1)));
        assert_eq!(places[1].url, "https://b.example/");

        let visits = source.read_visits().unwrap();
        assert_eq!(visits.iter().map(|v| v.id).collect::<Vec<_>>(), vec![10, 11, 12]);
        assert_eq!(visits[0].visit_date, to_unix_micros(13_300_000_000_000_100));
        assert_eq!(visits[0].visit_type, Some(visit_type::TYPED));
        assert_eq!(visits[2].from_visit, 11);
    }

    #[test]
    fn test_never_visited_url_has_no_last_visit() {
        let source = chromium_source(
            r#"
            INSERT INTO urls VALUES (1, 'https://a.example/', NULL, 0, 0, 0, 1);
            INSERT INTO visits VALUES (1, 1, 13300000000000000, 0, 0);
            "#,
        );
        assert_eq!(source.read_places().unwrap()[0].last_visit_date, None);
    }

    #[test]
    fn test_visit_without_url_is_inconsistent() {
        let source = chromium_source("INSERT INTO visits VALUES (1, 42, 13300000000000000, 0, 0);");
        assert!(matches!(source.read_visits(), Err(Error::ConsistencyViolation(_))));
    }

    #[test]
    fn test_unparseable_url_is_malformed() {
        let source = chromium_source(
            r#"
            INSERT INTO urls VALUES (1, 'not a url', NULL, 1, 0, 13300000000000000, 0);
            INSERT INTO visits VALUES (1, 1, 13300000000000000, 0, 0);
            "#,
        );
        assert!(matches!(source.read_places(), Err(Error::MalformedInput(_))));
    }
}
