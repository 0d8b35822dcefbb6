//! Firefox `places.sqlite` source (peer store)
//!
//! Same layout as the destination, so rows are copied nearly verbatim. Only
//! ids differ: places are matched by content hash and origins by key.

use rusqlite::Connection;
use crate::{Error, Result};
use crate::place::{OriginRecord, PlaceRecord};
use crate::storage::schema::has_table;
use crate::visit::{NO_VISIT, VisitRecord};
use super::{HistorySource, SourceKind, lossy_text};

pub struct FirefoxSource {
    conn: Connection,
}

impl FirefoxSource {
    /// Wrap an open connection after checking it carries the Firefox tables
    pub fn from_connection(conn: Connection) -> Result<Self> {
        for table in ["moz_origins", "moz_places", "moz_historyvisits"] {
            if !has_table(&conn, table)? {
                return Err(Error::UnsupportedSchema(format!(
                    "Firefox source has no {} table",
                    table
                )));
            }
        }
        Ok(Self { conn })
    }
}

impl HistorySource for FirefoxSource {
    fn kind(&self) -> SourceKind {
        SourceKind::Firefox
    }

    fn read_origins(&self) -> Result<Vec<OriginRecord>> {
        let mut stmt = self.conn.prepare("SELECT prefix, host, frecency FROM moz_origins ORDER BY id")?;
        let origins = stmt
            .query_map([], |row| {
                Ok(OriginRecord {
                    prefix: lossy_text(row, 0)?.unwrap_or_default(),
                    host: lossy_text(row, 1)?.unwrap_or_default(),
                    frecency: row.get::<_, Option<i64>>(2)?.unwrap_or(-1),
                })
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(origins)
    }

    fn read_places(&self) -> Result<Vec<PlaceRecord>> {
        let mut stmt = self.conn.prepare(
            r#"
            SELECT p.url, p.title, p.rev_host, p.visit_count, p.hidden, p.typed, p.frecency,
                   p.last_visit_date, p.guid, p.foreign_count, p.url_hash, p.description,
                   p.preview_image_url, o.prefix, o.host, o.frecency
            FROM moz_places p
            LEFT JOIN moz_origins o ON p.origin_id = o.id
            ORDER BY p.id
            "#,
        )?;

        let places = stmt
            .query_map([], |row| {
                let origin = match (lossy_text(row, 13)?, lossy_text(row, 14)?) {
                    (Some(prefix), Some(host)) => Some(OriginRecord {
                        prefix,
                        host,
                        frecency: row.get::<_, Option<i64>>(15)?.unwrap_or(-1),
                    }),
                    _ => None,
                };

                Ok(PlaceRecord {
                    url: lossy_text(row, 0)?.unwrap_or_default(),
                    title: lossy_text(row, 1)?,
                    rev_host: lossy_text(row, 2)?,
                    visit_count: row.get::<_, Option<i64>>(3)?.unwrap_or(0),
                    hidden: row.get::<_, Option<i64>>(4)?.unwrap_or(0),
                    typed: row.get::<_, Option<i64>>(5)?.unwrap_or(0),
                    frecency: row.get::<_, Option<i64>>(6)?.unwrap_or(-1),
                    last_visit_date: row.get(7)?,
                    guid: lossy_text(row, 8)?,
                    foreign_count: row.get::<_, Option<i64>>(9)?.unwrap_or(0),
                    source_hash: row.get::<_, Option<i64>>(10)?.filter(|h| *h != 0),
                    description: lossy_text(row, 11)?,
                    preview_image_url: lossy_text(row, 12)?,
                    origin,
                })
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(places)
    }

    fn read_visits(&self) -> Result<Vec<VisitRecord>> {
        let mut stmt = self.conn.prepare(
            r#"
            SELECT v.id, v.from_visit, v.place_id, p.url, v.visit_date, v.visit_type, v.session
            FROM moz_historyvisits v
            LEFT JOIN moz_places p ON p.id = v.place_id
            ORDER BY v.visit_date, v.id
            "#,
        )?;

        let rows = stmt
            .query_map([], |row| {
                Ok((
                    row.get::<_, i64>(0)?,
                    row.get::<_, Option<i64>>(1)?,
                    row.get::<_, Option<i64>>(2)?,
                    lossy_text(row, 3)?,
                    row.get::<_, Option<i64>>(4)?,
                    row.get::<_, Option<i64>>(5)?,
                    row.get::<_, Option<i64>>(6)?,
                ))
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        rows.into_iter()
            .map(|(id, from_visit, place_id, url, visit_date, visit_type, session)| {
                let url = url.ok_or_else(|| {
                    Error::ConsistencyViolation(format!(
                        "source visit {} references place {:?} which the source does not contain",
                        id, place_id
                    ))
                })?;
                Ok(VisitRecord {
                    id,
                    from_visit: from_visit.unwrap_or(NO_VISIT),
                    url,
                    visit_date: visit_date.unwrap_or(0),
                    visit_type,
                    session,
                })
            })
            .collect()
    }
}
