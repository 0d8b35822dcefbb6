//! Origin upserts keyed by `(prefix, host)`

use crate::{Error, Result};
use crate::place::OriginRecord;
use crate::storage::HistoryStore;

/// Dedupes origins against the destination.
///
/// An existing origin is returned as-is; its frecency is never touched.
pub struct OriginTable<'a> {
    store: &'a HistoryStore,
    added: usize,
}

impl<'a> OriginTable<'a> {
    pub fn new(store: &'a HistoryStore) -> Self {
        Self { store, added: 0 }
    }

    /// Return the destination id for `origin`, inserting it on first sighting
    pub fn upsert(&mut self, origin: &OriginRecord) -> Result<i64> {
        if let Some(id) = self.store.insert_origin(origin)? {
            tracing::debug!("Added origin {}{} as {}", origin.prefix, origin.host, id);
            self.added += 1;
            return Ok(id);
        }

        self.store
            .find_origin(&origin.prefix, &origin.host)?
            .ok_or_else(|| {
                Error::ConsistencyViolation(format!(
                    "origin ({:?}, {:?}) conflicted on insert but cannot be found",
                    origin.prefix, origin.host
                ))
            })
    }

    /// Origins inserted by this table so far
    pub fn added(&self) -> usize {
        self.added
    }
}
