//! Place upserts keyed by URL content hash

use serde::Serialize;
use crate::{Error, Result};
use crate::hash::url_hash_i64;
use crate::place::{NO_ORIGIN, Place, PlaceOutcome, PlaceRecord, UpsertPolicy, generate_guid};
use crate::storage::HistoryStore;
use super::origins::OriginTable;

/// Counters for one place pass
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct PlaceStats {
    pub inserted: usize,
    pub refreshed: usize,
    pub unchanged: usize,
}

/// Dedupes places against the destination by content hash.
pub struct PlaceTable<'a> {
    store: &'a HistoryStore,
    origins: OriginTable<'a>,
    policy: UpsertPolicy,
    stats: PlaceStats,
}

impl<'a> PlaceTable<'a> {
    pub fn new(store: &'a HistoryStore, policy: UpsertPolicy) -> Self {
        Self {
            store,
            origins: OriginTable::new(store),
            policy,
            stats: PlaceStats::default(),
        }
    }

    pub fn origins(&self) -> &OriginTable<'a> {
        &self.origins
    }

    pub fn origins_mut(&mut self) -> &mut OriginTable<'a> {
        &mut self.origins
    }

    pub fn stats(&self) -> PlaceStats {
        self.stats
    }

    /// Merge one place and return its destination id.
    ///
    /// A new URL is inserted with its origin resolved (or [`NO_ORIGIN`]).
    /// An existing URL is handled by the table's [`UpsertPolicy`].
    pub fn upsert(&mut self, place: &PlaceRecord) -> Result<PlaceOutcome> {
        let hash = url_hash_i64(&place.url)?;
        if let Some(source_hash) = place.source_hash {
            if source_hash != hash {
                tracing::warn!(
                    "Source hash {} for {} disagrees with computed {}; using computed",
                    source_hash, place.url, hash
                );
            }
        }

        let origin_id = match &place.origin {
            Some(origin) => self.origins.upsert(origin)?,
            None => NO_ORIGIN,
        };

        let guid = self.guid_for(place)?;
        if let Some(id) = self.store.insert_place(place, hash, &guid, origin_id)? {
            tracing::debug!("Added place {} as {}", place.url, id);
            self.stats.inserted += 1;
            return Ok(PlaceOutcome::Inserted(id));
        }

        let existing = self.lookup(hash)?.ok_or_else(|| {
            Error::ConsistencyViolation(format!(
                "place {} (url_hash {}) conflicted on insert but cannot be found",
                place.url, hash
            ))
        })?;

        let outcome = match (self.policy, place.last_visit_date) {
            (UpsertPolicy::RefreshIfNewer, Some(last_visit))
                if self.store.refresh_place_counters(existing.id, place.visit_count, last_visit)? =>
            {
                tracing::debug!("Refreshed place {} ({})", existing.id, place.url);
                self.stats.refreshed += 1;
                PlaceOutcome::Refreshed(existing.id)
            }
            _ => {
                self.stats.unchanged += 1;
                PlaceOutcome::Unchanged(existing.id)
            }
        };
        Ok(outcome)
    }

    /// Find the destination place with this content hash.
    ///
    /// More than one match means the destination is corrupt; no match is picked.
    pub fn lookup(&self, url_hash: i64) -> Result<Option<Place>> {
        let mut places = self.store.find_places_by_hash(url_hash)?;
        match places.len() {
            0 | 1 => Ok(places.pop()),
            n => Err(Error::ConsistencyViolation(format!(
                "{} places share url_hash {} (ids {:?})",
                n,
                url_hash,
                places.iter().map(|p| p.id).collect::<Vec<_>>()
            ))),
        }
    }

    /// Destination place id for a URL that must already have been merged
    pub fn resolve(&self, url: &str) -> Result<i64> {
        let hash = url_hash_i64(url)?;
        self.lookup(hash)?.map(|place| place.id).ok_or_else(|| {
            Error::ConsistencyViolation(format!(
                "no destination place for {} (url_hash {}); the source store is inconsistent",
                url, hash
            ))
        })
    }

    /// Keep the source GUID when it is still free, otherwise mint one
    fn guid_for(&self, place: &PlaceRecord) -> Result<String> {
        if let Some(guid) = place.guid.as_deref().filter(|g| !g.is_empty()) {
            if !self.store.guid_exists(guid)? {
                return Ok(guid.to_string());
            }
        }
        Ok(generate_guid())
    }
}
