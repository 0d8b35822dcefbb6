//! Visit graph merging
//!
//! Source visits link to their predecessor through `from_visit`, expressed in
//! source ids. The destination assigns its own ids, and some predecessors are
//! not in the batch at all (expired, filtered, or never recorded). The merge
//! therefore runs in two phases:
//!
//! 1. **Node import** - every source visit, in source order, is matched to an
//!    existing destination visit by `(place, visit_date)` or inserted with its
//!    raw source `from_visit` as a placeholder. Every source id is mapped to
//!    its destination id; inserted ids are remembered.
//! 2. **Edge rewrite** - only visits inserted by this run get their placeholder
//!    translated through the map, or cleared to 0 when the predecessor was not
//!    part of the batch.
//!
//! Visits that existed before the run are never rewritten: their links were set
//! by an earlier merge whose batch is no longer available.
//!
//! Edge direction and cycles do not matter, so no topological order is needed.

use std::collections::HashMap;
use serde::Serialize;
use crate::{Error, Result};
use crate::hash::url_hash_i64;
use crate::place::UpsertPolicy;
use crate::storage::HistoryStore;
use crate::visit::{NO_VISIT, VisitIdMap, VisitRecord};
use super::places::PlaceTable;

/// Counters for one visit pass
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct VisitStats {
    pub inserted: usize,
    pub reused: usize,
    /// Inserted visits whose predecessor was found in the batch
    pub linked: usize,
    /// Inserted visits whose predecessor was outside the batch
    pub cleared: usize,
}

/// Imports visits and reconstructs their `from_visit` links.
pub struct VisitGraphMerger<'a> {
    store: &'a HistoryStore,
    places: PlaceTable<'a>,
    /// url_hash → destination place id
    place_ids: HashMap<i64, i64>,
    id_map: VisitIdMap,
    /// Destination ids inserted by this run, in insertion order
    touched: Vec<i64>,
    stats: VisitStats,
}

impl<'a> VisitGraphMerger<'a> {
    /// Merger sized for a batch of `visits` source visits
    pub fn with_capacity(store: &'a HistoryStore, visits: usize) -> Self {
        Self {
            store,
            // Places are only resolved here, never upserted.
            places: PlaceTable::new(store, UpsertPolicy::SkipIfPresent),
            place_ids: HashMap::new(),
            id_map: VisitIdMap::with_capacity(visits),
            touched: Vec::with_capacity(visits),
            stats: VisitStats::default(),
        }
    }

    /// Phase 1: import one source visit and return its destination id.
    ///
    /// Fails with `ConsistencyViolation` when the visit's place was never
    /// merged, which means the source was inconsistent to begin with.
    pub fn import(&mut self, visit: &VisitRecord) -> Result<i64> {
        let place_id = self.resolve_place(&visit.url)?;

        let inserted = self.store.insert_visit(
            visit.from_visit,
            place_id,
            visit.visit_date,
            visit.visit_type,
            visit.session,
        )?;

        let dest_id = match inserted {
            Some(id) => {
                self.touched.push(id);
                self.stats.inserted += 1;
                id
            }
            None => {
                self.stats.reused += 1;
                self.store.find_visit(place_id, visit.visit_date)?.ok_or_else(|| {
                    Error::ConsistencyViolation(format!(
                        "visit (place {}, date {}) conflicted on insert but cannot be found",
                        place_id, visit.visit_date
                    ))
                })?
            }
        };

        self.id_map.insert(visit.id, dest_id);
        Ok(dest_id)
    }

    /// Number of visits inserted so far; the amount of work phase 2 will do
    pub fn pending_edges(&self) -> usize {
        self.touched.len()
    }

    pub fn id_map(&self) -> &VisitIdMap {
        &self.id_map
    }

    /// Phase 2: rewrite the placeholder `from_visit` of every visit this run
    /// inserted. Consumes the merger so no import can follow.
    ///
    /// `on_progress` receives the number of visits rewritten so far.
    pub fn rewrite_edges(mut self, mut on_progress: impl FnMut(usize)) -> Result<VisitStats> {
        for (done, &id) in self.touched.iter().enumerate() {
            let raw = self.store.from_visit_of(id)?.ok_or_else(|| {
                Error::ConsistencyViolation(format!("visit {} inserted by this merge has disappeared", id))
            })?;

            match self.id_map.translate(raw) {
                Some(NO_VISIT) => {}
                Some(dest) => {
                    self.store.set_from_visit(id, dest)?;
                    self.stats.linked += 1;
                }
                None => {
                    tracing::debug!("Visit {}: predecessor {} not in batch, clearing", id, raw);
                    self.store.set_from_visit(id, NO_VISIT)?;
                    self.stats.cleared += 1;
                }
            }
            on_progress(done + 1);
        }

        if self.stats.cleared > 0 {
            tracing::info!(
                "{} visits referenced a predecessor outside this merge; their from_visit was cleared",
                self.stats.cleared
            );
        }
        Ok(self.stats)
    }

    fn resolve_place(&mut self, url: &str) -> Result<i64> {
        let hash = url_hash_i64(url)?;
        if let Some(&id) = self.place_ids.get(&hash) {
            return Ok(id);
        }
        let id = self.places.resolve(url)?;
        self.place_ids.insert(hash, id);
        Ok(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::place::PlaceRecord;

    fn store_with_places(urls: &[&str]) -> HistoryStore {
        let store = HistoryStore::open_in_memory().unwrap();
        {
            let mut table = PlaceTable::new(&store, UpsertPolicy::SkipIfPresent);
            for url in urls {
                table.upsert(&PlaceRecord::new(*url)).unwrap();
            }
        }
        store
    }

    fn visit(id: i64, from_visit: i64, url: &str, date: i64) -> VisitRecord {
        VisitRecord {
            id,
            from_visit,
            url: url.to_string(),
            visit_date: date,
            visit_type: Some(1),
            session: None,
        }
    }

    fn place_id(store: &HistoryStore, url: &str) -> i64 {
        store.find_places_by_hash(url_hash_i64(url).unwrap()).unwrap()[0].id
    }

    fn merge(store: &HistoryStore, visits: &[VisitRecord]) -> Result<VisitStats> {
        let mut merger = VisitGraphMerger::with_capacity(store, visits.len());
        for v in visits {
            merger.import(v)?;
        }
        merger.rewrite_edges(|_| {})
    }

    #[test]
    fn test_chain_is_remapped() {
        let store = store_with_places(&["https://a.example/"]);
        // Offset destination ids from source ids.
        let mut merger = VisitGraphMerger::with_capacity(&store, 2);
        merger.import(&visit(900, 0, "https://a.example/", 1)).unwrap();
        merger.rewrite_edges(|_| {}).unwrap();

        let mut merger = VisitGraphMerger::with_capacity(&store, 2);
        let first = merger.import(&visit(10, 0, "https://a.example/", 100)).unwrap();
        let second = merger.import(&visit(11, 10, "https://a.example/", 200)).unwrap();
        let stats = merger.rewrite_edges(|_| {}).unwrap();

        assert_eq!(store.get_visit(second).unwrap().unwrap().from_visit, first);
        assert_eq!(store.get_visit(first).unwrap().unwrap().from_visit, NO_VISIT);
        assert_eq!(stats, VisitStats { inserted: 2, reused: 0, linked: 1, cleared: 0 });
    }

    #[test]
    fn test_forward_reference_resolves() {
        let store = store_with_places(&["https://a.example/", "https://b.example/"]);
        // Successor listed before its predecessor.
        let visits = [
            visit(2, 1, "https://b.example/", 200),
            visit(1, 0, "https://a.example/", 100),
        ];
        merge(&store, &visits).unwrap();

        let a = store.find_visit(place_id(&store, "https://a.example/"), 100).unwrap().unwrap();
        let b = store.find_visit(place_id(&store, "https://b.example/"), 200).unwrap().unwrap();
        assert_eq!(store.get_visit(b).unwrap().unwrap().from_visit, a);
    }

    #[test]
    fn test_missing_predecessor_cleared() {
        let store = store_with_places(&["https://a.example/"]);
        let stats = merge(&store, &[visit(5, 4_000, "https://a.example/", 100)]).unwrap();

        assert_eq!(stats.cleared, 1);
        assert!(store.verify().unwrap().is_clean());
        let id = store.find_visit(place_id(&store, "https://a.example/"), 100).unwrap().unwrap();
        assert_eq!(store.get_visit(id).unwrap().unwrap().from_visit, NO_VISIT);
    }

    #[test]
    fn test_cycle_tolerated() {
        let store = store_with_places(&["https://a.example/", "https://b.example/"]);
        let stats = merge(
            &store,
            &[visit(1, 2, "https://a.example/", 100), visit(2, 1, "https://b.example/", 200)],
        )
        .unwrap();

        assert_eq!(stats.linked, 2);
        assert!(store.verify().unwrap().is_clean());
    }

    #[test]
    fn test_existing_visits_reused_and_untouched() {
        let store = store_with_places(&["https://a.example/"]);
        let place = place_id(&store, "https://a.example/");
        let existing = store.insert_visit(0, place, 100, Some(1), None).unwrap().unwrap();
        let linked_elsewhere = store.insert_visit(existing, place, 150, Some(1), None).unwrap().unwrap();

        let mut merger = VisitGraphMerger::with_capacity(&store, 2);
        let reused = merger.import(&visit(1, 0, "https://a.example/", 100)).unwrap();
        let again = merger.import(&visit(2, 77, "https://a.example/", 150)).unwrap();
        let fresh = merger.import(&visit(3, 2, "https://a.example/", 200)).unwrap();
        assert_eq!(merger.pending_edges(), 1);
        assert_eq!(merger.id_map().get(2), Some(linked_elsewhere));
        let stats = merger.rewrite_edges(|_| {}).unwrap();

        assert_eq!(reused, existing);
        assert_eq!(again, linked_elsewhere);
        assert_eq!(store.get_visit(linked_elsewhere).unwrap().unwrap().from_visit, existing);
        assert_eq!(store.get_visit(fresh).unwrap().unwrap().from_visit, linked_elsewhere);
        assert_eq!(stats, VisitStats { inserted: 1, reused: 2, linked: 1, cleared: 0 });
    }

    #[test]
    fn test_unknown_place_is_fatal() {
        let store = store_with_places(&["https://a.example/"]);
        let err = merge(&store, &[visit(1, 0, "https://nowhere.example/", 100)]).unwrap_err();
        assert!(matches!(err, Error::ConsistencyViolation(_)));
    }

    #[test]
    fn test_progress_counts_rewrites() {
        let store = store_with_places(&["https://a.example/"]);
        let mut merger = VisitGraphMerger::with_capacity(&store, 2);
        merger.import(&visit(1, 0, "https://a.example/", 1)).unwrap();
        merger.import(&visit(2, 1, "https://a.example/", 2)).unwrap();

        let mut seen = Vec::new();
        merger.rewrite_edges(|done| seen.push(done)).unwrap();
        assert_eq!(seen, vec![1, 2]);
    }
}
