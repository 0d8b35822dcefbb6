//! Merge orchestration: the place pass, then the visit pass
//!
//! Each pass runs in its own transaction and either commits fully or leaves the
//! destination as it was. A failed visit pass keeps the committed place pass:
//! those places are valid on their own.

use std::fmt;
use serde::Serialize;
use crate::{Error, Result};
use crate::place::UpsertPolicy;
use crate::source::{HistorySource, SourceKind};
use crate::storage::HistoryStore;
use crate::ui::progress_message::{ProgressPhase, ProgressSink};
use super::places::{PlaceStats, PlaceTable};
use super::visits::{VisitGraphMerger, VisitStats};

/// The two committed units of a merge
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum MergePass {
    Places,
    Visits,
}

impl fmt::Display for MergePass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MergePass::Places => write!(f, "place"),
            MergePass::Visits => write!(f, "visit"),
        }
    }
}

/// Outcome of a completed merge
#[derive(Debug, Clone, Serialize)]
pub struct MergeReport {
    pub source: SourceKind,
    pub policy: UpsertPolicy,
    pub origins_added: usize,
    pub places: PlaceStats,
    pub visits: VisitStats,
}

impl fmt::Display for MergeReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Merge Report ({}, {}):", self.source, self.policy)?;
        writeln!(f, "  Origins added: {}", self.origins_added)?;
        writeln!(f, "  Places added: {}", self.places.inserted)?;
        writeln!(f, "  Places refreshed: {}", self.places.refreshed)?;
        writeln!(f, "  Places already present: {}", self.places.unchanged)?;
        writeln!(f, "  Visits added: {}", self.visits.inserted)?;
        writeln!(f, "  Visits already present: {}", self.visits.reused)?;
        writeln!(f, "  from_visit linked: {}", self.visits.linked)?;
        writeln!(f, "  from_visit cleared: {}", self.visits.cleared)
    }
}

/// Sequences a source through the place and visit passes into a destination
pub struct MergeOrchestrator<'a> {
    store: &'a mut HistoryStore,
    progress: ProgressSink,
}

impl<'a> MergeOrchestrator<'a> {
    pub fn new(store: &'a mut HistoryStore) -> Self {
        Self {
            store,
            progress: ProgressSink::none(),
        }
    }

    pub fn with_progress(mut self, progress: ProgressSink) -> Self {
        self.progress = progress;
        self
    }

    /// Merge `source` into the destination.
    ///
    /// Errors are wrapped in [`Error::PassFailed`] naming the discarded pass.
    pub fn run(&mut self, source: &dyn HistorySource) -> Result<MergeReport> {
        let policy = source.policy();
        tracing::info!("Merging {} history ({})", source.kind(), policy);

        let (origins_added, places) = self
            .merge_places(source, policy)
            .map_err(|e| pass_failed(MergePass::Places, e))?;
        tracing::info!(
            "Place pass committed: {} added, {} refreshed, {} present",
            places.inserted, places.refreshed, places.unchanged
        );

        let visits = self
            .merge_visits(source)
            .map_err(|e| pass_failed(MergePass::Visits, e))?;
        tracing::info!(
            "Visit pass committed: {} added, {} present, {} links cleared",
            visits.inserted, visits.reused, visits.cleared
        );

        Ok(MergeReport {
            source: source.kind(),
            policy,
            origins_added,
            places,
            visits,
        })
    }

    fn merge_places(&mut self, source: &dyn HistorySource, policy: UpsertPolicy) -> Result<(usize, PlaceStats)> {
        let origins = source.read_origins()?;
        let places = source.read_places()?;
        tracing::info!("{} origins and {} places fetched from source", origins.len(), places.len());

        let progress = &self.progress;
        self.store.in_transaction(|store| {
            let mut table = PlaceTable::new(store, policy);
            for origin in &origins {
                table.origins_mut().upsert(origin)?;
            }

            progress.started(ProgressPhase::Places, places.len());
            for (i, place) in places.iter().enumerate() {
                table.upsert(place)?;
                progress.progress(ProgressPhase::Places, i + 1, places.len());
            }
            progress.finished(ProgressPhase::Places);

            Ok((table.origins().added(), table.stats()))
        })
    }

    fn merge_visits(&mut self, source: &dyn HistorySource) -> Result<VisitStats> {
        let visits = source.read_visits()?;
        tracing::info!("{} visits fetched from source", visits.len());

        let progress = &self.progress;
        self.store.in_transaction(|store| {
            let mut merger = VisitGraphMerger::with_capacity(store, visits.len());

            progress.started(ProgressPhase::Visits, visits.len());
            for (i, visit) in visits.iter().enumerate() {
                merger.import(visit)?;
                progress.progress(ProgressPhase::Visits, i + 1, visits.len());
            }
            progress.finished(ProgressPhase::Visits);

            let pending = merger.pending_edges();
            progress.started(ProgressPhase::FromVisits, pending);
            let stats = merger.rewrite_edges(|done| progress.progress(ProgressPhase::FromVisits, done, pending))?;
            progress.finished(ProgressPhase::FromVisits);

            Ok(stats)
        })
    }
}

fn pass_failed(pass: MergePass, source: Error) -> Error {
    tracing::error!("Error during {} pass, not saving it: {}", pass, source);
    Error::PassFailed {
        pass,
        source: Box::new(source),
    }
}
