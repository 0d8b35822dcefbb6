//! Caller-assembled source records

use crate::Result;
use crate::place::{OriginRecord, PlaceRecord, UpsertPolicy};
use crate::visit::VisitRecord;
use super::{HistorySource, SourceKind};

/// A source whose records are already in memory.
///
/// Used to merge records produced elsewhere (imports, other tools) and in tests.
#[derive(Debug, Clone)]
pub struct InMemorySource {
    kind: SourceKind,
    policy: Option<UpsertPolicy>,
    origins: Vec<OriginRecord>,
    places: Vec<PlaceRecord>,
    visits: Vec<VisitRecord>,
}

impl InMemorySource {
    pub fn new(kind: SourceKind) -> Self {
        Self {
            kind,
            policy: None,
            origins: Vec::new(),
            places: Vec::new(),
            visits: Vec::new(),
        }
    }

    pub fn with_origins(mut self, origins: Vec<OriginRecord>) -> Self {
        self.origins = origins;
        self
    }

    pub fn with_places(mut self, places: Vec<PlaceRecord>) -> Self {
        self.places = places;
        self
    }

    /// Visits must already be in chronological order
    pub fn with_visits(mut self, visits: Vec<VisitRecord>) -> Self {
        self.visits = visits;
        self
    }

    /// Override the policy implied by the source kind
    pub fn with_policy(mut self, policy: UpsertPolicy) -> Self {
        self.policy = Some(policy);
        self
    }
}

impl HistorySource for InMemorySource {
    fn kind(&self) -> SourceKind {
        self.kind
    }

    fn policy(&self) -> UpsertPolicy {
        self.policy.unwrap_or_else(|| self.kind.default_policy())
    }

    fn read_origins(&self) -> Result<Vec<OriginRecord>> {
        Ok(self.origins.clone())
    }

    fn read_places(&self) -> Result<Vec<PlaceRecord>> {
        Ok(self.places.clone())
    }

    fn read_visits(&self) -> Result<Vec<VisitRecord>> {
        Ok(self.visits.clone())
    }
}
