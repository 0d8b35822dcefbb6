//! Merge engine
//!
//! - [`OriginTable`]: `(prefix, host)` → origin id, insert on miss
//! - [`PlaceTable`]: content hash → place id, insert on miss, policy on hit
//! - [`VisitGraphMerger`]: two-phase visit import and `from_visit` rewrite
//! - [`MergeOrchestrator`]: place pass, then visit pass, one transaction each

pub mod origins;
pub mod places;
pub mod visits;
pub mod orchestrator;

pub use origins::OriginTable;
pub use places::{PlaceTable, PlaceStats};
pub use visits::{VisitGraphMerger, VisitStats};
pub use orchestrator::{MergeOrchestrator, MergeReport, MergePass};
