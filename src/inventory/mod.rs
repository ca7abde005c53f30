//! Hardware inventory domain: the validated snapshot schema, the slot/disk
//! matching policy and the pure reconciler.

pub mod matching;
pub mod reconcile;
pub mod snapshot;

pub use reconcile::{Baseline, Divergence, FamilyOutcome, ReconcileReport, reconcile};
pub use snapshot::{IngestRequest, InventorySnapshot, ValidationError};
