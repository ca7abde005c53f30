//! The `services` module wraps every query the application runs against the
//! inventory store. HTTP handlers and the liveness task call these functions and
//! never build SQL themselves.
//!
//! Functions are generic over `ConnectionTrait` so they run the same on a pool
//! and inside the per-ingest transaction. Everything is re-exported under
//! `crate::db::services::`.

pub mod change_record_service;
pub mod device_service;
pub mod ingest_service;
pub mod liveness_service;

pub use change_record_service::*;
pub use device_service::*;
pub use ingest_service::*;
pub use liveness_service::*;
