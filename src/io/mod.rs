//! Input/output helpers.
//!
//! - CSV ingest + validation (`ingest`)
//! - aggregate / channel table exports to CSV (`export`)
//! - dashboard JSON snapshots (`snapshot`)

pub mod export;
pub mod ingest;
pub mod snapshot;

pub use export::*;
pub use ingest::*;
pub use snapshot::*;
