//! Metrics engine: grouped aggregates, participation shares and the
//! before/after period comparison.
//!
//! Everything here is a pure function of a loaded `Dataset`.

pub mod aggregate;
pub mod period;

pub use aggregate::*;
pub use period::*;
