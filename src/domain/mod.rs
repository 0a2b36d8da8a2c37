//! Domain types used throughout the pipeline.
//!
//! This module defines:
//!
//! - closed enumerations for the source schema (`Month`, `Sabct`)
//! - addressable columns (`Dimension`, `Measure`, `Field`) and `Reducer`
//! - the typed record and dataset (`SalesRecord`, `Dataset`)

pub mod types;

pub use types::*;
