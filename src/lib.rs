//! `ventas-metrics` library crate.
//!
//! Loads the monthly SKU x zone x channel sales export and computes the
//! figures of the yearly inventory movement report. The binary (`ventas`) is
//! a thin wrapper around this library so that:
//!
//! - the metrics are testable without spawning processes
//! - a presentation layer can reuse the same figures (see `io::snapshot`)

pub mod app;
pub mod cache;
pub mod cli;
pub mod config;
pub mod domain;
pub mod error;
pub mod io;
pub mod metrics;
pub mod report;
