//! Shared "report pipeline" logic used by every subcommand.
//!
//! Keeping this in one place avoids duplicating the core workflow:
//! resolve config -> load (cached) dataset -> compute figures
//!
//! Subcommands then focus on presentation and exports.

use std::sync::Arc;

use crate::cache::DatasetCache;
use crate::config::RunConfig;
use crate::domain::Dataset;
use crate::error::AppError;
use crate::report::{Dashboard, build_dashboard};

/// All computed outputs of a single `ventas report` run.
#[derive(Debug, Clone)]
pub struct ReportOutput {
    pub dataset: Arc<Dataset>,
    pub dashboard: Dashboard,
}

/// Load the dataset named by `config` through `cache`.
pub fn load_dataset(cache: &DatasetCache, config: &RunConfig) -> Result<Arc<Dataset>, AppError> {
    let dataset = cache.get_or_load(&config.data_path, config.split)?;
    tracing::info!(
        source = %config.data_path.display(),
        rows = dataset.len(),
        split = config.split.pre_months(),
        "dataset ready"
    );
    Ok(dataset)
}

/// Execute the full report pipeline and return the computed outputs.
pub fn run_report(cache: &DatasetCache, config: &RunConfig) -> Result<ReportOutput, AppError> {
    let dataset = load_dataset(cache, config)?;
    let dashboard = build_dashboard(&dataset, &config.report);
    Ok(ReportOutput { dataset, dashboard })
}
