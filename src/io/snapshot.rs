//! Dashboard JSON snapshots.
//!
//! A snapshot is the portable form of one report run: every figure plus the
//! run metadata, for a presentation layer that renders charts elsewhere.

use std::fs::File;
use std::path::Path;

use chrono::{DateTime, Local};
use serde::Serialize;

use crate::error::AppError;
use crate::report::Dashboard;

#[derive(Debug, Clone, Serialize)]
pub struct DashboardFile<'a> {
    pub tool: &'static str,
    pub generated_at: DateTime<Local>,
    pub dashboard: &'a Dashboard,
}

/// Write a dashboard snapshot as pretty-printed JSON.
pub fn write_dashboard_json(path: &Path, dashboard: &Dashboard) -> Result<(), AppError> {
    let file = File::create(path)
        .map_err(|e| AppError::new(2, format!("Failed to create dashboard JSON '{}': {e}", path.display())))?;

    let snapshot = DashboardFile {
        tool: "ventas",
        generated_at: Local::now(),
        dashboard,
    };

    serde_json::to_writer_pretty(file, &snapshot)
        .map_err(|e| AppError::new(2, format!("Failed to write dashboard JSON: {e}")))?;

    tracing::info!(path = %path.display(), "dashboard snapshot written");
    Ok(())
}
