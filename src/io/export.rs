//! CSV exports.
//!
//! Exports use the same `;` convention as the source file so they open
//! cleanly in the spreadsheets the source came from.

use std::path::Path;

use crate::domain::Field;
use crate::error::AppError;
use crate::metrics::Aggregate;
use crate::report::ChannelRow;

/// Write one aggregate: a column per group key plus the value column.
pub fn write_aggregate_csv(
    path: &Path,
    aggregate: &Aggregate,
    metric: Field,
    value_label: Option<&str>,
) -> Result<(), AppError> {
    let mut writer = open_writer(path)?;

    let mut header: Vec<String> = aggregate
        .dimensions()
        .iter()
        .map(|d| d.column_name().to_string())
        .collect();
    header.push(value_label.map(str::to_string).unwrap_or_else(|| metric.column_name()));
    writer
        .write_record(&header)
        .map_err(|e| AppError::new(2, format!("Failed to write export CSV header: {e}")))?;

    for (key, value) in aggregate.sorted_desc() {
        let mut row = key.clone();
        row.push(format!("{value:.4}"));
        writer
            .write_record(&row)
            .map_err(|e| AppError::new(2, format!("Failed to write export CSV row: {e}")))?;
    }

    writer
        .flush()
        .map_err(|e| AppError::new(2, format!("Failed to flush export CSV: {e}")))?;
    tracing::info!(path = %path.display(), groups = aggregate.len(), "aggregate exported");
    Ok(())
}

/// Write the per-channel table of the dashboard.
pub fn write_channels_csv(path: &Path, rows: &[ChannelRow]) -> Result<(), AppError> {
    let mut writer = open_writer(path)?;

    writer
        .write_record(["CANAL", "VENTA", "SKUS", "PROMEDIO_MENSUAL", "PARTICIPACION", "COLOR"])
        .map_err(|e| AppError::new(2, format!("Failed to write export CSV header: {e}")))?;

    for r in rows {
        writer
            .write_record([
                r.channel.clone(),
                format!("{:.4}", r.sales),
                r.skus.to_string(),
                format!("{:.4}", r.monthly_average),
                format!("{:.4}", r.participation),
                r.color.clone().unwrap_or_default(),
            ])
            .map_err(|e| AppError::new(2, format!("Failed to write export CSV row: {e}")))?;
    }

    writer
        .flush()
        .map_err(|e| AppError::new(2, format!("Failed to flush export CSV: {e}")))?;
    tracing::info!(path = %path.display(), channels = rows.len(), "channel table exported");
    Ok(())
}

fn open_writer(path: &Path) -> Result<csv::Writer<std::fs::File>, AppError> {
    csv::WriterBuilder::new()
        .delimiter(b';')
        .from_path(path)
        .map_err(|e| AppError::new(2, format!("Failed to create export CSV '{}': {e}", path.display())))
}
