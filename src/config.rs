//! Report configuration.
//!
//! Lookup tables that the business maintains by hand (zone groupings, focus
//! zones, channel colours) live in a JSON file instead of the code. Every
//! field has a default matching the 2025 inventory report, so an absent file
//! is valid.
//!
//! Resolution order for paths: CLI flag, then environment (`VENTAS_CONFIG`,
//! `VENTAS_DATA`, optionally from a `.env` file), then the default.

use std::collections::BTreeMap;
use std::fs::File;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::domain::PeriodSplit;
use crate::error::MetricsError;

pub const CONFIG_ENV: &str = "VENTAS_CONFIG";
pub const DATA_ENV: &str = "VENTAS_DATA";
pub const DEFAULT_DATA_FILE: &str = "sku_canal_zonas_usd.csv";

/// A named set of zones reported together (e.g. `Lima`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ZoneGroup {
    pub name: String,
    pub zones: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReportConfig {
    /// Fiscal year of the monthly columns (`Ene-25` for 2025).
    pub fiscal_year: i32,
    /// Months in the "pre" sub-period.
    pub split_month: usize,
    pub delimiter: char,
    /// Stripped from amounts. `.` selects decimal-comma amounts (`1.234,5`).
    pub thousands_separator: char,
    pub zone_groups: Vec<ZoneGroup>,
    /// Group for zones not listed in `zone_groups`.
    pub default_zone_group: String,
    pub focus_zones: Vec<String>,
    pub channel_colors: BTreeMap<String, String>,
    /// Zones kept in the zone × channel matrix.
    pub top_zones: usize,
}

impl Default for ReportConfig {
    fn default() -> Self {
        let lima = [
            "LIMA",
            "WILSON",
            "MALVINAS",
            "PARURO",
            "AZANGARO",
            "COMPUPALACE",
            "MARSANO",
            "CALLAO",
            "RIMAC",
        ];
        let focus = ["WILSON", "PARURO", "MALVINAS", "AZANGARO", "COMPUPALACE", "MARSANO"];
        let colors = [
            ("MINORISTA", "#4361ee"),
            ("INTEGRADOR", "#7209b7"),
            ("OPERADORES", "#f72585"),
            ("RETAIL", "#4cc9f0"),
        ];

        Self {
            fiscal_year: 2025,
            split_month: 7,
            delimiter: ';',
            thousands_separator: ',',
            zone_groups: vec![ZoneGroup {
                name: "Lima".to_string(),
                zones: lima.iter().map(|z| z.to_string()).collect(),
            }],
            default_zone_group: "Provincia".to_string(),
            focus_zones: focus.iter().map(|z| z.to_string()).collect(),
            channel_colors: colors
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
            top_zones: 10,
        }
    }
}

impl ReportConfig {
    /// Read a JSON config file; missing fields take their defaults.
    pub fn from_path(path: &Path) -> Result<Self, MetricsError> {
        let file = File::open(path).map_err(|source| MetricsError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let config: ReportConfig = serde_json::from_reader(file).map_err(|e| {
            MetricsError::Config(format!("invalid config '{}': {e}", path.display()))
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Load from an explicit path, from `VENTAS_CONFIG`, or fall back to defaults.
    pub fn resolve(cli_path: Option<&Path>) -> Result<Self, MetricsError> {
        match resolve_path(cli_path, CONFIG_ENV) {
            Some(path) => {
                tracing::info!(config = %path.display(), "loading report config");
                Self::from_path(&path)
            }
            None => Ok(Self::default()),
        }
    }

    pub fn validate(&self) -> Result<(), MetricsError> {
        if !self.delimiter.is_ascii() {
            return Err(MetricsError::Config(format!(
                "delimiter '{}' must be a single ASCII character",
                self.delimiter
            )));
        }
        if self.delimiter == self.thousands_separator {
            return Err(MetricsError::Config(
                "delimiter and thousands separator must differ".to_string(),
            ));
        }
        if self.thousands_separator.is_ascii_digit() || matches!(self.thousands_separator, '-' | '+') {
            return Err(MetricsError::Config(format!(
                "thousands separator '{}' would corrupt amounts",
                self.thousands_separator
            )));
        }
        PeriodSplit::new(self.split_month)?;
        Ok(())
    }

    pub fn delimiter_byte(&self) -> u8 {
        // `validate` guarantees ASCII; fall back to `;` otherwise.
        u8::try_from(self.delimiter).unwrap_or(b';')
    }

    /// Name of the group `zone` belongs to (case-insensitive).
    pub fn zone_group_of(&self, zone: &str) -> &str {
        let zone = zone.trim();
        self.zone_groups
            .iter()
            .find(|g| g.zones.iter().any(|z| z.eq_ignore_ascii_case(zone)))
            .map(|g| g.name.as_str())
            .unwrap_or(&self.default_zone_group)
    }

    pub fn channel_color(&self, channel: &str) -> Option<&str> {
        self.channel_colors.get(channel).map(String::as_str)
    }
}

/// Data file path: CLI flag, then `VENTAS_DATA`, then the default file name.
pub fn resolve_data_path(cli_path: Option<&Path>) -> PathBuf {
    resolve_path(cli_path, DATA_ENV).unwrap_or_else(|| PathBuf::from(DEFAULT_DATA_FILE))
}

fn resolve_path(cli_path: Option<&Path>, env_key: &str) -> Option<PathBuf> {
    if let Some(path) = cli_path {
        return Some(path.to_path_buf());
    }
    dotenvy::dotenv().ok();
    std::env::var(env_key)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .map(PathBuf::from)
}

/// Resolved per-invocation settings (CLI flags + `ReportConfig`).
#[derive(Debug, Clone)]
pub struct RunConfig {
    pub data_path: PathBuf,
    pub split: PeriodSplit,
    pub report: ReportConfig,
    pub export_json: Option<PathBuf>,
    pub export_csv: Option<PathBuf>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn defaults_match_source_report() {
        let cfg = ReportConfig::default();
        assert!(cfg.validate().is_ok());
        assert_eq!(cfg.split_month, 7);
        assert_eq!(cfg.zone_group_of("wilson"), "Lima");
        assert_eq!(cfg.zone_group_of("AREQUIPA"), "Provincia");
        assert_eq!(cfg.channel_color("RETAIL"), Some("#4cc9f0"));
        assert_eq!(cfg.channel_color("OTRO"), None);
        assert_eq!(cfg.delimiter_byte(), b';');
    }

    #[test]
    fn partial_json_overrides_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{"split_month": 6, "zone_groups": [{{"name": "Norte", "zones": ["PIURA"]}}]}}"#
        )
        .unwrap();

        let cfg = ReportConfig::from_path(file.path()).unwrap();
        assert_eq!(cfg.split_month, 6);
        assert_eq!(cfg.fiscal_year, 2025);
        assert_eq!(cfg.zone_group_of("Piura"), "Norte");
        assert_eq!(cfg.zone_group_of("LIMA"), "Provincia");
    }

    #[test]
    fn invalid_config_is_rejected() {
        let cfg = ReportConfig {
            split_month: 13,
            ..ReportConfig::default()
        };
        assert!(matches!(cfg.validate(), Err(MetricsError::InvalidSplit { .. })));

        let cfg = ReportConfig {
            delimiter: ',',
            ..ReportConfig::default()
        };
        assert!(matches!(cfg.validate(), Err(MetricsError::Config(_))));

        for sep in ['0', '-'] {
            let cfg = ReportConfig {
                thousands_separator: sep,
                ..ReportConfig::default()
            };
            assert!(matches!(cfg.validate(), Err(MetricsError::Config(_))));
        }

        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "not json").unwrap();
        assert!(matches!(
            ReportConfig::from_path(file.path()),
            Err(MetricsError::Config(_))
        ));
    }

    #[test]
    fn decimal_comma_layout_is_valid() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{"delimiter": ";", "thousands_separator": "."}}"#).unwrap();
        let cfg = ReportConfig::from_path(file.path()).unwrap();
        assert_eq!(cfg.thousands_separator, '.');
        assert_eq!(crate::io::ingest::parse_amount("1.5", cfg.thousands_separator), Ok(15.0));
        assert_eq!(crate::io::ingest::parse_amount("1,5", cfg.thousands_separator), Ok(1.5));
    }

    #[test]
    fn explicit_path_wins() {
        let p = resolve_data_path(Some(Path::new("otro.csv")));
        assert_eq!(p, PathBuf::from("otro.csv"));
    }
}
