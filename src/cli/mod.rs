//! Command-line parsing for the sales metrics report.
//!
//! The goal of this module is to keep **argument parsing** separate from the
//! metrics code; `app` turns these types into a `RunConfig`.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use crate::domain::{Dimension, Field, Reducer};

/// Top-level CLI.
#[derive(Debug, Parser)]
#[command(name = "ventas", version, about = "Monthly sales metrics by SKU, zone and channel")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

/// CLI subcommands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Print the full sales report and optionally export it.
    Report(ReportArgs),
    /// Group the dataset by one or more columns and reduce a metric.
    Aggregate(AggregateArgs),
    /// Compare monthly averages before and after the period split.
    Compare(SourceArgs),
}

/// Where the data comes from and how it is split.
#[derive(Debug, Args, Clone)]
pub struct SourceArgs {
    /// Semicolon-separated sales CSV (default: $VENTAS_DATA or sku_canal_zonas_usd.csv).
    #[arg(long, value_name = "CSV")]
    pub data: Option<PathBuf>,

    /// JSON report configuration (default: $VENTAS_CONFIG or built-in defaults).
    #[arg(long, value_name = "JSON")]
    pub config: Option<PathBuf>,

    /// Months in the "before" sub-period (overrides the config).
    #[arg(long, value_name = "MONTHS")]
    pub split: Option<usize>,
}

#[derive(Debug, Args, Clone)]
pub struct ReportArgs {
    #[command(flatten)]
    pub source: SourceArgs,

    /// Zones shown in the zone x channel table (overrides the config).
    #[arg(long)]
    pub top: Option<usize>,

    /// Write every figure to a JSON snapshot.
    #[arg(long = "export-json", value_name = "JSON")]
    pub export_json: Option<PathBuf>,

    /// Write the channel table to CSV.
    #[arg(long = "export-csv", value_name = "CSV")]
    pub export_csv: Option<PathBuf>,
}

#[derive(Debug, Args, Clone)]
pub struct AggregateArgs {
    #[command(flatten)]
    pub source: SourceArgs,

    /// Grouping column (repeatable): ARTICULO, ZONA_CONSOLIDADO, CANAL, SABCT.
    #[arg(long = "by", required = true, value_name = "COLUMN")]
    pub by: Vec<Dimension>,

    /// Column to reduce: TOTAL_YEAR, PRE_PERIOD_TOTAL, POST_PERIOD_TOTAL, a month (Ene-25) or ARTICULO.
    #[arg(long, default_value = "TOTAL_YEAR", value_name = "COLUMN")]
    pub metric: Field,

    #[arg(long, value_enum, default_value_t = Reducer::Sum)]
    pub reducer: Reducer,

    /// Print each group's share of the total instead of the value.
    #[arg(long)]
    pub share: bool,

    /// Write the aggregate to CSV.
    #[arg(long = "export-csv", value_name = "CSV")]
    pub export_csv: Option<PathBuf>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Measure;

    #[test]
    fn aggregate_args_parse() {
        let cli = Cli::parse_from([
            "ventas",
            "aggregate",
            "--by",
            "ZONA_CONSOLIDADO",
            "--by",
            "canal",
            "--metric",
            "ARTICULO",
            "--reducer",
            "count-distinct",
            "--split",
            "6",
        ]);
        let Command::Aggregate(args) = cli.command else {
            panic!("expected aggregate");
        };
        assert_eq!(args.by, vec![Dimension::Zona, Dimension::Canal]);
        assert_eq!(args.metric, Field::Dimension(Dimension::Articulo));
        assert_eq!(args.reducer, Reducer::CountDistinct);
        assert_eq!(args.source.split, Some(6));
        assert!(!args.share);
    }

    #[test]
    fn aggregate_defaults_to_total_sum() {
        let cli = Cli::parse_from(["ventas", "aggregate", "--by", "CANAL"]);
        let Command::Aggregate(args) = cli.command else {
            panic!("expected aggregate");
        };
        assert_eq!(args.metric, Field::Measure(Measure::TotalYear));
        assert_eq!(args.reducer, Reducer::Sum);
    }

    #[test]
    fn unknown_column_is_rejected() {
        assert!(Cli::try_parse_from(["ventas", "aggregate", "--by", "PRECIO"]).is_err());
        assert!(Cli::try_parse_from(["ventas", "aggregate"]).is_err());
    }

    #[test]
    fn report_flags() {
        let cli = Cli::parse_from([
            "ventas",
            "report",
            "--data",
            "ventas.csv",
            "--top",
            "5",
            "--export-json",
            "out.json",
        ]);
        let Command::Report(args) = cli.command else {
            panic!("expected report");
        };
        assert_eq!(args.source.data, Some(PathBuf::from("ventas.csv")));
        assert_eq!(args.top, Some(5));
        assert_eq!(args.export_json, Some(PathBuf::from("out.json")));
        assert!(args.export_csv.is_none());
    }
}
