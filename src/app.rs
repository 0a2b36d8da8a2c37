//! Top-level application orchestration.
//!
//! `src/main.rs` only sets up logging; this module is the "real main" that:
//! - parses CLI arguments
//! - resolves the report configuration and data path
//! - loads the dataset through the cache
//! - prints figures and writes optional exports

use clap::Parser;

use crate::cache::DatasetCache;
use crate::cli::{AggregateArgs, Command, ReportArgs, SourceArgs};
use crate::config::{ReportConfig, RunConfig, resolve_data_path};
use crate::domain::PeriodSplit;
use crate::error::AppError;
use crate::io::ingest::SourceLayout;

pub mod pipeline;

/// Entry point for the `ventas` binary.
pub fn run() -> Result<(), AppError> {
    // `ventas` and `ventas --data x.csv` behave like `ventas report ...`.
    let argv = rewrite_args(std::env::args().collect());
    let cli = crate::cli::Cli::parse_from(argv);

    match cli.command {
        Command::Report(args) => handle_report(args),
        Command::Aggregate(args) => handle_aggregate(args),
        Command::Compare(args) => handle_compare(args),
    }
}

fn handle_report(args: ReportArgs) -> Result<(), AppError> {
    let mut config = run_config_from_args(&args.source)?;
    if let Some(top) = args.top {
        config.report.top_zones = top;
    }
    config.export_json = args.export_json;
    config.export_csv = args.export_csv;

    let cache = cache_for(&config);
    let run = pipeline::run_report(&cache, &config)?;

    println!("{}", crate::report::format_dashboard(&run.dashboard));

    if let Some(path) = &config.export_json {
        crate::io::snapshot::write_dashboard_json(path, &run.dashboard)?;
    }
    if let Some(path) = &config.export_csv {
        crate::io::export::write_channels_csv(path, &run.dashboard.channels)?;
    }

    Ok(())
}

fn handle_aggregate(args: AggregateArgs) -> Result<(), AppError> {
    let mut config = run_config_from_args(&args.source)?;
    config.export_csv = args.export_csv.clone();

    let cache = cache_for(&config);
    let dataset = pipeline::load_dataset(&cache, &config)?;

    let mut aggregate =
        crate::metrics::aggregate_by(&dataset, &args.by, args.metric, args.reducer)?;
    if args.share {
        aggregate = crate::metrics::participation(&aggregate);
    }

    println!("{}", crate::report::format_aggregate(&aggregate, args.metric, args.share));

    if let Some(path) = &config.export_csv {
        let label = args.share.then_some("PARTICIPACION");
        crate::io::export::write_aggregate_csv(path, &aggregate, args.metric, label)?;
    }

    Ok(())
}

fn handle_compare(args: SourceArgs) -> Result<(), AppError> {
    let config = run_config_from_args(&args)?;
    let cache = cache_for(&config);
    let dataset = pipeline::load_dataset(&cache, &config)?;

    let comparison = crate::metrics::split_comparison(&dataset)?;
    println!("{}", crate::report::format_comparison(&comparison));
    Ok(())
}

fn cache_for(config: &RunConfig) -> DatasetCache {
    DatasetCache::new(SourceLayout::from_config(&config.report))
}

/// Resolve the config file, data path and split for one invocation.
///
/// `--split` wins over the config's `split_month`.
pub fn run_config_from_args(args: &SourceArgs) -> Result<RunConfig, AppError> {
    let report = ReportConfig::resolve(args.config.as_deref())?;
    let split = PeriodSplit::new(args.split.unwrap_or(report.split_month))?;
    let data_path = resolve_data_path(args.data.as_deref());

    tracing::debug!(
        data = %data_path.display(),
        split = split.pre_months(),
        "run configuration resolved"
    );

    Ok(RunConfig {
        data_path,
        split,
        report,
        export_json: None,
        export_csv: None,
    })
}

/// Rewrite argv so `ventas` defaults to `ventas report`.
///
/// Rules:
/// - `ventas`                      -> `ventas report`
/// - `ventas --data x.csv ...`     -> `ventas report --data x.csv ...`
/// - `ventas --help/--version/-h`  -> unchanged (show top-level help/version)
fn rewrite_args(mut argv: Vec<String>) -> Vec<String> {
    let Some(arg1) = argv.get(1).cloned() else {
        argv.push("report".to_string());
        return argv;
    };

    let is_top_level_help_or_version = matches!(
        arg1.as_str(),
        "-h" | "--help" | "-V" | "--version" | "help"
    );
    if is_top_level_help_or_version {
        return argv;
    }

    if matches!(arg1.as_str(), "report" | "aggregate" | "compare") {
        return argv;
    }

    if arg1.starts_with('-') {
        argv.insert(1, "report".to_string());
    }
    argv
}
