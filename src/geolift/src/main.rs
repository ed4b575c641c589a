//! GeoLift command-line driver for the geo-experiment measurement core.
//!
//! Reads a JSON array of observations, runs the requested operation and
//! prints the result as JSON on stdout. Logs go to stderr.

use anyhow::Context;
use clap::{Args, Parser, Subcommand};
use geolift_core::config::AppConfig;
use geolift_core::{AggregationMethod, EmptyGroupPolicy, Observation, Partition};
use geolift_measurement::{
    validate_data_quality, AnalysisReport, AnalysisWindow, IncrementalityEstimator,
    RepresentativeSampler,
};
use serde::Serialize;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

#[derive(Parser, Debug)]
#[command(name = "geolift")]
#[command(about = "Representative location sampling and geo incrementality analysis")]
#[command(version)]
struct Cli {
    /// Optional TOML config file
    #[arg(long, global = true, env = "GEOLIFT_CONFIG")]
    config: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Pick locations spanning the distribution of an outcome
    Sample(SampleArgs),
    /// Estimate the incremental effect of treatment locations
    Analyze(AnalyzeArgs),
    /// Check a table for problems before analysis
    Check(CheckArgs),
}

#[derive(Args, Debug)]
struct SampleArgs {
    /// JSON file holding an array of observations
    #[arg(long)]
    input: PathBuf,

    /// Number of locations to pick (overrides config)
    #[arg(long)]
    count: Option<usize>,

    /// Aggregation method: mean, sum or median (overrides config)
    #[arg(long)]
    method: Option<String>,

    /// Outcome field to aggregate (overrides config)
    #[arg(long)]
    target: Option<String>,
}

#[derive(Args, Debug)]
struct AnalyzeArgs {
    #[arg(long)]
    input: PathBuf,

    /// Comma-separated treatment locations
    #[arg(long)]
    treatment: String,

    /// First day of the test window
    #[arg(long)]
    start: String,

    /// Last day of the test window (inclusive)
    #[arg(long)]
    end: String,

    /// Spend withheld or invested during the test
    #[arg(long, default_value_t = 0.0)]
    spend: f64,

    /// Critical |t| for significance (overrides config)
    #[arg(long)]
    critical_value: Option<f64>,

    /// Report zeros instead of failing when a group has no data
    #[arg(long, default_value_t = false)]
    allow_empty_groups: bool,

    /// Include an interpretation and recommendations
    #[arg(long, default_value_t = false)]
    report: bool,
}

#[derive(Args, Debug)]
struct CheckArgs {
    #[arg(long)]
    input: PathBuf,

    /// Comma-separated treatment locations
    #[arg(long)]
    treatment: String,
}

#[derive(Serialize)]
struct AnalyzeOutput<'a> {
    estimate: &'a geolift_core::EffectEstimate,
    #[serde(skip_serializing_if = "Option::is_none")]
    report: Option<AnalysisReport>,
}

fn load_observations(path: &Path) -> anyhow::Result<Vec<Observation>> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("reading observations from {}", path.display()))?;
    let rows: Vec<Observation> = serde_json::from_str(&raw)
        .with_context(|| format!("parsing observations from {}", path.display()))?;
    info!(rows = rows.len(), path = %path.display(), "Observations loaded");
    Ok(rows)
}

fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    let stdout = std::io::stdout();
    serde_json::to_writer_pretty(stdout.lock(), value)?;
    println!();
    Ok(())
}

fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "geolift=info,geolift_measurement=info".into()),
        )
        .with_writer(std::io::stderr)
        .json()
        .init();

    let cli = Cli::parse();

    // Load configuration; a named file must load, env-only falls back to defaults
    let mut config = match cli.config.as_deref() {
        Some(path) => AppConfig::load(Some(path))
            .with_context(|| format!("loading config from {path}"))?,
        None => AppConfig::load(None).unwrap_or_else(|e| {
            warn!(error = %e, "Failed to load config, using defaults");
            AppConfig::default()
        }),
    };

    match cli.command {
        Command::Sample(args) => {
            if let Some(count) = args.count {
                config.sampler.count = count;
            }
            if let Some(method) = args.method {
                config.sampler.method = method.parse::<AggregationMethod>()?;
            }
            if let Some(target) = args.target {
                config.sampler.target = target;
            }
            info!(
                count = config.sampler.count,
                method = %config.sampler.method,
                target = %config.sampler.target,
                "Selecting representative locations"
            );

            let rows = load_observations(&args.input)?;
            let selection = RepresentativeSampler::from_config(&config.sampler).select(&rows)?;
            print_json(&selection)
        }
        Command::Analyze(args) => {
            if let Some(critical_value) = args.critical_value {
                config.analysis.critical_value = critical_value;
            }
            if args.allow_empty_groups {
                config.analysis.empty_group_policy = EmptyGroupPolicy::Zero;
            }

            let rows = load_observations(&args.input)?;
            let partition = Partition::from_list(&args.treatment);
            let window = AnalysisWindow::parse(&args.start, &args.end)?;

            for issue in validate_data_quality(&rows, &partition, &config.quality) {
                warn!(%issue, "Data quality issue");
            }

            let estimate = IncrementalityEstimator::from_config(&config.analysis).analyze(
                &rows,
                &partition,
                &window,
                args.spend,
            )?;
            let report = args
                .report
                .then(|| AnalysisReport::from_estimate(&estimate, &config.quality));
            print_json(&AnalyzeOutput {
                estimate: &estimate,
                report,
            })
        }
        Command::Check(args) => {
            let rows = load_observations(&args.input)?;
            let partition = Partition::from_list(&args.treatment);
            let issues = validate_data_quality(&rows, &partition, &config.quality);
            info!(issues = issues.len(), "Data quality check complete");
            print_json(&issues)
        }
    }
}
