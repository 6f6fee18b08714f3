//! salesfeat CLI binary.
//!
//! Loads the four input tables, computes the feature table and WMAPE ranking,
//! and writes `features.csv` and `mapes.csv`.

use clap::{Parser, ValueEnum};
use indicatif::{ProgressBar, ProgressStyle};
use salesfeat::data::{InputPaths, KeyPolicy, load_tables};
use salesfeat::features::DateRange;
use salesfeat::{PipelineConfig, run as run_pipeline, write_outputs};
use std::fs;
use std::path::{Path, PathBuf};
use std::process;
use std::time::Duration;
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::filter::LevelFilter;

#[derive(Parser)]
#[command(name = "salesfeat")]
#[command(about = "Rolling sales features and WMAPE ranking", long_about = None)]
#[command(version)]
struct Cli {
    /// First date of the exported feature rows [default: 2021-01-08]
    #[arg(long)]
    min_date: Option<String>,

    /// Last date of the exported feature rows [default: 2021-05-30]
    #[arg(long)]
    max_date: Option<String>,

    /// Number of highest-WMAPE groups to export [default: 5]
    #[arg(long)]
    top: Option<usize>,

    /// Directory holding brand.csv, product.csv, store.csv and sales.csv
    #[arg(long, default_value = "./q5-dataeng-forecasting-features/input_data/data")]
    data_dir: PathBuf,

    /// Directory receiving features.csv and mapes.csv
    #[arg(long, default_value = ".")]
    output_dir: PathBuf,

    /// Fail when a brand name, product id or store id is repeated
    #[arg(long)]
    strict_keys: bool,

    /// Pipeline configuration as JSON; explicit flags take precedence
    #[arg(long)]
    config: Option<PathBuf>,

    /// Format of the run summary printed to stdout
    #[arg(long, value_enum, default_value_t = SummaryFormat::Text)]
    summary_format: SummaryFormat,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum SummaryFormat {
    Text,
    Json,
}

fn main() {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            EnvFilter::builder()
                .with_default_directive(LevelFilter::WARN.into())
                .from_env_lossy(),
        )
        .init();

    if let Err(e) = run() {
        eprintln!("Error: {}", e);
        process::exit(1);
    }
}

fn run() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let config = resolve_config(&cli)?;
    debug!(?config, "resolved pipeline configuration");

    let pb = ProgressBar::new_spinner();
    pb.set_style(ProgressStyle::default_spinner().template("{spinner:.green} {msg}")?);
    pb.enable_steady_tick(Duration::from_millis(100));

    pb.set_message(format!("Loading tables from {}...", cli.data_dir.display()));
    let tables = load_tables(&InputPaths::from_dir(&cli.data_dir))?;

    pb.set_message("Computing features...");
    let output = run_pipeline(&tables, &config)?;

    pb.set_message("Writing results...");
    let paths = write_outputs(&output, &cli.output_dir)?;
    pb.finish_and_clear();

    info!(features = %paths.features.display(), mapes = %paths.mapes.display(), "done");

    let summary = output.summary(&config)?;
    match cli.summary_format {
        SummaryFormat::Text => {
            println!("{}", summary);
            println!("Features written to: {}", paths.features.display());
            println!("WMAPE written to:    {}", paths.mapes.display());
        }
        SummaryFormat::Json => println!("{}", summary.to_json()?),
    }

    Ok(())
}

/// Start from the config file (or defaults) and apply explicit flags.
fn resolve_config(cli: &Cli) -> Result<PipelineConfig, Box<dyn std::error::Error>> {
    let mut config = match &cli.config {
        Some(path) => read_config(path)?,
        None => PipelineConfig::default(),
    };

    if cli.min_date.is_some() || cli.max_date.is_some() {
        let min = cli
            .min_date
            .clone()
            .unwrap_or_else(|| config.date_range.min().to_string());
        let max = cli
            .max_date
            .clone()
            .unwrap_or_else(|| config.date_range.max().to_string());
        config.date_range = DateRange::parse(&min, &max)?;
    }

    if let Some(top) = cli.top {
        config.top = top;
    }
    if cli.strict_keys {
        config.key_policy = KeyPolicy::Strict;
    }

    Ok(config)
}

fn read_config(path: &Path) -> Result<PipelineConfig, Box<dyn std::error::Error>> {
    let text = fs::read_to_string(path)
        .map_err(|e| format!("cannot read config {}: {}", path.display(), e))?;
    Ok(serde_json::from_str(&text)?)
}
