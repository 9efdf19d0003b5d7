use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

use nets_wrangle::{wrangle_nets, WrangleConfig, Year};

/// Turn raw NETS extracts into the classified pedestrian-injury dataset
#[derive(Debug, Parser)]
#[command(name = "nets-wrangle", version)]
struct Cli {
    /// Project directory holding config/ and data/
    #[arg(long, default_value = ".")]
    project_dir: PathBuf,

    /// Data directory (defaults to <project-dir>/data)
    #[arg(long)]
    data_dir: Option<PathBuf>,

    /// Category rule document (defaults to <project-dir>/config/category_config.json)
    #[arg(long)]
    config: Option<PathBuf>,

    #[arg(long)]
    address_file: Option<PathBuf>,

    #[arg(long)]
    sic_file: Option<PathBuf>,

    /// Output directory (defaults to <data-dir>/processed)
    #[arg(long)]
    output_dir: Option<PathBuf>,

    /// Comma-separated year labels
    #[arg(long, default_value = "13,14")]
    years: String,

    /// Debug logging
    #[arg(short, long)]
    verbose: bool,
}

fn init_logging(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };

    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .or_else(|_| EnvFilter::try_new(default_level))
                .unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_writer(std::io::stderr)
        .try_init();
}

fn build_config(cli: Cli) -> Result<WrangleConfig> {
    let mut config = WrangleConfig::for_project(&cli.project_dir)
        .with_years(Year::parse_list(&cli.years)?)?;

    if let Some(data_dir) = &cli.data_dir {
        config = config.with_data_dir(data_dir);
    }
    if let Some(path) = cli.config {
        config.category_config = path;
    }
    if let Some(path) = cli.address_file {
        config.address_file = path;
    }
    if let Some(path) = cli.sic_file {
        config.sic_file = path;
    }
    if let Some(path) = cli.output_dir {
        config.output_dir = path;
    }

    Ok(config)
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let config = build_config(cli)?;
    let summary = wrangle_nets(&config)?;

    println!("✓ {}", summary.summary());
    for fault in summary.report.faults.iter().take(20) {
        eprintln!("  ⚠️  {}", fault.describe());
    }
    if summary.report.faults.len() > 20 {
        eprintln!("  … {} more faults", summary.report.faults.len() - 20);
    }

    Ok(())
}
