//! netsift detector binary entry point.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use tracing_subscriber::EnvFilter;

use netsift_core::DetectorConfig;
use netsift_detector::Daemon;

/// Network-telemetry IOC enrichment stage.
#[derive(Parser, Debug)]
#[command(name = "netsift", version, about)]
struct Args {
    /// Path to configuration file.
    #[arg(short, long, default_value = "netsift.toml")]
    config: PathBuf,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let env_filter =
        EnvFilter::try_from_env("NETSIFT_LOG").unwrap_or_else(|_| EnvFilter::from_default_env());
    tracing_subscriber::fmt().with_env_filter(env_filter).init();

    let config = DetectorConfig::load(&args.config).context("loading configuration")?;
    tracing::info!(
        config = %args.config.display(),
        indicators = %config.indicator_file.display(),
        "netsift detector starting"
    );

    Daemon::new(config).run().await
}
