//! # Metric Broker CLI
//!
//! Command-line entry point.
//!
//! Provides:
//! - Manifest loading and validation
//! - Broker runtime with signal-driven graceful drain
//! - Run summary

mod cli;
mod commands;
mod error;
mod runner;

use anyhow::Result;
use clap::Parser;
use tracing::info;

use cli::{Cli, Commands};
use commands::{run_broker, run_info, run_validate};

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    init_logging(&cli)?;

    info!(version = env!("CARGO_PKG_VERSION"), "Metric broker CLI starting");

    let result = match &cli.command {
        Commands::Run(args) => run_broker(args).await,
        Commands::Validate(args) => run_validate(args),
        Commands::Info(args) => run_info(args),
    };

    if let Err(ref e) = result {
        tracing::error!(error = %e, "Command failed");
    }

    result
}

/// Initialize logging based on CLI options
fn init_logging(cli: &Cli) -> Result<()> {
    observability::init_logging(observability::LogConfig {
        format: cli.log_format.into(),
        verbosity: observability::Verbosity::from_flags(cli.verbose, cli.quiet),
    })
}
