//! CLI argument definitions using clap.

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// Metric Broker - periodic metric collection and batched publishing
#[derive(Parser, Debug)]
#[command(
    name = "metric-broker",
    author,
    version,
    about = "Periodic metric collection and batched publishing",
    long_about = "Schedules periodic metric collection from configured sources, splits the\n\
                  collected points into batches of at most 20 and publishes them to the\n\
                  configured sink. On SIGINT/SIGTERM it stops firing and drains every\n\
                  firing that was already triggered before exiting."
)]
pub struct Cli {
    /// Increase logging verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true, env = "METRIC_BROKER_VERBOSE")]
    pub verbose: u8,

    /// Suppress all output except warnings and errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Log output format
    #[arg(
        long,
        value_enum,
        default_value = "pretty",
        global = true,
        env = "METRIC_BROKER_LOG_FORMAT"
    )]
    pub log_format: LogFormat,

    #[command(subcommand)]
    pub command: Commands,
}

/// Available CLI commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the broker until interrupted or timed out
    Run(RunArgs),

    /// Validate configuration file without running
    Validate(ValidateArgs),

    /// Display configuration information
    Info(InfoArgs),
}

/// Arguments for the `run` command
#[derive(Parser, Debug, Clone)]
pub struct RunArgs {
    /// Path to configuration file (TOML or JSON)
    #[arg(
        short,
        long,
        default_value = "broker.toml",
        env = "METRIC_BROKER_CONFIG"
    )]
    pub config: PathBuf,

    /// Stop after this many seconds (0 = run until signalled)
    #[arg(long, default_value = "0", env = "METRIC_BROKER_TIMEOUT")]
    pub timeout: u64,

    /// Metrics server port (0 = disabled)
    #[arg(long, default_value = "0", env = "METRIC_BROKER_METRICS_PORT")]
    pub metrics_port: u16,

    /// Override `broker.dispatch_capacity` from configuration
    #[arg(long, env = "METRIC_BROKER_DISPATCH_CAPACITY")]
    pub dispatch_capacity: Option<usize>,

    /// Validate configuration and exit without running the broker
    #[arg(long)]
    pub dry_run: bool,
}

/// Arguments for the `validate` command
#[derive(Parser, Debug)]
pub struct ValidateArgs {
    /// Path to configuration file to validate
    #[arg(short, long, default_value = "broker.toml")]
    pub config: PathBuf,

    /// Output validation result as JSON
    #[arg(long)]
    pub json: bool,
}

/// Arguments for the `info` command
#[derive(Parser, Debug)]
pub struct InfoArgs {
    /// Path to configuration file
    #[arg(short, long, default_value = "broker.toml")]
    pub config: PathBuf,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,

    /// Show per-task source details
    #[arg(long)]
    pub tasks: bool,
}

/// Log output format
#[derive(ValueEnum, Clone, Copy, Debug, Default)]
pub enum LogFormat {
    /// JSON structured logging
    Json,
    /// Human-readable pretty format
    #[default]
    Pretty,
    /// Compact single-line format
    Compact,
}

impl From<LogFormat> for observability::LogFormat {
    fn from(format: LogFormat) -> Self {
        match format {
            LogFormat::Json => Self::Json,
            LogFormat::Pretty => Self::Pretty,
            LogFormat::Compact => Self::Compact,
        }
    }
}
