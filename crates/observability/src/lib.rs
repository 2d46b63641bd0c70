//! # Observability
//!
//! Logging and Prometheus export for the metric broker.
//!
//! - `init_logging` installs one `tracing` subscriber. Broker crates log at the
//!   requested verbosity while dependencies stay at `warn`; `RUST_LOG`
//!   overrides both.
//! - `install_prometheus` exposes the `record_*` events on `/metrics`.
//!
//! ```ignore
//! observability::init_logging(LogConfig {
//!     format: LogFormat::Compact,
//!     verbosity: Verbosity::from_flags(1, false),
//! })?;
//! observability::install_prometheus(9898)?;
//! ```

pub mod metrics;

use anyhow::{Context, Result};
use metrics_exporter_prometheus::{Matcher, PrometheusBuilder};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

pub use crate::metrics::{
    record_batch_published, record_collection, record_dispatch_queue_depth, record_error_reported,
    record_firing_coalesced, record_task_fired, record_task_registered, record_workers_in_flight,
};

/// Crates whose events follow the CLI verbosity
const BROKER_TARGETS: &[&str] = &["metric_broker", "broker", "config_loader", "contracts"];

/// Histogram buckets for collection and sink-call latency, in milliseconds
pub const LATENCY_BUCKETS_MS: &[f64] = &[
    1.0, 5.0, 10.0, 25.0, 50.0, 100.0, 250.0, 500.0, 1000.0, 2500.0, 5000.0,
];

/// Log line format
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LogFormat {
    /// Structured JSON, one object per event
    #[default]
    Json,
    Pretty,
    Compact,
}

/// How much the broker crates log
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Verbosity {
    Quiet,
    #[default]
    Normal,
    Debug,
    Trace,
}

impl Verbosity {
    /// Map `-q` / repeated `-v` flags; quiet wins.
    pub fn from_flags(verbose: u8, quiet: bool) -> Self {
        match (quiet, verbose) {
            (true, _) => Self::Quiet,
            (false, 0) => Self::Normal,
            (false, 1) => Self::Debug,
            (false, _) => Self::Trace,
        }
    }

    fn level(self) -> &'static str {
        match self {
            Self::Quiet => "warn",
            Self::Normal => "info",
            Self::Debug => "debug",
            Self::Trace => "trace",
        }
    }

    /// `EnvFilter` directives used when `RUST_LOG` is unset
    pub fn directives(self) -> String {
        let level = self.level();
        BROKER_TARGETS
            .iter()
            .fold(String::from("warn"), |mut acc, target| {
                acc.push_str(&format!(",{target}={level}"));
                acc
            })
    }
}

/// Logging setup chosen on the command line
#[derive(Debug, Clone, Copy, Default)]
pub struct LogConfig {
    pub format: LogFormat,
    pub verbosity: Verbosity,
}

/// Install the global tracing subscriber.
///
/// # Errors
/// Fails if a global subscriber is already set.
pub fn init_logging(config: LogConfig) -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.verbosity.directives()));

    let fmt_layer = match config.format {
        LogFormat::Json => fmt::layer()
            .json()
            .with_target(true)
            .with_current_span(true)
            .with_span_list(false)
            .boxed(),
        LogFormat::Pretty => fmt::layer().pretty().boxed(),
        LogFormat::Compact => fmt::layer().compact().with_target(false).boxed(),
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt_layer)
        .try_init()
        .context("Failed to initialize tracing subscriber")?;

    tracing::debug!(format = ?config.format, verbosity = ?config.verbosity, "Logging initialized");
    Ok(())
}

/// Install the Prometheus recorder with an HTTP listener on `port`.
///
/// Every series carries `service="metric-broker"`; latency histograms use
/// `LATENCY_BUCKETS_MS`.
pub fn install_prometheus(port: u16) -> Result<()> {
    PrometheusBuilder::new()
        .with_http_listener(([0, 0, 0, 0], port))
        .add_global_label("service", "metric-broker")
        .set_buckets_for_metric(Matcher::Suffix("_latency_ms".to_string()), LATENCY_BUCKETS_MS)
        .context("Invalid latency buckets")?
        .install()
        .context("Failed to install Prometheus recorder")?;

    tracing::info!(port, "Prometheus metrics endpoint listening");
    Ok(())
}
