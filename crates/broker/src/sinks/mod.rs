//! Sink implementations
//!
//! Contains LogSink, FileSink, and NetworkSink, plus [`ConfiguredSink`] for
//! picking one of them from a [`SinkConfig`] at runtime.

mod file;
mod log;
mod network;

pub use self::file::{FileSink, FileSinkConfig};
pub use self::log::LogSink;
pub use self::network::{NetworkFormat, NetworkSink, NetworkSinkConfig};

use contracts::{ContractError, MetricPoint, MetricSink, SinkConfig, SinkType};
use tokio_util::sync::CancellationToken;
use tracing::instrument;

use crate::error::BrokerError;

/// Sink selected from configuration
pub enum ConfiguredSink {
    Log(LogSink),
    File(FileSink),
    Network(NetworkSink),
}

impl MetricSink for ConfiguredSink {
    fn name(&self) -> &str {
        match self {
            Self::Log(sink) => sink.name(),
            Self::File(sink) => sink.name(),
            Self::Network(sink) => sink.name(),
        }
    }

    async fn publish(
        &self,
        cancel: &CancellationToken,
        namespace: &str,
        points: &[MetricPoint],
    ) -> Result<(), ContractError> {
        match self {
            Self::Log(sink) => sink.publish(cancel, namespace, points).await,
            Self::File(sink) => sink.publish(cancel, namespace, points).await,
            Self::Network(sink) => sink.publish(cancel, namespace, points).await,
        }
    }
}

/// Create a sink from configuration
#[instrument(
    name = "broker_create_sink",
    skip(config),
    fields(sink = %config.name, sink_type = ?config.sink_type)
)]
pub async fn create_sink(config: &SinkConfig) -> Result<ConfiguredSink, BrokerError> {
    match config.sink_type {
        SinkType::Log => Ok(ConfiguredSink::Log(LogSink::new(&config.name))),
        SinkType::File => FileSink::from_params(&config.name, &config.params)
            .map(ConfiguredSink::File)
            .map_err(|e| BrokerError::sink_creation(&config.name, e.to_string())),
        SinkType::Network => NetworkSink::from_params(&config.name, &config.params)
            .await
            .map(ConfiguredSink::Network)
            .map_err(|e| BrokerError::sink_creation(&config.name, e.to_string())),
    }
}
