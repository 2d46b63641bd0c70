//! # Broker
//!
//! Periodic metric broker.
//!
//! Responsibilities:
//! - Run one drift-free scheduler per registered task
//! - Fan fired tasks out to concurrent publish workers
//! - Split collected points into batches the sink accepts
//! - On cancellation stop firing, then drain everything already fired

mod broker;
pub mod error;
pub mod metrics;
mod registry;
pub mod reporter;
pub mod scheduler;
pub mod sinks;
pub mod sources;
pub mod worker;

#[cfg(test)]
mod test_support;

pub use broker::{create_broker, Broker, BrokerBuilder, BrokerConfig, BrokerPhase};
pub use contracts::{MetricPoint, MetricSink, MetricSource, OverlapPolicy, SourceRef};
pub use error::BrokerError;
pub use metrics::{BrokerMetrics, MetricsSnapshot};
pub use registry::{Task, TaskRef};
pub use reporter::{ErrorHandler, ErrorReporter};
pub use scheduler::next_fire;
pub use sinks::{create_sink, ConfiguredSink, FileSink, LogSink, NetworkSink};
pub use sources::{create_source, HeartbeatSource, MockSource};
pub use worker::{batches, Batch};
