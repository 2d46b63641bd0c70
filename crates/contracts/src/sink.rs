//! MetricSink trait - broker output interface
//!
//! Defines the abstract interface for Sinks.

use tokio_util::sync::CancellationToken;

use crate::{ContractError, MetricPoint};

/// Metrics ingestion endpoint
///
/// All sink implementations must implement this trait. A single sink is shared
/// by every publish worker, so `publish` takes `&self` and may run concurrently.
#[trait_variant::make(MetricSink: Send)]
pub trait LocalMetricSink {
    /// Sink name (used for logging/metrics)
    fn name(&self) -> &str;

    /// Publish one batch of points under `namespace`
    ///
    /// `points.len()` never exceeds [`crate::MAX_BATCH_SIZE`]. During shutdown
    /// `cancel` may already be cancelled; implementations decide whether to
    /// still ship the batch or fail it.
    ///
    /// # Errors
    /// Returns publish error (should include context)
    async fn publish(
        &self,
        cancel: &CancellationToken,
        namespace: &str,
        points: &[MetricPoint],
    ) -> Result<(), ContractError>;
}
