//! LogSink - logs batch summary via tracing

use contracts::{ContractError, MetricPoint, MetricSink};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument};

/// Sink that logs batch summaries for debugging
pub struct LogSink {
    name: String,
}

impl LogSink {
    /// Create a new LogSink with the given name
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }

    fn log_batch_summary(&self, namespace: &str, points: &[MetricPoint]) {
        let first = points.first().map(|p| p.name.as_str()).unwrap_or("");
        let sum: f64 = points.iter().map(|p| p.value).sum();

        info!(
            sink = %self.name,
            namespace,
            points = points.len(),
            first_metric = first,
            value_sum = sum,
            "Metric batch received"
        );

        for point in points {
            debug!(
                sink = %self.name,
                metric = %point.name,
                value = point.value,
                unit = %point.unit,
                "Metric point"
            );
        }
    }
}

impl MetricSink for LogSink {
    fn name(&self) -> &str {
        &self.name
    }

    #[instrument(
        name = "log_sink_publish",
        skip(self, _cancel, points),
        fields(sink = %self.name, points = points.len())
    )]
    async fn publish(
        &self,
        _cancel: &CancellationToken,
        namespace: &str,
        points: &[MetricPoint],
    ) -> Result<(), ContractError> {
        self.log_batch_summary(namespace, points);
        Ok(())
    }
}
