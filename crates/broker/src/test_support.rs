//! Shared fixtures for the broker unit tests

use std::collections::HashSet;
use std::sync::Mutex;
use std::time::Duration;

use contracts::{ContractError, MetricPoint, MetricSink};
use tokio_util::sync::CancellationToken;

/// Sink that remembers every call and fails the call numbers it was told to
#[derive(Default)]
pub(crate) struct RecordingSink {
    calls: Mutex<Vec<(String, Vec<MetricPoint>)>>,
    fail_calls: HashSet<usize>,
    delay: Option<Duration>,
}

impl RecordingSink {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn failing_calls(calls: impl IntoIterator<Item = usize>) -> Self {
        Self {
            fail_calls: calls.into_iter().collect(),
            ..Self::default()
        }
    }

    pub(crate) fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub(crate) fn calls(&self) -> Vec<(String, Vec<MetricPoint>)> {
        self.calls.lock().unwrap().clone()
    }

    pub(crate) fn batch_sizes(&self) -> Vec<usize> {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .map(|(_, points)| points.len())
            .collect()
    }
}

impl MetricSink for RecordingSink {
    fn name(&self) -> &str {
        "recording"
    }

    async fn publish(
        &self,
        _cancel: &CancellationToken,
        namespace: &str,
        points: &[MetricPoint],
    ) -> Result<(), ContractError> {
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        let call = {
            let mut calls = self.calls.lock().unwrap();
            calls.push((namespace.to_string(), points.to_vec()));
            calls.len() - 1
        };
        if self.fail_calls.contains(&call) {
            return Err(ContractError::sink_publish("recording", "rejected"));
        }
        Ok(())
    }
}

/// `count` points named `p0..` without timestamps
pub(crate) fn points(count: usize) -> Vec<MetricPoint> {
    (0..count)
        .map(|i| MetricPoint::new(format!("p{i}"), i as f64))
        .collect()
}
