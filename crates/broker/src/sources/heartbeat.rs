//! Heartbeat source - a single `up = 1` point per firing

use std::collections::HashMap;

use async_trait::async_trait;
use contracts::{unit, ContractError, MetricPoint, MetricSource};
use tokio_util::sync::CancellationToken;

pub struct HeartbeatSource {
    metric: String,
    dimensions: HashMap<String, String>,
}

impl HeartbeatSource {
    pub fn new(metric: impl Into<String>) -> Self {
        Self {
            metric: metric.into(),
            dimensions: HashMap::new(),
        }
    }

    /// Reads `metric` (default `up`) and `dim.<key>` params
    pub fn from_params(params: &HashMap<String, String>) -> Self {
        let metric = params.get("metric").map(String::as_str).unwrap_or("up");
        let mut source = Self::new(metric);
        source.dimensions = params
            .iter()
            .filter_map(|(k, v)| k.strip_prefix("dim.").map(|k| (k.to_string(), v.clone())))
            .collect();
        source
    }
}

#[async_trait]
impl MetricSource for HeartbeatSource {
    async fn collect(&self, _cancel: &CancellationToken) -> Result<Vec<MetricPoint>, ContractError> {
        let mut point = MetricPoint::new(&self.metric, 1.0).with_unit(unit::COUNT);
        for (k, v) in &self.dimensions {
            point = point.with_dimension(k, v);
        }
        Ok(vec![point])
    }
}
