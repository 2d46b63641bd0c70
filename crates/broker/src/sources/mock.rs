//! Mock metric source
//!
//! Produces synthetic random-walk series for running the broker without a
//! real backend.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use contracts::{unit, ContractError, MetricPoint, MetricSource};
use rand::Rng;
use tokio_util::sync::CancellationToken;
use tracing::trace;

/// Largest accepted random-walk step
pub const MAX_STEP: f64 = 1e12;

/// Mock source configuration
#[derive(Debug, Clone, PartialEq)]
pub struct MockSourceConfig {
    /// Metric name shared by every series
    pub metric: String,
    pub unit: String,
    /// Points per collection, one per series
    pub points: usize,
    /// Starting value of every series
    pub base_value: f64,
    /// Maximum step of the random walk per collection, at most `MAX_STEP`
    pub step: f64,
    /// Attached to every point
    pub dimensions: HashMap<String, String>,
    /// Fail every N-th collection (1 = always)
    pub fail_every: Option<u64>,
}

impl Default for MockSourceConfig {
    fn default() -> Self {
        Self {
            metric: "mock_value".to_string(),
            unit: unit::NONE.to_string(),
            points: 1,
            base_value: 50.0,
            step: 1.0,
            dimensions: HashMap::new(),
            fail_every: None,
        }
    }
}

impl MockSourceConfig {
    /// Create config from params map
    ///
    /// Keys: `metric`, `unit`, `points`, `base_value`, `step`, `fail_every`,
    /// and `dim.<key>` for dimensions.
    pub fn from_params(params: &HashMap<String, String>) -> Result<Self, String> {
        let mut config = Self::default();

        if let Some(metric) = params.get("metric") {
            config.metric = metric.clone();
        }
        if let Some(unit) = params.get("unit") {
            config.unit = unit.clone();
        }
        if let Some(points) = params.get("points") {
            config.points = parse_param("points", points)?;
        }
        if let Some(base) = params.get("base_value") {
            config.base_value = parse_param("base_value", base)?;
        }
        if let Some(step) = params.get("step") {
            let parsed = parse_param::<f64>("step", step)?.abs();
            if !parsed.is_finite() || parsed > MAX_STEP {
                return Err(format!(
                    "invalid 'step' value '{}': must be finite and at most {}",
                    step, MAX_STEP
                ));
            }
            config.step = parsed;
        }
        if let Some(every) = params.get("fail_every") {
            let every: u64 = parse_param("fail_every", every)?;
            config.fail_every = (every > 0).then_some(every);
        }

        config.dimensions = params
            .iter()
            .filter_map(|(k, v)| k.strip_prefix("dim.").map(|k| (k.to_string(), v.clone())))
            .collect();

        Ok(config)
    }
}

fn parse_param<T: std::str::FromStr>(key: &str, value: &str) -> Result<T, String>
where
    T::Err: std::fmt::Display,
{
    value
        .parse()
        .map_err(|e| format!("invalid '{}' value '{}': {}", key, value, e))
}

/// Mock metric source
pub struct MockSource {
    config: MockSourceConfig,
    collections: AtomicU64,
    series: Mutex<Vec<f64>>,
}

impl MockSource {
    pub fn new(config: MockSourceConfig) -> Self {
        let series = vec![config.base_value; config.points];
        Self {
            config,
            collections: AtomicU64::new(0),
            series: Mutex::new(series),
        }
    }

    /// Number of `collect` calls so far
    pub fn collections(&self) -> u64 {
        self.collections.load(Ordering::Relaxed)
    }

    fn advance(&self) -> Result<Vec<f64>, ContractError> {
        let mut series = self
            .series
            .lock()
            .map_err(|_| ContractError::collect("mock series state poisoned"))?;

        // NaN fails the comparison and skips the walk
        let step = self.config.step.abs().min(MAX_STEP);
        if step > 0.0 {
            let mut rng = rand::rng();
            for value in series.iter_mut() {
                *value += rng.random_range(-step..=step);
            }
        }
        Ok(series.clone())
    }
}

#[async_trait]
impl MetricSource for MockSource {
    async fn collect(&self, _cancel: &CancellationToken) -> Result<Vec<MetricPoint>, ContractError> {
        let n = self.collections.fetch_add(1, Ordering::Relaxed) + 1;
        if let Some(every) = self.config.fail_every {
            if n % every == 0 {
                return Err(ContractError::collect(format!(
                    "mock failure on collection {}",
                    n
                )));
            }
        }

        let values = self.advance()?;
        trace!(metric = %self.config.metric, points = values.len(), "Mock collection");

        Ok(values
            .into_iter()
            .enumerate()
            .map(|(i, value)| {
                let mut point = MetricPoint::new(&self.config.metric, value)
                    .with_unit(&self.config.unit)
                    .with_dimension("series", i.to_string());
                for (k, v) in &self.config.dimensions {
                    point = point.with_dimension(k, v);
                }
                point
            })
            .collect())
    }
}
