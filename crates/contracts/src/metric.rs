//! MetricPoint - the unit of data produced by sources and shipped by sinks

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Hard per-call limit of the metrics ingestion endpoint.
pub const MAX_BATCH_SIZE: usize = 20;

/// Common unit names understood by the ingestion endpoint.
pub mod unit {
    pub const NONE: &str = "None";
    pub const COUNT: &str = "Count";
    pub const SECONDS: &str = "Seconds";
    pub const MILLISECONDS: &str = "Milliseconds";
    pub const BYTES: &str = "Bytes";
    pub const PERCENT: &str = "Percent";
}

/// A single measured value.
///
/// Immutable once handed over by a source. A point without a timestamp is
/// stamped with the collection time of the firing that produced it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricPoint {
    /// Metric name
    pub name: String,

    /// Measured value
    pub value: f64,

    /// Unit name (see [`unit`])
    #[serde(default = "default_unit")]
    pub unit: String,

    /// Observation time; `None` means "collection time"
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<DateTime<Utc>>,

    /// Unordered dimension key/value pairs
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub dimensions: HashMap<String, String>,
}

fn default_unit() -> String {
    unit::NONE.to_string()
}

impl MetricPoint {
    /// Create a point with no unit, timestamp or dimensions
    pub fn new(name: impl Into<String>, value: f64) -> Self {
        Self {
            name: name.into(),
            value,
            unit: default_unit(),
            timestamp: None,
            dimensions: HashMap::new(),
        }
    }

    pub fn with_unit(mut self, unit: impl Into<String>) -> Self {
        self.unit = unit.into();
        self
    }

    pub fn with_timestamp(mut self, timestamp: DateTime<Utc>) -> Self {
        self.timestamp = Some(timestamp);
        self
    }

    pub fn with_dimension(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.dimensions.insert(key.into(), value.into());
        self
    }

    /// Fill in the timestamp if the source left it unset
    pub fn stamp_if_missing(&mut self, now: DateTime<Utc>) {
        if self.timestamp.is_none() {
            self.timestamp = Some(now);
        }
    }
}
