//! BrokerManifest - Config Loader output
//!
//! Describes a complete broker deployment: queue tuning, the sink, and the
//! periodic tasks with their sources.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::Duration;

use crate::MAX_BATCH_SIZE;

/// Config version
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ConfigVersion {
    #[default]
    V1,
}

/// Complete broker manifest
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BrokerManifest {
    /// Config version
    #[serde(default)]
    pub version: ConfigVersion,

    /// Broker tuning
    #[serde(default)]
    pub broker: BrokerSettings,

    /// Output sink
    pub sink: SinkConfig,

    /// Periodic collection tasks
    pub tasks: Vec<TaskConfig>,
}

/// Queue and batching settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BrokerSettings {
    /// Registration intake capacity
    #[serde(default = "default_queue_capacity")]
    pub intake_capacity: usize,

    /// Dispatch queue capacity (fired tasks awaiting a worker)
    #[serde(default = "default_queue_capacity")]
    pub dispatch_capacity: usize,

    /// Points per sink call, at most [`MAX_BATCH_SIZE`]
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,

    /// What to do when a task fires while its previous firing still publishes
    #[serde(default)]
    pub overlap: OverlapPolicy,
}

impl Default for BrokerSettings {
    fn default() -> Self {
        Self {
            intake_capacity: default_queue_capacity(),
            dispatch_capacity: default_queue_capacity(),
            batch_size: default_batch_size(),
            overlap: OverlapPolicy::default(),
        }
    }
}

fn default_queue_capacity() -> usize {
    100
}

fn default_batch_size() -> usize {
    MAX_BATCH_SIZE
}

/// Same-task overlap policy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OverlapPolicy {
    /// Firings of one task may publish concurrently
    #[default]
    Concurrent,
    /// A firing waits for the previous firing of the same task to finish
    Serialize,
}

/// Periodic task definition
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskConfig {
    /// Unique task name
    pub name: String,

    /// Namespace attached to every batch
    pub namespace: String,

    /// Firing interval in milliseconds, must be > 0
    pub interval_ms: u64,

    /// Metric source
    pub source: SourceConfig,
}

impl TaskConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms)
    }
}

/// Source definition
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceConfig {
    /// Source type
    pub source_type: SourceType,

    /// Type-specific parameters
    #[serde(default)]
    pub params: HashMap<String, String>,
}

/// Source type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceType {
    /// Synthetic points
    Mock,
    /// Single `up = 1` point
    Heartbeat,
}

/// Sink output configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SinkConfig {
    /// Sink name
    pub name: String,

    /// Sink type
    pub sink_type: SinkType,

    /// Type-specific parameters
    #[serde(default)]
    pub params: HashMap<String, String>,
}

/// Sink type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SinkType {
    /// Log output
    Log,
    /// JSON lines on disk
    File,
    /// UDP datagrams
    Network,
}

impl BrokerManifest {
    /// Distinct namespaces, in task order
    pub fn namespaces(&self) -> Vec<&str> {
        let mut seen = Vec::new();
        for task in &self.tasks {
            if !seen.contains(&task.namespace.as_str()) {
                seen.push(task.namespace.as_str());
            }
        }
        seen
    }
}
