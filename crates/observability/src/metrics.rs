//! Broker event metrics
//!
//! Thin wrappers over the `metrics` facade. Without an installed recorder
//! every call is a no-op.

use metrics::{counter, gauge, histogram};

/// Record a task admitted by the registry
pub fn record_task_registered(task: &str) {
    counter!(
        "metric_broker_tasks_registered_total",
        "task" => task.to_string()
    )
    .increment(1);
}

/// Record a fire event pushed onto the dispatch queue
pub fn record_task_fired(task: &str) {
    counter!("metric_broker_fires_total", "task" => task.to_string()).increment(1);
}

/// Record a serialized firing dropped because one was already waiting
pub fn record_firing_coalesced(task: &str) {
    counter!(
        "metric_broker_firings_coalesced_total",
        "task" => task.to_string()
    )
    .increment(1);
}

/// Record one collection call and how long it took
pub fn record_collection(task: &str, success: bool, latency_ms: f64) {
    let status = if success { "success" } else { "failure" };
    counter!(
        "metric_broker_collections_total",
        "task" => task.to_string(),
        "status" => status
    )
    .increment(1);
    histogram!(
        "metric_broker_collection_latency_ms",
        "task" => task.to_string()
    )
    .record(latency_ms);
}

/// Record one sink call
pub fn record_batch_published(namespace: &str, points: usize, success: bool, latency_ms: f64) {
    let status = if success { "success" } else { "failure" };
    counter!(
        "metric_broker_batches_total",
        "namespace" => namespace.to_string(),
        "status" => status
    )
    .increment(1);

    if success {
        counter!(
            "metric_broker_points_published_total",
            "namespace" => namespace.to_string()
        )
        .increment(points as u64);
    }

    histogram!("metric_broker_publish_latency_ms").record(latency_ms);
}

/// Record an asynchronous failure handed to the error reporter
pub fn record_error_reported(kind: &'static str) {
    counter!("metric_broker_errors_total", "kind" => kind).increment(1);
}

/// Fire events waiting for a worker
pub fn record_dispatch_queue_depth(depth: usize) {
    gauge!("metric_broker_dispatch_queue_depth").set(depth as f64);
}

/// Publish workers currently running
pub fn record_workers_in_flight(count: usize) {
    gauge!("metric_broker_workers_in_flight").set(count as f64);
}
