//! Publish worker - one per firing
//!
//! Collects from the fired task's source, stamps defaulted timestamps, splits
//! the points into ordered batches no larger than the sink limit and submits
//! them one after another. Failures are reported and never retried.

use std::sync::Arc;
use std::time::Instant;

use chrono::{DateTime, Utc};
use contracts::{MetricPoint, MetricSink, OverlapPolicy, MAX_BATCH_SIZE};
use tokio_util::sync::CancellationToken;
use tracing::{debug, instrument};

use crate::error::BrokerError;
use crate::metrics::BrokerMetrics;
use crate::registry::TaskRef;
use crate::reporter::ErrorReporter;

/// One sink call worth of points.
///
/// Borrowed from the firing's collected points; lives only for the call.
#[derive(Debug, Clone, Copy)]
pub struct Batch<'a> {
    pub namespace: &'a str,
    /// Position of the batch within its firing
    pub index: usize,
    pub points: &'a [MetricPoint],
}

/// Split `points` into ordered, contiguous batches of at most `limit` points.
///
/// `limit` is clamped to `1..=MAX_BATCH_SIZE`. Concatenating the batches
/// yields `points` unchanged; an empty input yields no batches.
pub fn batches<'a>(
    namespace: &'a str,
    points: &'a [MetricPoint],
    limit: usize,
) -> impl Iterator<Item = Batch<'a>> + 'a {
    points
        .chunks(limit.clamp(1, MAX_BATCH_SIZE))
        .enumerate()
        .map(move |(index, points)| Batch {
            namespace,
            index,
            points,
        })
}

/// Give every point without a timestamp the same collection time.
pub fn stamp_timestamps(points: &mut [MetricPoint], now: DateTime<Utc>) {
    for point in points {
        point.stamp_if_missing(now);
    }
}

/// Everything a worker needs besides the task itself
pub(crate) struct WorkerContext<S> {
    pub(crate) sink: Arc<S>,
    pub(crate) reporter: ErrorReporter,
    pub(crate) metrics: Arc<BrokerMetrics>,
    pub(crate) batch_limit: usize,
    pub(crate) overlap: OverlapPolicy,
}

impl<S> Clone for WorkerContext<S> {
    fn clone(&self) -> Self {
        Self {
            sink: Arc::clone(&self.sink),
            reporter: self.reporter.clone(),
            metrics: Arc::clone(&self.metrics),
            batch_limit: self.batch_limit,
            overlap: self.overlap,
        }
    }
}

/// Run one firing of `task` to completion.
#[instrument(
    name = "publish_firing",
    skip_all,
    fields(task = %task.name(), namespace = %task.namespace())
)]
pub(crate) async fn publish_firing<S>(ctx: WorkerContext<S>, task: TaskRef, cancel: CancellationToken)
where
    S: MetricSink + Sync + 'static,
{
    let _single_flight = match ctx.overlap {
        OverlapPolicy::Concurrent => None,
        OverlapPolicy::Serialize => match task.admit().await {
            Some(guard) => Some(guard),
            None => {
                ctx.metrics.inc_firings_coalesced();
                observability::record_firing_coalesced(task.name());
                debug!("Firing coalesced into the one already waiting");
                return;
            }
        },
    };
    ctx.metrics.inc_firings();

    let started = Instant::now();
    let collected = task.source().collect(&cancel).await;
    observability::record_collection(
        task.name(),
        collected.is_ok(),
        started.elapsed().as_secs_f64() * 1000.0,
    );

    let mut points = match collected {
        Ok(points) => points,
        Err(source) => {
            ctx.metrics.inc_collection_failures();
            ctx.reporter.report(BrokerError::Collection {
                task: task.name().to_string(),
                namespace: task.namespace().to_string(),
                source,
            });
            return;
        }
    };

    stamp_timestamps(&mut points, Utc::now());

    for batch in batches(task.namespace(), &points, ctx.batch_limit) {
        let started = Instant::now();
        let result = ctx.sink.publish(&cancel, batch.namespace, batch.points).await;
        let latency_ms = started.elapsed().as_secs_f64() * 1000.0;
        observability::record_batch_published(
            batch.namespace,
            batch.points.len(),
            result.is_ok(),
            latency_ms,
        );

        match result {
            Ok(()) => {
                ctx.metrics.record_batch(batch.points.len());
                debug!(batch = batch.index, points = batch.points.len(), "Batch published");
            }
            Err(source) => {
                ctx.metrics.inc_publish_failures();
                ctx.reporter.report(BrokerError::Publish {
                    task: task.name().to_string(),
                    namespace: batch.namespace.to_string(),
                    batch: batch.index,
                    points: batch.points.len(),
                    source,
                });
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::Task;
    use crate::test_support::{points, RecordingSink};
    use contracts::{ContractError, FnSource};
    use std::sync::Mutex;
    use std::time::Duration;

    fn context(sink: Arc<RecordingSink>, reporter: ErrorReporter) -> WorkerContext<RecordingSink> {
        WorkerContext {
            sink,
            reporter,
            metrics: Arc::new(BrokerMetrics::new()),
            batch_limit: MAX_BATCH_SIZE,
            overlap: OverlapPolicy::Concurrent,
        }
    }

    fn capture() -> (ErrorReporter, Arc<Mutex<Vec<String>>>) {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        let reporter = ErrorReporter::new(Some(Arc::new(move |e: &BrokerError| {
            sink.lock().unwrap().push(e.kind().to_string());
        })));
        (reporter, seen)
    }

    fn task_with(count: usize) -> TaskRef {
        let source = FnSource::arc(move |_cancel| async move { Ok(points(count)) });
        Arc::new(Task::new("t", "App/Test", Duration::from_secs(1), source))
    }

    #[test]
    fn test_batches_partition_in_order() {
        let input = points(45);
        let parts: Vec<_> = batches("ns", &input, MAX_BATCH_SIZE).collect();

        assert_eq!(parts.len(), 3);
        assert_eq!(
            parts.iter().map(|b| b.points.len()).collect::<Vec<_>>(),
            vec![20, 20, 5]
        );
        assert!(parts.iter().enumerate().all(|(i, b)| b.index == i && b.namespace == "ns"));

        let joined: Vec<MetricPoint> = parts.iter().flat_map(|b| b.points.to_vec()).collect();
        assert_eq!(joined, input);
    }

    #[test]
    fn test_batch_counts_match_ceiling() {
        for n in [0usize, 1, 19, 20, 21, 40, 41, 100] {
            let input = points(n);
            let parts: Vec<_> = batches("ns", &input, MAX_BATCH_SIZE).collect();
            assert_eq!(parts.len(), n.div_ceil(MAX_BATCH_SIZE), "n = {n}");
            assert!(parts.iter().all(|b| !b.points.is_empty() && b.points.len() <= 20));
        }
    }

    #[test]
    fn test_batch_limit_is_clamped() {
        let input = points(50);
        assert_eq!(batches("ns", &input, 100).count(), 3);
        assert_eq!(batches("ns", &input, 0).count(), 50);
        assert_eq!(batches("ns", &input, 10).count(), 5);
    }

    #[test]
    fn test_stamp_keeps_explicit_timestamps() {
        let explicit = Utc::now() - chrono::Duration::hours(1);
        let now = Utc::now();
        let mut input = vec![
            MetricPoint::new("a", 1.0),
            MetricPoint::new("b", 2.0).with_timestamp(explicit),
        ];

        stamp_timestamps(&mut input, now);

        assert_eq!(input[0].timestamp, Some(now));
        assert_eq!(input[1].timestamp, Some(explicit));
    }

    #[tokio::test]
    async fn test_firing_publishes_all_batches_with_shared_timestamp() {
        let sink = Arc::new(RecordingSink::new());
        let ctx = context(Arc::clone(&sink), ErrorReporter::default());
        let metrics = Arc::clone(&ctx.metrics);

        publish_firing(ctx, task_with(45), CancellationToken::new()).await;

        let calls = sink.calls();
        assert_eq!(sink.batch_sizes(), vec![20, 20, 5]);
        assert!(calls.iter().all(|(ns, _)| ns == "App/Test"));

        let stamps: Vec<_> = calls
            .iter()
            .flat_map(|(_, pts)| pts.iter().map(|p| p.timestamp))
            .collect();
        assert!(stamps[0].is_some());
        assert!(stamps.iter().all(|t| *t == stamps[0]));

        let names: Vec<_> = calls
            .iter()
            .flat_map(|(_, pts)| pts.iter().map(|p| p.name.clone()))
            .collect();
        assert_eq!(names, (0..45).map(|i| format!("p{i}")).collect::<Vec<_>>());

        assert_eq!(metrics.batches_published(), 3);
        assert_eq!(metrics.points_published(), 45);
        assert_eq!(metrics.firings(), 1);
    }

    #[tokio::test]
    async fn test_failed_batch_does_not_stop_siblings() {
        let sink = Arc::new(RecordingSink::failing_calls([1]));
        let (reporter, seen) = capture();
        let ctx = context(Arc::clone(&sink), reporter);
        let metrics = Arc::clone(&ctx.metrics);

        publish_firing(ctx, task_with(45), CancellationToken::new()).await;

        assert_eq!(sink.batch_sizes(), vec![20, 20, 5]);
        assert_eq!(*seen.lock().unwrap(), vec!["publish"]);
        assert_eq!(metrics.batches_published(), 2);
        assert_eq!(metrics.publish_failures(), 1);
        assert_eq!(metrics.points_published(), 25);
    }

    #[tokio::test]
    async fn test_collection_failure_skips_publish() {
        let sink = Arc::new(RecordingSink::new());
        let (reporter, seen) = capture();
        let ctx = context(Arc::clone(&sink), reporter);
        let metrics = Arc::clone(&ctx.metrics);

        let source = FnSource::arc(|_cancel| async { Err(ContractError::collect("backend down")) });
        let task = Arc::new(Task::new("broken", "ns", Duration::from_secs(1), source));

        publish_firing(ctx, task, CancellationToken::new()).await;

        assert!(sink.calls().is_empty());
        assert_eq!(*seen.lock().unwrap(), vec!["collection"]);
        assert_eq!(metrics.collection_failures(), 1);
    }

    #[tokio::test]
    async fn test_empty_collection_makes_no_sink_call() {
        let sink = Arc::new(RecordingSink::new());
        let ctx = context(Arc::clone(&sink), ErrorReporter::default());

        publish_firing(ctx, task_with(0), CancellationToken::new()).await;

        assert!(sink.calls().is_empty());
    }

    #[tokio::test]
    async fn test_lower_batch_limit_respected() {
        let sink = Arc::new(RecordingSink::new());
        let mut ctx = context(Arc::clone(&sink), ErrorReporter::default());
        ctx.batch_limit = 8;

        publish_firing(ctx, task_with(20), CancellationToken::new()).await;

        assert_eq!(sink.batch_sizes(), vec![8, 8, 4]);
    }
}
