//! Scheduler - one timer loop per task
//!
//! Fires at absolute boundaries `start + k * interval`. Each iteration
//! recomputes the next boundary from the anchor instead of sleeping a fixed
//! amount, so a late wake-up neither accumulates drift nor produces a burst of
//! catch-up fires: missed boundaries are skipped.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::time::{sleep_until, Instant};
use tokio_util::sync::CancellationToken;
use tracing::{debug, instrument, trace};

use crate::metrics::BrokerMetrics;
use crate::registry::TaskRef;

/// Fallback horizon when a deadline would overflow the clock.
const FAR_FUTURE: Duration = Duration::from_secs(86_400 * 365 * 30);

/// First boundary `anchor + k * interval` strictly after `now`, with `k >= 1`.
///
/// `interval` must be non-zero; registration guarantees it.
pub fn next_fire(anchor: Instant, now: Instant, interval: Duration) -> Instant {
    let period = interval.as_nanos().max(1);
    let elapsed = now.saturating_duration_since(anchor).as_nanos();
    let steps = elapsed / period + 1;

    let offset = period.saturating_mul(steps);
    let secs = u64::try_from(offset / 1_000_000_000).unwrap_or(u64::MAX);
    let nanos = (offset % 1_000_000_000) as u32;

    anchor
        .checked_add(Duration::new(secs, nanos))
        .or_else(|| now.checked_add(FAR_FUTURE))
        .unwrap_or(now)
}

/// Timer loop for one task. Returns once `cancel` fires or the dispatch
/// queue is closed.
///
/// A full dispatch queue blocks the send; cancellation stays observable while
/// blocked and no fire is emitted after it.
#[instrument(
    name = "scheduler",
    skip_all,
    fields(task = %task.name(), interval_ms = task.interval().as_millis() as u64)
)]
pub(crate) async fn run_scheduler(
    task: TaskRef,
    fire_tx: mpsc::Sender<TaskRef>,
    cancel: CancellationToken,
    metrics: Arc<BrokerMetrics>,
) {
    let interval = task.interval();
    let mut anchor = Instant::now();
    debug!("Scheduler started");

    loop {
        let deadline = next_fire(anchor, Instant::now(), interval);

        tokio::select! {
            biased;
            _ = cancel.cancelled() => break,
            _ = sleep_until(deadline) => {}
        }
        anchor = deadline;

        tokio::select! {
            biased;
            _ = cancel.cancelled() => break,
            sent = fire_tx.send(Arc::clone(&task)) => {
                if sent.is_err() {
                    debug!("Dispatch queue closed");
                    break;
                }
                metrics.inc_fires();
                observability::record_task_fired(task.name());
                trace!("Fired");
            }
        }
    }

    debug!("Scheduler stopped");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::Task;
    use contracts::{FnSource, MetricPoint};

    const T: Duration = Duration::from_millis(100);

    fn task(interval: Duration) -> TaskRef {
        let source = FnSource::arc(|_cancel| async { Ok(Vec::<MetricPoint>::new()) });
        Arc::new(Task::new("sched", "ns", interval, source))
    }

    #[test]
    fn test_next_fire_at_anchor() {
        let anchor = Instant::now();
        assert_eq!(next_fire(anchor, anchor, T), anchor + T);
    }

    #[test]
    fn test_next_fire_skips_missed_boundaries() {
        let anchor = Instant::now();
        let now = anchor + T * 5 / 2;
        assert_eq!(next_fire(anchor, now, T), anchor + T * 3);
    }

    #[test]
    fn test_next_fire_on_exact_boundary_moves_forward() {
        let anchor = Instant::now();
        assert_eq!(next_fire(anchor, anchor + T * 3, T), anchor + T * 4);
    }

    #[test]
    fn test_next_fire_now_before_anchor() {
        let anchor = Instant::now() + T;
        let now = anchor - Duration::from_millis(30);
        assert_eq!(next_fire(anchor, now, T), anchor + T);
    }

    #[tokio::test(start_paused = true)]
    async fn test_fires_on_aligned_boundaries() {
        let (tx, mut rx) = mpsc::channel(16);
        let cancel = CancellationToken::new();
        let metrics = Arc::new(BrokerMetrics::new());
        let start = Instant::now();

        let handle = tokio::spawn(run_scheduler(
            task(T),
            tx,
            cancel.clone(),
            Arc::clone(&metrics),
        ));

        let mut previous = start;
        for k in 1..=5u32 {
            rx.recv().await.unwrap();
            let at = Instant::now();
            assert!(at >= previous + T);
            assert!(at - start >= T * k);
            assert!(at - start <= T * k + Duration::from_millis(1));
            previous = at;
        }

        cancel.cancel();
        handle.await.unwrap();
        assert_eq!(metrics.fires(), 5);
    }

    #[tokio::test(start_paused = true)]
    async fn test_slow_consumer_gets_next_boundary_not_backlog() {
        let (tx, mut rx) = mpsc::channel(1);
        let cancel = CancellationToken::new();
        let metrics = Arc::new(BrokerMetrics::new());
        let start = Instant::now();

        let handle = tokio::spawn(run_scheduler(
            task(T),
            tx,
            cancel.clone(),
            Arc::clone(&metrics),
        ));

        // Fire at 1T fills the queue, fire at 2T blocks until a slot frees
        tokio::time::sleep(T * 7 / 2).await;

        rx.recv().await.unwrap();
        rx.recv().await.unwrap();
        assert!(Instant::now() - start < T * 4);

        // 3T was missed while blocked; the next fire is the 4T boundary
        rx.recv().await.unwrap();
        let at = Instant::now() - start;
        assert!(at >= T * 4);
        assert!(at <= T * 4 + Duration::from_millis(5));
        assert_eq!(metrics.fires(), 3);

        cancel.cancel();
        handle.await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_while_blocked_on_full_queue() {
        let (tx, mut rx) = mpsc::channel(1);
        let cancel = CancellationToken::new();
        let metrics = Arc::new(BrokerMetrics::new());

        let handle = tokio::spawn(run_scheduler(
            task(T),
            tx,
            cancel.clone(),
            Arc::clone(&metrics),
        ));

        tokio::time::sleep(T * 5 / 2).await;
        cancel.cancel();
        handle.await.unwrap();

        assert_eq!(metrics.fires(), 1);
        assert!(rx.recv().await.is_some());
        assert!(rx.recv().await.is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_before_first_fire_emits_nothing() {
        let (tx, mut rx) = mpsc::channel(4);
        let cancel = CancellationToken::new();
        let metrics = Arc::new(BrokerMetrics::new());

        cancel.cancel();
        run_scheduler(task(T), tx, cancel, Arc::clone(&metrics)).await;

        assert_eq!(metrics.fires(), 0);
        assert!(rx.recv().await.is_none());
    }
}
