//! # Task registry
//!
//! Admits new periodic tasks until the broker is sealed. Accepted tasks are
//! buffered in a bounded intake queue; the run loop pulls them out and starts
//! one scheduler per task.
//!
//! ## Rules
//! - A task is immutable after registration
//! - Once sealed, `register` fails with `RegistrationClosed` and creates nothing
//! - A full intake applies backpressure to `register`

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, OnceLock};
use std::time::Duration;

use contracts::SourceRef;
use tokio::sync::{mpsc, Mutex, MutexGuard};
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::error::BrokerError;

/// Shared handle to a registered task.
pub type TaskRef = Arc<Task>;

/// A named binding of one source to a namespace and firing interval.
pub struct Task {
    name: String,
    namespace: String,
    interval: Duration,
    source: SourceRef,
    /// Held for the whole firing under `OverlapPolicy::Serialize`
    publish_guard: Mutex<()>,
    /// A firing is already waiting for `publish_guard`
    pending: AtomicBool,
}

impl Task {
    pub(crate) fn new(
        name: impl Into<String>,
        namespace: impl Into<String>,
        interval: Duration,
        source: SourceRef,
    ) -> Self {
        Self {
            name: name.into(),
            namespace: namespace.into(),
            interval,
            source,
            publish_guard: Mutex::new(()),
            pending: AtomicBool::new(false),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    pub fn source(&self) -> &SourceRef {
        &self.source
    }

    /// Single-flight admission for serialized firings.
    ///
    /// Runs immediately when idle. While a firing is in flight, one more may
    /// wait its turn; any further firing is coalesced into that waiting one
    /// and gets `None`.
    pub(crate) async fn admit(&self) -> Option<MutexGuard<'_, ()>> {
        if let Ok(guard) = self.publish_guard.try_lock() {
            return Some(guard);
        }
        if self.pending.swap(true, Ordering::AcqRel) {
            return None;
        }
        let guard = self.publish_guard.lock().await;
        self.pending.store(false, Ordering::Release);
        Some(guard)
    }
}

impl std::fmt::Debug for Task {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Task")
            .field("name", &self.name)
            .field("namespace", &self.namespace)
            .field("interval", &self.interval)
            .finish_non_exhaustive()
    }
}

/// Registration intake plus the `sealed` flag.
pub(crate) struct Registry {
    intake_tx: mpsc::Sender<TaskRef>,
    intake_rx: Mutex<Option<mpsc::Receiver<TaskRef>>>,
    sealed: AtomicBool,
    /// Cancellation signal of the running broker, bound by `run`
    cancel: OnceLock<CancellationToken>,
}

impl Registry {
    pub(crate) fn new(capacity: usize) -> Self {
        let (intake_tx, intake_rx) = mpsc::channel(capacity.max(1));
        Self {
            intake_tx,
            intake_rx: Mutex::new(Some(intake_rx)),
            sealed: AtomicBool::new(false),
            cancel: OnceLock::new(),
        }
    }

    /// Validate and enqueue a task for scheduler startup.
    pub(crate) async fn register(
        &self,
        name: String,
        namespace: String,
        interval: Duration,
        source: SourceRef,
    ) -> Result<(), BrokerError> {
        if interval.is_zero() {
            return Err(BrokerError::InvalidInterval { task: name });
        }
        if self.is_sealed() {
            return Err(BrokerError::RegistrationClosed { task: name });
        }

        let task = Arc::new(Task::new(name, namespace, interval, source));
        debug!(task = %task.name(), namespace = %task.namespace(), ?interval, "Registering task");

        let closed = || BrokerError::RegistrationClosed {
            task: task.name().to_string(),
        };

        let sent = match self.cancel.get() {
            Some(cancel) => tokio::select! {
                biased;
                _ = cancel.cancelled() => return Err(closed()),
                sent = self.intake_tx.send(Arc::clone(&task)) => sent,
            },
            None => self.intake_tx.send(Arc::clone(&task)).await,
        };
        sent.map_err(|_| closed())
    }

    /// True once the broker stopped accepting tasks.
    pub(crate) fn is_sealed(&self) -> bool {
        self.sealed.load(Ordering::SeqCst)
            || self.cancel.get().is_some_and(CancellationToken::is_cancelled)
    }

    pub(crate) fn seal(&self) {
        self.sealed.store(true, Ordering::SeqCst);
    }

    /// Remember the run's cancellation signal so registrations racing with
    /// shutdown are refused even before the run loop observes it.
    pub(crate) fn bind(&self, cancel: &CancellationToken) {
        let _ = self.cancel.set(cancel.clone());
    }

    /// Hand the intake receiver to the run loop; `None` after the first call.
    pub(crate) async fn take_intake(&self) -> Option<mpsc::Receiver<TaskRef>> {
        self.intake_rx.lock().await.take()
    }
}
