//! Broker - registration intake, dispatch loop and graceful drain

use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;
use std::time::Duration;

use contracts::{BrokerSettings, MetricSink, OverlapPolicy, SourceRef, MAX_BATCH_SIZE};
use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, instrument};

use crate::error::BrokerError;
use crate::metrics::BrokerMetrics;
use crate::registry::{Registry, TaskRef};
use crate::reporter::{ErrorHandler, ErrorReporter};
use crate::scheduler::run_scheduler;
use crate::worker::{publish_firing, WorkerContext};

/// Broker configuration
#[derive(Debug, Clone)]
pub struct BrokerConfig {
    /// Registrations buffered before the run loop picks them up
    pub intake_capacity: usize,
    /// Fire events buffered between schedulers and the run loop
    pub dispatch_capacity: usize,
    /// Points per sink call, never above `MAX_BATCH_SIZE`
    pub batch_size: usize,
    pub overlap: OverlapPolicy,
}

impl Default for BrokerConfig {
    fn default() -> Self {
        BrokerSettings::default().into()
    }
}

impl From<BrokerSettings> for BrokerConfig {
    fn from(settings: BrokerSettings) -> Self {
        Self {
            intake_capacity: settings.intake_capacity,
            dispatch_capacity: settings.dispatch_capacity,
            batch_size: settings.batch_size,
            overlap: settings.overlap,
        }
    }
}

/// Lifecycle phase of the run loop
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum BrokerPhase {
    /// Built; registrations are buffered until `run`
    Accepting = 0,
    /// Starting schedulers and dispatching fires
    Running = 1,
    /// Sealed; waiting for schedulers to exit
    Cancelling = 2,
    /// Dispatch queue closed; finishing buffered and in-flight firings
    Draining = 3,
    /// Every worker has finished
    Terminated = 4,
}

impl BrokerPhase {
    fn from_u8(value: u8) -> Self {
        match value {
            0 => Self::Accepting,
            1 => Self::Running,
            2 => Self::Cancelling,
            3 => Self::Draining,
            _ => Self::Terminated,
        }
    }
}

impl std::fmt::Display for BrokerPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Accepting => "accepting",
            Self::Running => "running",
            Self::Cancelling => "cancelling",
            Self::Draining => "draining",
            Self::Terminated => "terminated",
        };
        f.write_str(name)
    }
}

/// Builder for creating a Broker
pub struct BrokerBuilder<S> {
    sink: S,
    config: BrokerConfig,
    handler: Option<Arc<dyn ErrorHandler>>,
}

impl<S> BrokerBuilder<S>
where
    S: MetricSink + Sync + 'static,
{
    /// Create a new BrokerBuilder
    pub fn new(sink: S) -> Self {
        Self {
            sink,
            config: BrokerConfig::default(),
            handler: None,
        }
    }

    pub fn config(mut self, config: BrokerConfig) -> Self {
        self.config = config;
        self
    }

    /// Route asynchronous failures to `handler` instead of the log
    pub fn error_handler(mut self, handler: impl ErrorHandler) -> Self {
        self.handler = Some(Arc::new(handler));
        self
    }

    pub fn build(self) -> Broker<S> {
        let config = self.config;
        let (fire_tx, fire_rx) = mpsc::channel(config.dispatch_capacity.max(1));

        Broker {
            sink: Arc::new(self.sink),
            registry: Registry::new(config.intake_capacity),
            reporter: ErrorReporter::new(self.handler),
            metrics: Arc::new(BrokerMetrics::new()),
            fire_tx,
            fire_rx: Mutex::new(Some(fire_rx)),
            phase: AtomicU8::new(BrokerPhase::Accepting as u8),
            batch_limit: config.batch_size.clamp(1, MAX_BATCH_SIZE),
            overlap: config.overlap,
        }
    }
}

/// Periodic metric broker
///
/// Owns the registration intake, the dispatch queue and the `sealed` state.
/// Share it as `Arc<Broker<S>>` between the task that calls [`Broker::run`]
/// and the callers of [`Broker::register`].
pub struct Broker<S> {
    sink: Arc<S>,
    registry: Registry,
    reporter: ErrorReporter,
    metrics: Arc<BrokerMetrics>,
    fire_tx: mpsc::Sender<TaskRef>,
    fire_rx: Mutex<Option<mpsc::Receiver<TaskRef>>>,
    phase: AtomicU8,
    batch_limit: usize,
    overlap: OverlapPolicy,
}

impl<S> Broker<S>
where
    S: MetricSink + Sync + 'static,
{
    pub fn builder(sink: S) -> BrokerBuilder<S> {
        BrokerBuilder::new(sink)
    }

    pub fn sink(&self) -> &Arc<S> {
        &self.sink
    }

    pub fn metrics(&self) -> &Arc<BrokerMetrics> {
        &self.metrics
    }

    pub fn phase(&self) -> BrokerPhase {
        BrokerPhase::from_u8(self.phase.load(Ordering::SeqCst))
    }

    /// True once no further registrations are accepted
    pub fn is_sealed(&self) -> bool {
        self.registry.is_sealed()
    }

    /// Register a periodic task.
    ///
    /// The scheduler starts once the run loop picks the task up. Waits while
    /// the intake is full. Once `run` has started, cancellation releases a
    /// waiting call with `RegistrationClosed`. Before `run` there is no signal
    /// to observe: registering more than `intake_capacity` tasks up front
    /// blocks until `run` begins draining the intake.
    ///
    /// # Errors
    /// `InvalidInterval` for a zero interval, `RegistrationClosed` once the
    /// broker is sealed.
    pub async fn register(
        &self,
        name: impl Into<String>,
        namespace: impl Into<String>,
        interval: Duration,
        source: SourceRef,
    ) -> Result<(), BrokerError> {
        let name = name.into();
        self.registry
            .register(name.clone(), namespace.into(), interval, source)
            .await?;
        observability::record_task_registered(&name);
        Ok(())
    }

    /// Run until `cancel` fires, then drain.
    ///
    /// Returns only after every scheduler has exited and every firing that
    /// reached the dispatch queue has been attempted exactly once.
    ///
    /// # Errors
    /// `AlreadyRunning` if called a second time.
    #[instrument(name = "broker_run", skip_all)]
    pub async fn run(&self, cancel: CancellationToken) -> Result<(), BrokerError> {
        let (mut intake, mut fires) = match (
            self.registry.take_intake().await,
            self.fire_rx.lock().await.take(),
        ) {
            (Some(intake), Some(fires)) => (intake, fires),
            _ => return Err(BrokerError::AlreadyRunning),
        };

        self.registry.bind(&cancel);
        self.enter(BrokerPhase::Running);

        let ctx = WorkerContext {
            sink: Arc::clone(&self.sink),
            reporter: self.reporter.clone(),
            metrics: Arc::clone(&self.metrics),
            batch_limit: self.batch_limit,
            overlap: self.overlap,
        };
        let mut schedulers = JoinSet::new();
        let mut workers = JoinSet::new();

        loop {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => break,
                Some(task) = intake.recv() => {
                    info!(task = %task.name(), namespace = %task.namespace(), "Starting scheduler");
                    schedulers.spawn(run_scheduler(
                        task,
                        self.fire_tx.clone(),
                        cancel.clone(),
                        Arc::clone(&self.metrics),
                    ));
                }
                Some(task) = fires.recv() => {
                    workers.spawn(publish_firing(ctx.clone(), task, cancel.clone()));
                    self.track_workers(&workers, fires.len());
                }
                Some(joined) = workers.join_next(), if !workers.is_empty() => {
                    log_join("worker", joined);
                    self.track_workers(&workers, fires.len());
                }
            }
        }

        self.enter(BrokerPhase::Cancelling);
        self.registry.seal();
        intake.close();
        while let Ok(task) = intake.try_recv() {
            debug!(task = %task.name(), "Discarding registration received during shutdown");
        }
        while let Some(joined) = schedulers.join_next().await {
            log_join("scheduler", joined);
        }

        self.enter(BrokerPhase::Draining);
        fires.close();
        let mut drained = 0usize;
        while let Some(task) = fires.recv().await {
            drained += 1;
            workers.spawn(publish_firing(ctx.clone(), task, cancel.clone()));
        }
        debug!(buffered = drained, in_flight = workers.len(), "Draining firings");
        self.metrics.set_workers_in_flight(workers.len());
        while let Some(joined) = workers.join_next().await {
            log_join("worker", joined);
            self.metrics.set_workers_in_flight(workers.len());
        }

        self.enter(BrokerPhase::Terminated);
        Ok(())
    }

    fn enter(&self, phase: BrokerPhase) {
        self.phase.store(phase as u8, Ordering::SeqCst);
        info!(%phase, "Broker phase changed");
    }

    fn track_workers(&self, workers: &JoinSet<()>, queue_depth: usize) {
        self.metrics.set_workers_in_flight(workers.len());
        observability::record_workers_in_flight(workers.len());
        observability::record_dispatch_queue_depth(queue_depth);
    }
}

fn log_join(kind: &str, joined: Result<(), tokio::task::JoinError>) {
    if let Err(e) = joined {
        if e.is_panic() {
            error!(kind, error = %e, "Broker task panicked");
        }
    }
}

/// Convenience function to create a broker with default configuration
pub fn create_broker<S>(sink: S) -> Broker<S>
where
    S: MetricSink + Sync + 'static,
{
    BrokerBuilder::new(sink).build()
}
