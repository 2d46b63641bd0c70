//! Runner - builds the broker from a manifest and drives its lifecycle.

use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};

use broker::{create_sink, create_source, Broker, BrokerConfig, ConfiguredSink, MetricSink};
use contracts::BrokerManifest;
use tokio_util::sync::CancellationToken;
use tracing::{info, instrument, warn};

use super::RunStats;
use crate::error::{CliError, Result};

/// Runner configuration
#[derive(Debug, Clone)]
pub struct RunnerConfig {
    /// Validated manifest
    pub manifest: BrokerManifest,

    /// Stop after this long (None = until shutdown)
    pub timeout: Option<Duration>,

    /// Metrics server port (None = disabled)
    pub metrics_port: Option<u16>,
}

/// Owns one broker run
pub struct Runner {
    config: RunnerConfig,
}

impl Runner {
    pub fn new(config: RunnerConfig) -> Self {
        Self { config }
    }

    /// Run until `shutdown` resolves or the timeout elapses, then drain.
    #[instrument(name = "runner_run", skip_all)]
    pub async fn run(self, shutdown: impl Future<Output = ()>) -> Result<RunStats> {
        let start_time = Instant::now();
        let manifest = self.config.manifest;

        if let Some(port) = self.config.metrics_port {
            observability::install_prometheus(port)?;
        }

        let sink = create_sink(&manifest.sink).await.map_err(CliError::Setup)?;
        let sink_name = sink.name().to_string();
        let broker: Arc<Broker<ConfiguredSink>> = Arc::new(
            Broker::builder(sink)
                .config(BrokerConfig::from(manifest.broker.clone()))
                .build(),
        );

        let cancel = CancellationToken::new();
        let run_handle = {
            let broker = Arc::clone(&broker);
            let cancel = cancel.clone();
            tokio::spawn(async move { broker.run(cancel).await })
        };

        let registered = register_tasks(&broker, &manifest).await;
        let outcome = match registered {
            Ok(()) => {
                info!(
                    tasks = manifest.tasks.len(),
                    sink = %sink_name,
                    "Broker running"
                );
                wait_for_stop(shutdown, self.config.timeout).await;
                Ok(())
            }
            Err(e) => Err(e),
        };

        info!("Stopping broker, draining in-flight firings");
        cancel.cancel();
        run_handle
            .await
            .map_err(|e| CliError::execution(e.to_string()))?
            .map_err(|e| CliError::execution(e.to_string()))?;
        outcome?;

        Ok(RunStats {
            duration: start_time.elapsed(),
            tasks: manifest.tasks.len(),
            namespaces: manifest.namespaces().len(),
            sink: sink_name,
            metrics: broker.metrics().snapshot(),
        })
    }
}

async fn register_tasks<S>(broker: &Broker<S>, manifest: &BrokerManifest) -> Result<()>
where
    S: MetricSink + Sync + 'static,
{
    for task in &manifest.tasks {
        let source = create_source(&task.source, &task.name).map_err(CliError::Setup)?;
        broker
            .register(&task.name, &task.namespace, task.interval(), source)
            .await
            .map_err(|e| CliError::registration(&task.name, e))?;
        info!(
            task = %task.name,
            namespace = %task.namespace,
            interval_ms = task.interval_ms,
            "Task registered"
        );
    }
    Ok(())
}

async fn wait_for_stop(shutdown: impl Future<Output = ()>, timeout: Option<Duration>) {
    let deadline = async {
        match timeout {
            Some(timeout) => tokio::time::sleep(timeout).await,
            None => std::future::pending::<()>().await,
        }
    };

    tokio::select! {
        _ = shutdown => {
            warn!("Received shutdown signal");
        }
        _ = deadline => {
            info!(timeout_secs = timeout.map(|t| t.as_secs()), "Run timeout reached");
        }
    }
}
