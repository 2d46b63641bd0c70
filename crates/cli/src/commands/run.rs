//! `run` command implementation.

use anyhow::{Context, Result};
use std::time::Duration;
use tracing::{info, warn};

use crate::cli::RunArgs;
use crate::error::CliError;
use crate::runner::{Runner, RunnerConfig};

/// Execute the `run` command
pub async fn run_broker(args: &RunArgs) -> Result<()> {
    info!(config = %args.config.display(), "Loading configuration");

    if !args.config.exists() {
        return Err(CliError::config_not_found(args.config.display().to_string()).into());
    }

    let mut manifest = config_loader::ConfigLoader::load_from_path(&args.config)
        .with_context(|| format!("Failed to load config from {}", args.config.display()))?;

    // Apply CLI overrides
    if let Some(capacity) = args.dispatch_capacity {
        if capacity == 0 {
            anyhow::bail!("--dispatch-capacity must be > 0");
        }
        info!(capacity, "Overriding dispatch capacity from CLI");
        manifest.broker.dispatch_capacity = capacity;
    }

    info!(
        tasks = manifest.tasks.len(),
        sink = %manifest.sink.name,
        batch_size = manifest.broker.batch_size,
        overlap = ?manifest.broker.overlap,
        "Configuration loaded"
    );

    if args.dry_run {
        info!("Dry run mode - configuration is valid, exiting");
        print_config_summary(&manifest);
        return Ok(());
    }

    let runner = Runner::new(RunnerConfig {
        manifest,
        timeout: (args.timeout > 0).then(|| Duration::from_secs(args.timeout)),
        metrics_port: (args.metrics_port > 0).then_some(args.metrics_port),
    });

    info!("Starting broker...");
    let stats = runner
        .run(shutdown_signal())
        .await
        .context("Broker execution failed")?;

    info!(
        firings = stats.metrics.firings,
        batches = stats.metrics.batches_published,
        points = stats.metrics.points_published,
        duration_secs = stats.duration.as_secs_f64(),
        "Broker drained and stopped"
    );
    stats.print_summary();

    Ok(())
}

/// Resolve on Ctrl+C or SIGTERM
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}

/// Print configuration summary for dry-run mode
fn print_config_summary(manifest: &contracts::BrokerManifest) {
    println!("\n=== Configuration Summary ===\n");
    println!("Broker:");
    println!("  Batch size: {}", manifest.broker.batch_size);
    println!("  Overlap: {:?}", manifest.broker.overlap);
    println!(
        "  Queues: intake {} / dispatch {}",
        manifest.broker.intake_capacity, manifest.broker.dispatch_capacity
    );
    println!(
        "\nSink: {} ({:?})",
        manifest.sink.name, manifest.sink.sink_type
    );
    println!("\nTasks ({}):", manifest.tasks.len());
    for task in &manifest.tasks {
        println!(
            "  - {} -> {} every {}ms ({:?})",
            task.name, task.namespace, task.interval_ms, task.source.source_type
        );
    }
    println!();
}
