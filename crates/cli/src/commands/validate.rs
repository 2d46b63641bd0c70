//! `validate` command implementation.

use anyhow::{Context, Result};
use contracts::{BrokerManifest, SinkType, MAX_BATCH_SIZE};
use serde::Serialize;
use tracing::info;

use crate::cli::ValidateArgs;

/// Intervals below this are flagged as likely misconfiguration
const SHORT_INTERVAL_MS: u64 = 100;

/// Validation result for JSON output
#[derive(Serialize)]
struct ValidationResult {
    valid: bool,
    config_path: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    warnings: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    summary: Option<ConfigSummary>,
}

#[derive(Serialize)]
struct ConfigSummary {
    version: String,
    task_count: usize,
    namespace_count: usize,
    sink: String,
    sink_type: String,
    batch_size: usize,
    overlap: String,
}

/// Execute the `validate` command
pub fn run_validate(args: &ValidateArgs) -> Result<()> {
    info!(config = %args.config.display(), "Validating configuration");

    let result = validate_config(args);

    if args.json {
        let json = serde_json::to_string_pretty(&result)
            .context("Failed to serialize validation result")?;
        println!("{}", json);
    } else {
        print_validation_result(&result);
    }

    if result.valid {
        Ok(())
    } else {
        anyhow::bail!("Configuration validation failed")
    }
}

fn validate_config(args: &ValidateArgs) -> ValidationResult {
    let config_path = args.config.display().to_string();

    if !args.config.exists() {
        return ValidationResult {
            valid: false,
            config_path,
            error: Some(format!("File not found: {}", args.config.display())),
            warnings: None,
            summary: None,
        };
    }

    match config_loader::ConfigLoader::load_from_path(&args.config) {
        Ok(manifest) => {
            let warnings = collect_warnings(&manifest);

            ValidationResult {
                valid: true,
                config_path,
                error: None,
                warnings: if warnings.is_empty() {
                    None
                } else {
                    Some(warnings)
                },
                summary: Some(ConfigSummary {
                    version: format!("{:?}", manifest.version),
                    task_count: manifest.tasks.len(),
                    namespace_count: manifest.namespaces().len(),
                    sink: manifest.sink.name.clone(),
                    sink_type: format!("{:?}", manifest.sink.sink_type),
                    batch_size: manifest.broker.batch_size,
                    overlap: format!("{:?}", manifest.broker.overlap),
                }),
            }
        }
        Err(e) => ValidationResult {
            valid: false,
            config_path,
            error: Some(e.to_string()),
            warnings: None,
            summary: None,
        },
    }
}

/// Collect configuration warnings (non-fatal issues)
fn collect_warnings(manifest: &BrokerManifest) -> Vec<String> {
    let mut warnings = Vec::new();

    if manifest.sink.sink_type == SinkType::Log {
        warnings.push("Sink type is 'log' - points are only written to the log".to_string());
    }

    if manifest.broker.batch_size < MAX_BATCH_SIZE {
        warnings.push(format!(
            "broker.batch_size = {} is below the sink limit of {} - more sink calls than needed",
            manifest.broker.batch_size, MAX_BATCH_SIZE
        ));
    }

    if manifest.broker.dispatch_capacity < manifest.tasks.len() {
        warnings.push(format!(
            "broker.dispatch_capacity = {} is smaller than the task count ({}) - schedulers may block",
            manifest.broker.dispatch_capacity,
            manifest.tasks.len()
        ));
    }

    for task in &manifest.tasks {
        if task.interval_ms < SHORT_INTERVAL_MS {
            warnings.push(format!(
                "Task '{}' fires every {}ms - very short interval",
                task.name, task.interval_ms
            ));
        }
        if task.source.params.contains_key("fail_every") {
            warnings.push(format!(
                "Task '{}' has a mock source with injected failures",
                task.name
            ));
        }
    }

    warnings
}

fn print_validation_result(result: &ValidationResult) {
    if result.valid {
        println!("✓ Configuration is valid: {}", result.config_path);

        if let Some(ref summary) = result.summary {
            println!("\n  Version: {}", summary.version);
            println!("  Tasks: {}", summary.task_count);
            println!("  Namespaces: {}", summary.namespace_count);
            println!("  Sink: {} ({})", summary.sink, summary.sink_type);
            println!("  Batch size: {}", summary.batch_size);
            println!("  Overlap: {}", summary.overlap);
        }

        if let Some(ref warnings) = result.warnings {
            println!("\n⚠ Warnings:");
            for warning in warnings {
                println!("  - {}", warning);
            }
        }
    } else {
        println!("✗ Configuration is invalid: {}", result.config_path);
        if let Some(ref error) = result.error {
            println!("\n  Error: {}", error);
        }
    }
}
