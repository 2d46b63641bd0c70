//! Manifest validation
//!
//! Rules:
//! - at least one task
//! - task names unique and non-empty
//! - namespaces non-empty
//! - interval_ms > 0
//! - 1 <= batch_size <= MAX_BATCH_SIZE
//! - queue capacities > 0
//! - sink name non-empty

use std::collections::HashSet;

use contracts::{BrokerManifest, ContractError, MAX_BATCH_SIZE};

/// Validate a BrokerManifest
///
/// Returns the first error encountered, or Ok(()).
pub fn validate(manifest: &BrokerManifest) -> Result<(), ContractError> {
    validate_broker_settings(manifest)?;
    validate_sink(manifest)?;
    validate_task_names(manifest)?;
    validate_task_fields(manifest)?;
    Ok(())
}

fn validate_broker_settings(manifest: &BrokerManifest) -> Result<(), ContractError> {
    let settings = &manifest.broker;

    if settings.batch_size == 0 || settings.batch_size > MAX_BATCH_SIZE {
        return Err(ContractError::config_validation(
            "broker.batch_size",
            format!(
                "batch_size must be within 1..={MAX_BATCH_SIZE}, got {}",
                settings.batch_size
            ),
        ));
    }
    if settings.intake_capacity == 0 {
        return Err(ContractError::config_validation(
            "broker.intake_capacity",
            "intake_capacity must be > 0",
        ));
    }
    if settings.dispatch_capacity == 0 {
        return Err(ContractError::config_validation(
            "broker.dispatch_capacity",
            "dispatch_capacity must be > 0",
        ));
    }
    Ok(())
}

fn validate_sink(manifest: &BrokerManifest) -> Result<(), ContractError> {
    if manifest.sink.name.is_empty() {
        return Err(ContractError::config_validation(
            "sink.name",
            "sink name cannot be empty",
        ));
    }
    Ok(())
}

/// Task names must be unique (global)
fn validate_task_names(manifest: &BrokerManifest) -> Result<(), ContractError> {
    if manifest.tasks.is_empty() {
        return Err(ContractError::config_validation(
            "tasks",
            "at least one task is required",
        ));
    }

    let mut seen = HashSet::new();
    for (idx, task) in manifest.tasks.iter().enumerate() {
        if task.name.is_empty() {
            return Err(ContractError::config_validation(
                format!("tasks[{idx}].name"),
                "task name cannot be empty",
            ));
        }
        if !seen.insert(&task.name) {
            return Err(ContractError::config_validation(
                format!("tasks[name={}]", task.name),
                "duplicate task name",
            ));
        }
    }
    Ok(())
}

fn validate_task_fields(manifest: &BrokerManifest) -> Result<(), ContractError> {
    for task in &manifest.tasks {
        if task.namespace.is_empty() {
            return Err(ContractError::config_validation(
                format!("tasks[{}].namespace", task.name),
                "namespace cannot be empty",
            ));
        }
        if task.interval_ms == 0 {
            return Err(ContractError::config_validation(
                format!("tasks[{}].interval_ms", task.name),
                "interval_ms must be > 0",
            ));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use contracts::{
        BrokerSettings, ConfigVersion, SinkConfig, SinkType, SourceConfig, SourceType, TaskConfig,
    };

    fn minimal_manifest() -> BrokerManifest {
        BrokerManifest {
            version: ConfigVersion::V1,
            broker: BrokerSettings::default(),
            sink: SinkConfig {
                name: "log".into(),
                sink_type: SinkType::Log,
                params: Default::default(),
            },
            tasks: vec![TaskConfig {
                name: "api".into(),
                namespace: "App/Api".into(),
                interval_ms: 1000,
                source: SourceConfig {
                    source_type: SourceType::Mock,
                    params: Default::default(),
                },
            }],
        }
    }

    #[test]
    fn test_valid_config() {
        let manifest = minimal_manifest();
        assert!(validate(&manifest).is_ok());
    }

    #[test]
    fn test_duplicate_task_name() {
        let mut manifest = minimal_manifest();
        manifest.tasks.push(manifest.tasks[0].clone());
        let err = validate(&manifest).unwrap_err().to_string();
        assert!(err.contains("duplicate task name"), "got: {err}");
    }

    #[test]
    fn test_no_tasks() {
        let mut manifest = minimal_manifest();
        manifest.tasks.clear();
        let err = validate(&manifest).unwrap_err().to_string();
        assert!(err.contains("at least one task"), "got: {err}");
    }

    #[test]
    fn test_zero_interval() {
        let mut manifest = minimal_manifest();
        manifest.tasks[0].interval_ms = 0;
        let err = validate(&manifest).unwrap_err().to_string();
        assert!(err.contains("interval_ms must be > 0"), "got: {err}");
    }

    #[test]
    fn test_empty_namespace() {
        let mut manifest = minimal_manifest();
        manifest.tasks[0].namespace = String::new();
        let err = validate(&manifest).unwrap_err().to_string();
        assert!(err.contains("namespace cannot be empty"), "got: {err}");
    }

    #[test]
    fn test_batch_size_above_sink_limit() {
        let mut manifest = minimal_manifest();
        manifest.broker.batch_size = MAX_BATCH_SIZE + 1;
        let err = validate(&manifest).unwrap_err().to_string();
        assert!(err.contains("batch_size"), "got: {err}");

        manifest.broker.batch_size = 0;
        assert!(validate(&manifest).is_err());
    }

    #[test]
    fn test_zero_dispatch_capacity() {
        let mut manifest = minimal_manifest();
        manifest.broker.dispatch_capacity = 0;
        let err = validate(&manifest).unwrap_err().to_string();
        assert!(err.contains("dispatch_capacity"), "got: {err}");
    }

    #[test]
    fn test_empty_sink_name() {
        let mut manifest = minimal_manifest();
        manifest.sink.name = String::new();
        let err = validate(&manifest).unwrap_err().to_string();
        assert!(err.contains("cannot be empty"), "got: {err}");
    }
}
