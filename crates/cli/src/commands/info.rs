//! `info` command implementation.

use anyhow::{Context, Result};
use contracts::BrokerManifest;
use serde::Serialize;
use std::collections::HashMap;
use tracing::info;

use crate::cli::InfoArgs;

/// Configuration info for JSON output
#[derive(Serialize)]
struct ConfigInfo {
    version: String,
    broker: BrokerInfo,
    sink: SinkInfo,
    namespaces: Vec<String>,
    tasks: Vec<TaskInfo>,
}

#[derive(Serialize)]
struct BrokerInfo {
    intake_capacity: usize,
    dispatch_capacity: usize,
    batch_size: usize,
    overlap: String,
}

#[derive(Serialize)]
struct SinkInfo {
    name: String,
    sink_type: String,
    #[serde(skip_serializing_if = "HashMap::is_empty")]
    params: HashMap<String, String>,
}

#[derive(Serialize)]
struct TaskInfo {
    name: String,
    namespace: String,
    interval_ms: u64,
    source_type: String,
    #[serde(skip_serializing_if = "HashMap::is_empty")]
    params: HashMap<String, String>,
}

/// Execute the `info` command
pub fn run_info(args: &InfoArgs) -> Result<()> {
    info!(config = %args.config.display(), "Loading configuration info");

    if !args.config.exists() {
        anyhow::bail!("Configuration file not found: {}", args.config.display());
    }

    let manifest = config_loader::ConfigLoader::load_from_path(&args.config)
        .with_context(|| format!("Failed to load config from {}", args.config.display()))?;

    if args.json {
        let info = build_config_info(&manifest, args);
        let json =
            serde_json::to_string_pretty(&info).context("Failed to serialize config info")?;
        println!("{}", json);
    } else {
        print_config_info(&manifest, args);
    }

    Ok(())
}

fn build_config_info(manifest: &BrokerManifest, args: &InfoArgs) -> ConfigInfo {
    let tasks = manifest
        .tasks
        .iter()
        .map(|t| TaskInfo {
            name: t.name.clone(),
            namespace: t.namespace.clone(),
            interval_ms: t.interval_ms,
            source_type: format!("{:?}", t.source.source_type),
            params: if args.tasks {
                t.source.params.clone()
            } else {
                HashMap::new()
            },
        })
        .collect();

    ConfigInfo {
        version: format!("{:?}", manifest.version),
        broker: BrokerInfo {
            intake_capacity: manifest.broker.intake_capacity,
            dispatch_capacity: manifest.broker.dispatch_capacity,
            batch_size: manifest.broker.batch_size,
            overlap: format!("{:?}", manifest.broker.overlap),
        },
        sink: SinkInfo {
            name: manifest.sink.name.clone(),
            sink_type: format!("{:?}", manifest.sink.sink_type),
            params: manifest.sink.params.clone(),
        },
        namespaces: manifest.namespaces().into_iter().map(String::from).collect(),
        tasks,
    }
}

fn print_config_info(manifest: &BrokerManifest, args: &InfoArgs) {
    println!("╔══════════════════════════════════════════════════════════════╗");
    println!("║               Metric Broker Configuration                    ║");
    println!("╚══════════════════════════════════════════════════════════════╝\n");

    let broker = &manifest.broker;
    println!("⚙️  Broker");
    println!("   ├─ Version: {:?}", manifest.version);
    println!("   ├─ Intake capacity: {}", broker.intake_capacity);
    println!("   ├─ Dispatch capacity: {}", broker.dispatch_capacity);
    println!("   ├─ Batch size: {}", broker.batch_size);
    println!("   └─ Overlap: {:?}", broker.overlap);

    println!("\n📤 Sink");
    println!("   ├─ Name: {}", manifest.sink.name);
    println!("   └─ Type: {:?}", manifest.sink.sink_type);

    println!("\n⏱  Tasks ({})", manifest.tasks.len());
    for (i, task) in manifest.tasks.iter().enumerate() {
        let is_last = i == manifest.tasks.len() - 1;
        let prefix = if is_last { "└─" } else { "├─" };
        let child_prefix = if is_last { "   " } else { "│  " };

        println!(
            "   {} {} -> {} every {}ms",
            prefix, task.name, task.namespace, task.interval_ms
        );

        if args.tasks {
            println!(
                "   {}  └─ source: {:?}",
                child_prefix, task.source.source_type
            );
            let mut params: Vec<_> = task.source.params.iter().collect();
            params.sort();
            for (key, value) in params {
                println!("   {}       {} = {}", child_prefix, key, value);
            }
        }
    }

    let namespaces = manifest.namespaces();
    println!("\n🏷  Namespaces ({})", namespaces.len());
    for (i, namespace) in namespaces.iter().enumerate() {
        let prefix = if i == namespaces.len() - 1 { "└─" } else { "├─" };
        println!("   {} {}", prefix, namespace);
    }

    println!();
}

#[cfg(test)]
mod tests {
    use super::*;
    use config_loader::{ConfigFormat, ConfigLoader};

    const MANIFEST: &str = r#"
        [sink]
        name = "out"
        sink_type = "log"

        [[tasks]]
        name = "a"
        namespace = "App/One"
        interval_ms = 1000
        [tasks.source]
        source_type = "mock"
        [tasks.source.params]
        points = "5"

        [[tasks]]
        name = "b"
        namespace = "App/One"
        interval_ms = 500
        [tasks.source]
        source_type = "heartbeat"
    "#;

    #[test]
    fn test_build_config_info() {
        let manifest = ConfigLoader::load_from_str(MANIFEST, ConfigFormat::Toml).unwrap();
        let args = InfoArgs {
            config: "broker.toml".into(),
            json: true,
            tasks: false,
        };

        let info = build_config_info(&manifest, &args);
        assert_eq!(info.namespaces, vec!["App/One".to_string()]);
        assert_eq!(info.tasks.len(), 2);
        assert!(info.tasks[0].params.is_empty());
        assert_eq!(info.broker.batch_size, 20);

        let detailed = build_config_info(
            &manifest,
            &InfoArgs {
                tasks: true,
                ..args
            },
        );
        assert_eq!(detailed.tasks[0].params.get("points").map(String::as_str), Some("5"));
    }
}
