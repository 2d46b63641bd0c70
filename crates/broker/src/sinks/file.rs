//! FileSink - appends batches to per-namespace JSON-lines files

use contracts::{ContractError, MetricPoint, MetricSink};
use serde::Serialize;
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, instrument};

/// Configuration for FileSink
#[derive(Debug, Clone)]
pub struct FileSinkConfig {
    /// Base output directory
    pub base_path: PathBuf,
}

impl FileSinkConfig {
    /// Create config from params map
    pub fn from_params(params: &HashMap<String, String>) -> Self {
        let base_path = params
            .get("base_path")
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from("./output"));

        Self { base_path }
    }
}

/// One line of output
#[derive(Serialize)]
struct Record<'a> {
    namespace: &'a str,
    #[serde(flatten)]
    point: &'a MetricPoint,
}

/// Sink that appends every point as a JSON line to
/// `<base_path>/<namespace>.jsonl`
pub struct FileSink {
    name: String,
    config: FileSinkConfig,
    /// Serializes appends so concurrent batches never interleave lines
    write_lock: Mutex<()>,
}

impl FileSink {
    /// Create a new FileSink
    pub fn new(name: impl Into<String>, config: FileSinkConfig) -> std::io::Result<Self> {
        // Create base directory if it doesn't exist
        fs::create_dir_all(&config.base_path)?;

        Ok(Self {
            name: name.into(),
            config,
            write_lock: Mutex::new(()),
        })
    }

    /// Create from params map (for factory)
    pub fn from_params(
        name: impl Into<String>,
        params: &HashMap<String, String>,
    ) -> std::io::Result<Self> {
        let config = FileSinkConfig::from_params(params);
        Self::new(name, config)
    }

    pub fn base_path(&self) -> &Path {
        &self.config.base_path
    }

    /// Output file for `namespace`; path separators and other unsafe
    /// characters become `_`
    pub fn path_for(&self, namespace: &str) -> PathBuf {
        let file_stem: String = namespace
            .chars()
            .map(|c| {
                if c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.') {
                    c
                } else {
                    '_'
                }
            })
            .collect();
        let file_stem = if file_stem.is_empty() {
            "default".to_string()
        } else {
            file_stem
        };
        self.config.base_path.join(format!("{file_stem}.jsonl"))
    }

    fn encode(namespace: &str, points: &[MetricPoint]) -> std::io::Result<Vec<u8>> {
        let mut buf = Vec::new();
        for point in points {
            serde_json::to_writer(&mut buf, &Record { namespace, point })
                .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;
            buf.push(b'\n');
        }
        Ok(buf)
    }

    async fn append(&self, path: &Path, data: &[u8]) -> std::io::Result<()> {
        let _guard = self.write_lock.lock().await;
        let mut file = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .await?;
        file.write_all(data).await?;
        file.flush().await
    }
}

impl MetricSink for FileSink {
    fn name(&self) -> &str {
        &self.name
    }

    #[instrument(
        name = "file_sink_publish",
        skip(self, _cancel, points),
        fields(sink = %self.name, points = points.len())
    )]
    async fn publish(
        &self,
        _cancel: &CancellationToken,
        namespace: &str,
        points: &[MetricPoint],
    ) -> Result<(), ContractError> {
        let path = self.path_for(namespace);
        let persisted = match Self::encode(namespace, points) {
            Ok(data) => self.append(&path, &data).await,
            Err(e) => Err(e),
        };

        persisted.map_err(|e| {
            error!(sink = %self.name, path = %path.display(), error = %e, "Write failed");
            ContractError::sink_publish(&self.name, e.to_string())
        })?;

        debug!(sink = %self.name, path = %path.display(), "Batch appended");
        Ok(())
    }
}
