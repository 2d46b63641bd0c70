//! NetworkSink - one UDP datagram per batch

use contracts::{ContractError, MetricPoint, MetricSink, MAX_BATCH_SIZE};
use serde::Serialize;
use std::collections::HashMap;
use std::net::SocketAddr;
use tokio::net::UdpSocket;
use tokio_util::sync::CancellationToken;
use tracing::{debug, instrument};

/// Serialization format for network transmission
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum NetworkFormat {
    /// JSON (human-readable, larger)
    #[default]
    Json,
    /// Bincode (binary, compact)
    Bincode,
}

/// Configuration for NetworkSink
#[derive(Debug, Clone)]
pub struct NetworkSinkConfig {
    /// Target address
    pub addr: SocketAddr,
    /// Serialization format
    pub format: NetworkFormat,
    /// Max datagram size (UDP typically 65507 for IPv4)
    pub max_packet_size: usize,
}

impl NetworkSinkConfig {
    /// Create config from params map
    pub fn from_params(params: &HashMap<String, String>) -> Result<Self, String> {
        let addr_str = params
            .get("addr")
            .ok_or_else(|| "missing 'addr' parameter".to_string())?;

        let addr: SocketAddr = addr_str
            .parse()
            .map_err(|e| format!("invalid address '{}': {}", addr_str, e))?;

        let format = match params.get("format").map(String::as_str) {
            Some("bincode") => NetworkFormat::Bincode,
            Some("json") | None => NetworkFormat::Json,
            Some(other) => return Err(format!("unknown format '{}'", other)),
        };

        let max_packet_size = params
            .get("max_packet_size")
            .and_then(|s| s.parse().ok())
            .unwrap_or(65000);

        Ok(Self {
            addr,
            format,
            max_packet_size,
        })
    }
}

/// Datagram layout shared by both formats
#[derive(Serialize)]
struct Datagram<'a> {
    namespace: &'a str,
    points: Vec<WirePoint<'a>>,
}

/// Fixed-shape point encoding; every field is always present
#[derive(Serialize)]
struct WirePoint<'a> {
    name: &'a str,
    value: f64,
    unit: &'a str,
    /// Unix milliseconds
    timestamp_ms: Option<i64>,
    dimensions: &'a HashMap<String, String>,
}

impl<'a> From<&'a MetricPoint> for WirePoint<'a> {
    fn from(point: &'a MetricPoint) -> Self {
        Self {
            name: &point.name,
            value: point.value,
            unit: &point.unit,
            timestamp_ms: point.timestamp.map(|t| t.timestamp_millis()),
            dimensions: &point.dimensions,
        }
    }
}

/// Sink that sends batches over UDP
pub struct NetworkSink {
    name: String,
    config: NetworkSinkConfig,
    socket: UdpSocket,
}

impl NetworkSink {
    /// Create a new NetworkSink
    #[instrument(name = "network_sink_new", skip(name, config))]
    pub async fn new(name: impl Into<String>, config: NetworkSinkConfig) -> std::io::Result<Self> {
        let name = name.into();
        let bind_addr = if config.addr.is_ipv4() {
            "0.0.0.0:0"
        } else {
            "[::]:0"
        };
        let socket = UdpSocket::bind(bind_addr).await?;
        socket.connect(&config.addr).await?;

        debug!(
            sink = %name,
            target = %config.addr,
            "NetworkSink connected"
        );

        Ok(Self {
            name,
            config,
            socket,
        })
    }

    /// Create from params (for factory)
    #[instrument(name = "network_sink_from_params", skip(name, params))]
    pub async fn from_params(
        name: impl Into<String>,
        params: &HashMap<String, String>,
    ) -> Result<Self, ContractError> {
        let name = name.into();
        let config = NetworkSinkConfig::from_params(params)
            .map_err(|e| ContractError::config_validation(format!("sink.{name}"), e))?;

        Self::new(name.clone(), config)
            .await
            .map_err(|e| ContractError::sink_connection(name, e.to_string()))
    }

    fn encode(&self, namespace: &str, points: &[MetricPoint]) -> Result<Vec<u8>, ContractError> {
        if points.len() > MAX_BATCH_SIZE {
            return Err(ContractError::BatchTooLarge {
                len: points.len(),
                limit: MAX_BATCH_SIZE,
            });
        }

        let datagram = Datagram {
            namespace,
            points: points.iter().map(WirePoint::from).collect(),
        };
        let data = match self.config.format {
            NetworkFormat::Json => {
                serde_json::to_vec(&datagram).map_err(|e| format!("json error: {}", e))
            }
            NetworkFormat::Bincode => {
                bincode::serialize(&datagram).map_err(|e| format!("bincode error: {}", e))
            }
        }
        .map_err(|e| ContractError::sink_publish(&self.name, e))?;

        if data.len() > self.config.max_packet_size {
            return Err(ContractError::sink_publish(
                &self.name,
                format!(
                    "datagram of {} bytes exceeds limit of {}",
                    data.len(),
                    self.config.max_packet_size
                ),
            ));
        }

        Ok(data)
    }
}

impl MetricSink for NetworkSink {
    fn name(&self) -> &str {
        &self.name
    }

    #[instrument(
        name = "network_sink_publish",
        skip(self, _cancel, points),
        fields(sink = %self.name, points = points.len())
    )]
    async fn publish(
        &self,
        _cancel: &CancellationToken,
        namespace: &str,
        points: &[MetricPoint],
    ) -> Result<(), ContractError> {
        let data = self.encode(namespace, points)?;
        let sent = self
            .socket
            .send(&data)
            .await
            .map_err(|e| ContractError::sink_publish(&self.name, e.to_string()))?;
        debug!(sink = %self.name, bytes = sent, "Sent");
        Ok(())
    }
}
