//! Layered error definitions
//!
//! Categorized by source: config / source / sink

use thiserror::Error;

/// Unified error type
#[derive(Debug, Error)]
pub enum ContractError {
    // ===== Configuration Errors =====
    /// Configuration parse error
    #[error("config parse error: {message}")]
    ConfigParse {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Configuration validation error
    #[error("config validation error at '{field}': {message}")]
    ConfigValidation { field: String, message: String },

    // ===== Source Errors =====
    /// Metric source failed to produce points
    #[error("metric collection error: {message}")]
    Collect { message: String },

    // ===== Sink Errors =====
    /// Sink rejected or failed a batch
    #[error("sink '{sink_name}' publish error: {message}")]
    SinkPublish { sink_name: String, message: String },

    /// Sink connection error
    #[error("sink '{sink_name}' connection error: {message}")]
    SinkConnection { sink_name: String, message: String },

    /// Batch larger than the sink accepts
    #[error("batch of {len} points exceeds sink limit of {limit}")]
    BatchTooLarge { len: usize, limit: usize },

    // ===== General Errors =====
    /// Operation aborted by the cancellation signal
    #[error("operation cancelled")]
    Cancelled,

    /// IO error
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Other error
    #[error("{0}")]
    Other(String),
}

impl ContractError {
    /// Create configuration parse error
    pub fn config_parse(message: impl Into<String>) -> Self {
        Self::ConfigParse {
            message: message.into(),
            source: None,
        }
    }

    /// Create configuration validation error
    pub fn config_validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::ConfigValidation {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Create metric collection error
    pub fn collect(message: impl Into<String>) -> Self {
        Self::Collect {
            message: message.into(),
        }
    }

    /// Create sink publish error
    pub fn sink_publish(sink_name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::SinkPublish {
            sink_name: sink_name.into(),
            message: message.into(),
        }
    }

    /// Create sink connection error
    pub fn sink_connection(sink_name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::SinkConnection {
            sink_name: sink_name.into(),
            message: message.into(),
        }
    }
}
