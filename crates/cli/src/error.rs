//! Error types for CLI operations.

use thiserror::Error;

use broker::BrokerError;

/// CLI-specific error types
#[derive(Error, Debug)]
pub enum CliError {
    /// Configuration file not found
    #[error("Configuration file not found: {path}")]
    ConfigNotFound { path: String },

    /// Sink or source could not be built from the manifest
    #[error("Failed to set up broker: {0}")]
    Setup(#[source] BrokerError),

    /// Task registration refused by the broker
    #[error("Failed to register task '{task}': {source}")]
    Registration {
        task: String,
        #[source]
        source: BrokerError,
    },

    /// Broker run loop failed or panicked
    #[error("Broker execution failed: {message}")]
    Execution { message: String },

    /// Generic error wrapper
    #[error("{0}")]
    Other(#[from] anyhow::Error),
}

impl CliError {
    pub fn config_not_found(path: impl Into<String>) -> Self {
        Self::ConfigNotFound { path: path.into() }
    }

    pub fn registration(task: impl Into<String>, source: BrokerError) -> Self {
        Self::Registration {
            task: task.into(),
            source,
        }
    }

    pub fn execution(message: impl Into<String>) -> Self {
        Self::Execution {
            message: message.into(),
        }
    }
}

/// Result type alias for CLI operations
pub type Result<T> = std::result::Result<T, CliError>;
