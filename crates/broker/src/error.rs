//! Broker error types

use thiserror::Error;

use contracts::ContractError;

/// Broker-specific errors
///
/// `RegistrationClosed`, `InvalidInterval` and `AlreadyRunning` are returned
/// synchronously to the caller. `Collection` and `Publish` only ever travel
/// through the [`ErrorReporter`](crate::ErrorReporter).
#[derive(Debug, Error)]
pub enum BrokerError {
    /// Registration attempted after the broker was sealed
    #[error("cannot register task '{task}': broker is shutting down")]
    RegistrationClosed { task: String },

    /// Task interval must be strictly positive
    #[error("cannot register task '{task}': interval must be > 0")]
    InvalidInterval { task: String },

    /// `run` called more than once
    #[error("broker is already running or has terminated")]
    AlreadyRunning,

    /// Source failed to produce points; the firing is dropped
    #[error("failed to collect metrics for task '{task}': {source}")]
    Collection {
        task: String,
        namespace: String,
        #[source]
        source: ContractError,
    },

    /// Sink failed one batch; sibling batches are unaffected
    #[error("failed to publish batch {batch} ({points} points) of task '{task}' to '{namespace}': {source}")]
    Publish {
        task: String,
        namespace: String,
        batch: usize,
        points: usize,
        #[source]
        source: ContractError,
    },

    /// Sink creation error
    #[error("failed to create sink '{name}': {message}")]
    SinkCreation { name: String, message: String },

    /// Source creation error
    #[error("failed to create source for task '{task}': {message}")]
    SourceCreation { task: String, message: String },

    /// Contract error
    #[error("contract error: {0}")]
    Contract(#[from] ContractError),

    /// IO error
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl BrokerError {
    /// Create a sink creation error
    pub fn sink_creation(name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::SinkCreation {
            name: name.into(),
            message: message.into(),
        }
    }

    /// Create a source creation error
    pub fn source_creation(task: impl Into<String>, message: impl Into<String>) -> Self {
        Self::SourceCreation {
            task: task.into(),
            message: message.into(),
        }
    }

    /// Short label used for metrics
    pub fn kind(&self) -> &'static str {
        match self {
            Self::RegistrationClosed { .. } => "registration_closed",
            Self::InvalidInterval { .. } => "invalid_interval",
            Self::AlreadyRunning => "already_running",
            Self::Collection { .. } => "collection",
            Self::Publish { .. } => "publish",
            Self::SinkCreation { .. } => "sink_creation",
            Self::SourceCreation { .. } => "source_creation",
            Self::Contract(_) => "contract",
            Self::Io(_) => "io",
        }
    }
}
