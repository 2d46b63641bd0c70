//! Built-in metric sources

mod heartbeat;
mod mock;

pub use self::heartbeat::HeartbeatSource;
pub use self::mock::{MockSource, MockSourceConfig};

use std::sync::Arc;

use contracts::{SourceConfig, SourceRef, SourceType};

use crate::error::BrokerError;

/// Create a source from configuration
pub fn create_source(config: &SourceConfig, task: &str) -> Result<SourceRef, BrokerError> {
    match config.source_type {
        SourceType::Mock => {
            let mock = MockSourceConfig::from_params(&config.params)
                .map_err(|e| BrokerError::source_creation(task, e))?;
            Ok(Arc::new(MockSource::new(mock)))
        }
        SourceType::Heartbeat => Ok(Arc::new(HeartbeatSource::from_params(&config.params))),
    }
}
