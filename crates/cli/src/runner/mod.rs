//! Broker runtime orchestration.

mod orchestrator;
mod stats;

pub use orchestrator::{Runner, RunnerConfig};
pub use stats::RunStats;
