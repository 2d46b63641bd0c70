//! # Contracts
//!
//! Frozen interface contracts shared by every crate of the broker workspace:
//! the metric data model, the source and sink capabilities, the manifest
//! structures, and the common error type.
//! Business crates depend on this crate only; reverse dependencies are prohibited.
//!
//! ## Time Model
//! - Metric timestamps are wall-clock UTC (`chrono::DateTime<Utc>`)
//! - Scheduling never looks at these timestamps; it runs on the monotonic clock

mod error;
mod manifest;
mod metric;
mod sink;
mod source;

pub use error::*;
pub use manifest::*;
pub use metric::*;
pub use sink::*;
pub use source::{FnSource, MetricSource, SourceRef};

pub use tokio_util::sync::CancellationToken;
