//! MetricSource trait - metric producer abstraction
//!
//! A source is asked for its current points once per firing of the task it
//! is bound to. The broker treats it as stateless; implementations may keep
//! internal state behind `&self`.

use std::future::Future;
use std::sync::Arc;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use crate::{ContractError, MetricPoint};

/// Shared handle to a source, as stored by registered tasks.
pub type SourceRef = Arc<dyn MetricSource>;

/// Metric producer
///
/// # Example
///
/// ```ignore
/// struct Uptime(std::time::Instant);
///
/// #[async_trait]
/// impl MetricSource for Uptime {
///     async fn collect(&self, _cancel: &CancellationToken) -> Result<Vec<MetricPoint>, ContractError> {
///         Ok(vec![MetricPoint::new("uptime", self.0.elapsed().as_secs_f64())])
///     }
/// }
/// ```
#[async_trait]
pub trait MetricSource: Send + Sync + 'static {
    /// Produce the points for one firing, in order.
    ///
    /// Long-running implementations should watch `cancel` and give up early.
    async fn collect(&self, cancel: &CancellationToken) -> Result<Vec<MetricPoint>, ContractError>;
}

/// Function-backed [`MetricSource`].
///
/// The closure receives an owned clone of the cancellation token so the
/// returned future can be `'static`.
pub struct FnSource<F> {
    f: F,
}

impl<F> FnSource<F> {
    pub fn new(f: F) -> Self {
        Self { f }
    }

    /// Wrap into a shareable [`SourceRef`].
    pub fn arc<Fut>(f: F) -> SourceRef
    where
        F: Fn(CancellationToken) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Vec<MetricPoint>, ContractError>> + Send + 'static,
    {
        Arc::new(Self::new(f))
    }
}

#[async_trait]
impl<F, Fut> MetricSource for FnSource<F>
where
    F: Fn(CancellationToken) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<Vec<MetricPoint>, ContractError>> + Send + 'static,
{
    async fn collect(&self, cancel: &CancellationToken) -> Result<Vec<MetricPoint>, ContractError> {
        (self.f)(cancel.clone()).await
    }
}
