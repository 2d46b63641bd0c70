//! Error reporter - sink for asynchronous failures
//!
//! Collection and publish failures never stop the broker. They are handed to
//! an optional user [`ErrorHandler`]; without one they are written to the log.

use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;

use tracing::error;

use crate::error::BrokerError;

/// Receiver of asynchronous broker failures
///
/// Called inline on the worker that hit the failure, so implementations
/// should return quickly.
pub trait ErrorHandler: Send + Sync + 'static {
    fn handle(&self, error: &BrokerError);
}

impl<F> ErrorHandler for F
where
    F: Fn(&BrokerError) + Send + Sync + 'static,
{
    fn handle(&self, error: &BrokerError) {
        self(error)
    }
}

/// Cloneable front for the configured handler
#[derive(Clone, Default)]
pub struct ErrorReporter {
    handler: Option<Arc<dyn ErrorHandler>>,
}

impl ErrorReporter {
    pub fn new(handler: Option<Arc<dyn ErrorHandler>>) -> Self {
        Self { handler }
    }

    /// Report a failure. Never panics, never returns an error.
    pub fn report(&self, error: BrokerError) {
        observability::record_error_reported(error.kind());

        match &self.handler {
            Some(handler) => {
                let outcome = catch_unwind(AssertUnwindSafe(|| handler.handle(&error)));
                if let Err(panic) = outcome {
                    error!(
                        error = %error,
                        panic = panic_message(panic.as_ref()),
                        "Error handler panicked"
                    );
                }
            }
            None => {
                error!(kind = error.kind(), error = %error, "Broker error");
            }
        }
    }

    pub fn has_handler(&self) -> bool {
        self.handler.is_some()
    }
}

impl std::fmt::Debug for ErrorReporter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ErrorReporter")
            .field("handler", &self.handler.is_some())
            .finish()
    }
}

fn panic_message(panic: &(dyn std::any::Any + Send)) -> &str {
    if let Some(s) = panic.downcast_ref::<&str>() {
        s
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.as_str()
    } else {
        "unknown panic"
    }
}
