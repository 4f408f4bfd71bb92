//! Unhandled rejection reporting
//!
//! The agent calls its [`RejectionTracker`] with operation `Reject` when a
//! promise rejects while nothing has ever been attached to it, and with
//! `Handle` when a handler is attached to such a promise afterwards.

use std::fmt;

use crate::promise::Promise;
use crate::value::Value;

/// Operation reported to a [`RejectionTracker`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RejectionOperation {
    /// A promise rejected without any handler
    Reject,
    /// A handler was attached to a promise previously reported as unhandled
    Handle,
}

impl RejectionOperation {
    /// Operation tag
    pub fn as_str(&self) -> &'static str {
        match self {
            RejectionOperation::Reject => "reject",
            RejectionOperation::Handle => "handle",
        }
    }
}

impl fmt::Display for RejectionOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Host hook for unhandled rejections
pub trait RejectionTracker: Send + Sync {
    /// Called with the rejected promise and the operation tag
    fn track(&self, promise: &Promise, operation: RejectionOperation);
}

impl<F> RejectionTracker for F
where
    F: Fn(&Promise, RejectionOperation) + Send + Sync,
{
    fn track(&self, promise: &Promise, operation: RejectionOperation) {
        self(promise, operation)
    }
}

/// Default tracker: emits a diagnostic through `tracing`
#[derive(Debug, Default, Clone, Copy)]
pub struct LogRejectionTracker;

impl RejectionTracker for LogRejectionTracker {
    fn track(&self, promise: &Promise, operation: RejectionOperation) {
        let reason = promise.result().unwrap_or(Value::Undefined);
        match operation {
            RejectionOperation::Reject => {
                tracing::error!(%operation, "Uncaught (in promise) {}", reason)
            }
            RejectionOperation::Handle => {
                tracing::warn!(%operation, "Rejection handled asynchronously: {}", reason)
            }
        }
    }
}
