//! Promise error types

use crate::value::Value;
use thiserror::Error;

/// Errors raised by promise operations and user callbacks
#[derive(Debug, Clone, Error)]
pub enum PromiseError {
    /// A value raised by a callback (the `throw` of a handler, executor or `then`)
    #[error("Uncaught exception: {0}")]
    Throw(Value),

    /// Type error (e.g., a constructor that never supplied resolving functions)
    #[error("TypeError: {0}")]
    TypeError(String),

    /// The drain loop hit `AgentConfig::max_jobs_per_drain`
    #[error("Job queue drain exceeded the budget of {0} jobs")]
    DrainBudgetExceeded(usize),

    /// `Await::resume` was called while the chained promise was still pending
    #[error("Await resumed before its chained promise settled")]
    AwaitNotSettled,
}

impl PromiseError {
    /// Raise `value`
    pub fn throw(value: impl Into<Value>) -> Self {
        Self::Throw(value.into())
    }

    /// Create a type error
    pub fn type_error(message: impl Into<String>) -> Self {
        Self::TypeError(message.into())
    }

    /// The value a rejection handler observes for this error
    pub fn into_value(self) -> Value {
        match self {
            PromiseError::Throw(value) => value,
            PromiseError::TypeError(message) => Value::type_error(message),
            other => Value::error(other.to_string()),
        }
    }
}

/// Result type for promise operations
pub type PromiseResult<T> = Result<T, PromiseError>;
