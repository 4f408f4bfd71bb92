//! Step results of [`Await::resume`](crate::Await::resume)
//!
//! A step either hands the driver a value to wait on (`done == false`) or
//! finishes the suspension point with its outcome (`done == true`).

use crate::value::Value;

/// One step of a suspension point
#[derive(Debug, Clone, PartialEq)]
pub struct IteratorResult {
    /// Chained promise while suspended, awaited value once done
    pub value: Value,
    /// Whether the suspension point has finished
    pub done: bool,
}

impl IteratorResult {
    /// A suspended step handing out `value`
    pub fn yielded(value: Value) -> Self {
        Self { value, done: false }
    }

    /// A finishing step carrying `value`
    pub fn done(value: Value) -> Self {
        Self { value, done: true }
    }

    /// The step returned after the suspension point already finished
    pub fn done_undefined() -> Self {
        Self::done(Value::Undefined)
    }
}
