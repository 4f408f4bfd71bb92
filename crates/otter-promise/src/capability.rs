//! Promise capability records
//!
//! A capability couples a promise with the exact resolve/reject functions
//! handed to its constructor's executor. Internal code uses it whenever it
//! must create and then control a promise of an arbitrary [`Constructor`].

use parking_lot::Mutex;
use std::sync::Arc;

use crate::agent::Agent;
use crate::constructor::Constructor;
use crate::error::{PromiseError, PromiseResult};
use crate::promise::Promise;
use crate::value::{Function, Value, arg};

/// A promise together with the functions that settle it
#[derive(Clone)]
pub struct PromiseCapability {
    promise: Promise,
    resolve: Function,
    reject: Function,
}

impl PromiseCapability {
    /// Construct a promise of `constructor` and capture its resolving functions.
    ///
    /// Fails with a TypeError if the constructor invokes the executor twice
    /// after functions were captured, or returns without supplying callable
    /// resolve/reject functions.
    pub fn new(agent: &Agent, constructor: &Constructor) -> PromiseResult<Self> {
        let captured = Arc::new(Mutex::new((Value::Undefined, Value::Undefined)));

        let executor = {
            let captured = captured.clone();
            Function::new("executor", move |_, args| {
                let mut slots = captured.lock();
                if !slots.0.is_undefined() || !slots.1.is_undefined() {
                    return Err(PromiseError::type_error(
                        "Promise executor has already been invoked with non-undefined arguments",
                    ));
                }
                *slots = (arg(args, 0), arg(args, 1));
                Ok(Value::Undefined)
            })
        };

        let promise = constructor.construct(agent, &executor)?;
        let (resolve, reject) = captured.lock().clone();

        let Value::Function(resolve) = resolve else {
            return Err(PromiseError::type_error("Promise resolve function is not callable"));
        };
        let Value::Function(reject) = reject else {
            return Err(PromiseError::type_error("Promise reject function is not callable"));
        };

        Ok(Self {
            promise,
            resolve,
            reject,
        })
    }

    /// The controlled promise
    pub fn promise(&self) -> &Promise {
        &self.promise
    }

    /// The captured resolve function
    pub fn resolve_function(&self) -> &Function {
        &self.resolve
    }

    /// The captured reject function
    pub fn reject_function(&self) -> &Function {
        &self.reject
    }

    /// Call the captured resolve function
    pub fn resolve(&self, value: impl Into<Value>) -> PromiseResult<Value> {
        self.resolve.call(Value::Undefined, &[value.into()])
    }

    /// Call the captured reject function
    pub fn reject(&self, reason: impl Into<Value>) -> PromiseResult<Value> {
        self.reject.call(Value::Undefined, &[reason.into()])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::promise::PromiseState;

    #[test]
    fn test_intrinsic_capability_controls_its_promise() {
        let agent = Agent::new();
        let capability = PromiseCapability::new(&agent, agent.promise_constructor()).unwrap();
        assert!(capability.promise().is_pending());
        assert!(capability.promise().constructor().ptr_eq(agent.promise_constructor()));

        capability.resolve(5).unwrap();
        assert_eq!(capability.promise().state(), PromiseState::Fulfilled);
        assert_eq!(capability.promise().result(), Some(Value::from(5)));
    }

    #[test]
    fn test_missing_resolving_functions_is_type_error() {
        let agent = Agent::new();
        let lazy = Constructor::derived("Lazy", |agent, constructor, _executor| {
            // Never forwards the executor, so nothing is captured.
            let noop = Function::new("noop", |_, _| Ok(Value::Undefined));
            Ok(Promise::construct(agent, constructor, &noop))
        });

        match PromiseCapability::new(&agent, &lazy) {
            Err(PromiseError::TypeError(message)) => {
                assert_eq!(message, "Promise resolve function is not callable")
            }
            Ok(_) => panic!("expected a TypeError"),
            Err(other) => panic!("unexpected error: {}", other),
        }
    }

    #[test]
    fn test_executor_invoked_twice_is_type_error() {
        let agent = Agent::new();
        let twice = Constructor::derived("Twice", |agent, constructor, executor| {
            let promise = Promise::construct(agent, constructor, executor);
            let again = Function::new("again", |_, _| Ok(Value::Undefined));
            executor.call(
                Value::Undefined,
                &[Value::Function(again.clone()), Value::Function(again)],
            )?;
            Ok(promise)
        });

        assert!(matches!(
            PromiseCapability::new(&agent, &twice),
            Err(PromiseError::TypeError(_))
        ));
    }
}
