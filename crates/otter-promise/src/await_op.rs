//! Await - a resumable suspension point over `then`
//!
//! The first [`Await::resume`] wraps the awaited value in a promise, chains a
//! reaction onto it through a throwaway capability, and yields the chained
//! promise. The driver watches that promise settle and resumes again: a
//! fulfillment completes the await with the awaited value, a rejection is
//! raised from `resume`.
//!
//! `Await` schedules nothing on its own; the driver supplies the resume
//! trigger.
//!
//! ```ignore
//! let mut point = Await::new(&agent, Promise::resolve(&agent, "x")?);
//! let chained = point.resume()?.value;          // { value: <promise>, done: false }
//! chained.as_promise().unwrap().then(Some(resume_again), None)?;
//! agent.run_jobs()?;
//! ```

use parking_lot::Mutex;
use std::sync::Arc;

use crate::agent::Agent;
use crate::capability::PromiseCapability;
use crate::error::{PromiseError, PromiseResult};
use crate::generator::IteratorResult;
use crate::promise::{Promise, PromiseState, perform_then};
use crate::value::{Function, Value, arg};

enum AwaitStage {
    Start {
        value: Value,
        fast_path: bool,
    },
    Suspended {
        chained: Promise,
        result: Arc<Mutex<Option<Value>>>,
    },
    Completed,
}

/// A two-step suspension point
pub struct Await {
    agent: Agent,
    stage: AwaitStage,
}

impl Await {
    /// Await `value`, taking the fast path when the agent config enables it
    pub fn new(agent: &Agent, value: impl Into<Value>) -> Self {
        Self::with_fast_path(agent, value, agent.config().optimize_await)
    }

    /// Await `value` with an explicit fast-path choice.
    ///
    /// The fast path reuses a promise of the intrinsic constructor as-is;
    /// otherwise the value is always wrapped in a fresh capability, which
    /// costs extra jobs when the value is itself a promise.
    pub fn with_fast_path(agent: &Agent, value: impl Into<Value>, fast_path: bool) -> Self {
        Self {
            agent: agent.clone(),
            stage: AwaitStage::Start {
                value: value.into(),
                fast_path,
            },
        }
    }

    /// Check if the await has been resumed at least once
    pub fn is_started(&self) -> bool {
        !matches!(self.stage, AwaitStage::Start { .. })
    }

    /// Check if the await is waiting on its chained promise
    pub fn is_suspended(&self) -> bool {
        matches!(self.stage, AwaitStage::Suspended { .. })
    }

    /// Check if the await has completed (returned or raised)
    pub fn is_completed(&self) -> bool {
        matches!(self.stage, AwaitStage::Completed)
    }

    /// Advance the suspension point.
    ///
    /// - first call: yields the chained promise (`done == false`)
    /// - after the chained promise fulfilled: returns the awaited value (`done == true`)
    /// - after it rejected: returns `Err(PromiseError::Throw(reason))`
    /// - before it settled: returns `Err(PromiseError::AwaitNotSettled)` and stays resumable
    /// - once completed: returns `done` with `undefined`
    pub fn resume(&mut self) -> PromiseResult<IteratorResult> {
        match std::mem::replace(&mut self.stage, AwaitStage::Completed) {
            AwaitStage::Start { value, fast_path } => self.suspend(value, fast_path),
            AwaitStage::Suspended { chained, result } => match chained.state() {
                PromiseState::Pending => {
                    self.stage = AwaitStage::Suspended { chained, result };
                    Err(PromiseError::AwaitNotSettled)
                }
                PromiseState::Fulfilled => {
                    let value = result.lock().take().unwrap_or(Value::Undefined);
                    Ok(IteratorResult::done(value))
                }
                PromiseState::Rejected => Err(PromiseError::Throw(
                    chained.result().unwrap_or(Value::Undefined),
                )),
            },
            AwaitStage::Completed => Ok(IteratorResult::done_undefined()),
        }
    }

    fn suspend(&mut self, value: Value, fast_path: bool) -> PromiseResult<IteratorResult> {
        let constructor = self.agent.promise_constructor().clone();
        let promise = if fast_path {
            constructor.resolve(&self.agent, value)?
        } else {
            let capability = PromiseCapability::new(&self.agent, &constructor)?;
            capability.resolve(value)?;
            capability.promise().clone()
        };

        let result = Arc::new(Mutex::new(None));
        let on_fulfilled = {
            let result = result.clone();
            Function::new("onFulfilled", move |_, args| {
                *result.lock() = Some(arg(args, 0));
                Ok(Value::Undefined)
            })
        };
        let on_rejected = Function::new("onRejected", |_, args| {
            Err(PromiseError::Throw(arg(args, 0)))
        });

        let throwaway = PromiseCapability::new(&self.agent, &constructor)?;
        let chained = throwaway.promise().clone();
        perform_then(&promise, Some(on_fulfilled), Some(on_rejected), Some(throwaway));

        self.stage = AwaitStage::Suspended {
            chained: chained.clone(),
            result,
        };
        Ok(IteratorResult::yielded(Value::Promise(chained)))
    }
}
