//! Promise state machine
//!
//! A promise starts pending and settles exactly once. Settlement stores the
//! result, drops both reaction lists, and schedules one job per reaction of
//! the matching list. Callbacks never run inside the call that settled the
//! promise or registered the reaction; they run when the agent drains its
//! job queue.
//!
//! ## Rust API
//!
//! ```ignore
//! let agent = Agent::new();
//! let promise = Promise::new(&agent, |resolve, _reject| {
//!     resolve.call(Value::Undefined, &[Value::from(42)])?;
//!     Ok(())
//! });
//! promise.then(Some(on_fulfilled), None)?;
//! agent.run_jobs()?;
//! ```

use parking_lot::Mutex;
use std::fmt;
use std::sync::Arc;

use crate::agent::Agent;
use crate::capability::PromiseCapability;
use crate::constructor::Constructor;
use crate::error::{PromiseError, PromiseResult};
use crate::job::Job;
use crate::reaction::{PromiseReaction, ReactionType};
use crate::rejection::RejectionOperation;
use crate::resolving::ResolvingFunctions;
use crate::value::{Function, Value, arg};

/// Promise state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PromiseState {
    /// Not yet settled (possibly waiting on a thenable)
    Pending,
    /// Settled with a value
    Fulfilled,
    /// Settled with a reason
    Rejected,
}

struct PromiseSlots {
    state: PromiseState,
    result: Option<Value>,
    /// `None` once settled
    fulfill_reactions: Option<Vec<PromiseReaction>>,
    /// `None` once settled
    reject_reactions: Option<Vec<PromiseReaction>>,
    is_handled: bool,
}

struct PromiseInner {
    agent: Agent,
    constructor: Constructor,
    slots: Mutex<PromiseSlots>,
}

/// A promise handle. Clones share the same promise.
#[derive(Clone)]
pub struct Promise {
    inner: Arc<PromiseInner>,
}

impl fmt::Debug for Promise {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (state, result) = {
            let slots = self.inner.slots.lock();
            (slots.state, slots.result.clone())
        };
        match (state, result) {
            (PromiseState::Fulfilled, Some(v)) => write!(f, "Promise {{ <fulfilled>: {:?} }}", v),
            (PromiseState::Rejected, Some(v)) => write!(f, "Promise {{ <rejected>: {:?} }}", v),
            _ => write!(f, "Promise {{ <pending> }}"),
        }
    }
}

impl Promise {
    /// Allocate a pending promise of `constructor` without running an executor
    pub(crate) fn allocate(agent: &Agent, constructor: Constructor) -> Self {
        Self {
            inner: Arc::new(PromiseInner {
                agent: agent.clone(),
                constructor,
                slots: Mutex::new(PromiseSlots {
                    state: PromiseState::Pending,
                    result: None,
                    fulfill_reactions: Some(Vec::new()),
                    reject_reactions: Some(Vec::new()),
                    is_handled: false,
                }),
            }),
        }
    }

    /// Allocate a pending promise of the agent's intrinsic constructor
    #[cfg(test)]
    pub(crate) fn pending(agent: &Agent) -> Self {
        Self::allocate(agent, agent.promise_constructor().clone())
    }

    /// Create a promise, running `executor` synchronously with its resolve
    /// and reject functions.
    ///
    /// An `Err` from the executor rejects the promise unless it already
    /// settled.
    pub fn new<F>(agent: &Agent, executor: F) -> Self
    where
        F: FnOnce(Function, Function) -> PromiseResult<()>,
    {
        let promise = Self::allocate(agent, agent.promise_constructor().clone());
        let functions = ResolvingFunctions::new(&promise);
        if let Err(error) = executor(functions.resolve.clone(), functions.reject.clone()) {
            functions.reject_with(error.into_value());
        }
        promise
    }

    /// `new C(executor)` for a function-valued executor.
    ///
    /// This is the default construct behavior of every [`Constructor`];
    /// derived constructors call it from their hook.
    pub fn construct(agent: &Agent, constructor: &Constructor, executor: &Function) -> Self {
        let promise = Self::allocate(agent, constructor.clone());
        let functions = ResolvingFunctions::new(&promise);
        let args = [
            Value::Function(functions.resolve.clone()),
            Value::Function(functions.reject.clone()),
        ];
        if let Err(error) = executor.call(Value::Undefined, &args) {
            functions.reject_with(error.into_value());
        }
        promise
    }

    /// `Promise.resolve(value)` on the agent's intrinsic constructor
    pub fn resolve(agent: &Agent, value: impl Into<Value>) -> PromiseResult<Promise> {
        agent.promise_constructor().resolve(agent, value)
    }

    /// `Promise.reject(reason)` on the agent's intrinsic constructor
    pub fn reject(agent: &Agent, reason: impl Into<Value>) -> PromiseResult<Promise> {
        let capability = PromiseCapability::new(agent, agent.promise_constructor())?;
        capability.reject(reason)?;
        Ok(capability.promise().clone())
    }

    /// Register fulfillment/rejection handlers and return the derived promise.
    ///
    /// The derived promise is built by this promise's constructor. Handlers
    /// are scheduled as jobs, never called from inside `then`.
    pub fn then(
        &self,
        on_fulfilled: Option<Function>,
        on_rejected: Option<Function>,
    ) -> PromiseResult<Promise> {
        let capability = PromiseCapability::new(&self.inner.agent, &self.inner.constructor)?;
        let derived = capability.promise().clone();
        perform_then(self, on_fulfilled, on_rejected, Some(capability));
        Ok(derived)
    }

    /// Register a rejection handler (`then(None, on_rejected)`)
    pub fn catch(&self, on_rejected: Option<Function>) -> PromiseResult<Promise> {
        self.then(None, on_rejected)
    }

    /// Build the chaining operation as a function value. Each agent keeps one,
    /// see [`Agent::then_function`].
    ///
    /// The receiver must be a promise; non-function handler arguments are
    /// treated as absent.
    pub(crate) fn then_function() -> Function {
        Function::new("then", |this, args| {
            let Value::Promise(promise) = this else {
                return Err(PromiseError::type_error(
                    "Promise.prototype.then called on incompatible receiver",
                ));
            };
            let on_fulfilled = arg(args, 0).as_function().cloned();
            let on_rejected = arg(args, 1).as_function().cloned();
            Ok(Value::Promise(promise.then(on_fulfilled, on_rejected)?))
        })
    }

    /// Get current state
    pub fn state(&self) -> PromiseState {
        self.inner.slots.lock().state
    }

    /// Fulfillment value or rejection reason; `None` while pending
    pub fn result(&self) -> Option<Value> {
        self.inner.slots.lock().result.clone()
    }

    /// Whether a reaction was ever attached or a late handle was reported
    pub fn is_handled(&self) -> bool {
        self.inner.slots.lock().is_handled
    }

    /// Check if promise is pending
    pub fn is_pending(&self) -> bool {
        self.state() == PromiseState::Pending
    }

    /// Check if promise is fulfilled
    pub fn is_fulfilled(&self) -> bool {
        self.state() == PromiseState::Fulfilled
    }

    /// Check if promise is rejected
    pub fn is_rejected(&self) -> bool {
        self.state() == PromiseState::Rejected
    }

    /// The constructor that built this promise
    pub fn constructor(&self) -> &Constructor {
        &self.inner.constructor
    }

    /// The agent whose job queue this promise schedules onto
    pub fn agent(&self) -> &Agent {
        &self.inner.agent
    }

    /// Identity comparison
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

/// Attach a fulfill/reject reaction pair targeting `capability`.
///
/// Returns the capability's promise, or `None` for a reaction with no
/// downstream.
pub(crate) fn perform_then(
    promise: &Promise,
    on_fulfilled: Option<Function>,
    on_rejected: Option<Function>,
    capability: Option<PromiseCapability>,
) -> Option<Promise> {
    let derived = capability.as_ref().map(|c| c.promise().clone());
    let fulfill_reaction = PromiseReaction::new(capability.clone(), on_fulfilled, ReactionType::Fulfill);
    let reject_reaction = PromiseReaction::new(capability, on_rejected, ReactionType::Reject);

    let mut slots = promise.inner.slots.lock();
    let state = slots.state;
    let report_handle = state == PromiseState::Rejected && !slots.is_handled;
    let scheduled = match state {
        PromiseState::Pending => {
            slots
                .fulfill_reactions
                .get_or_insert_with(Vec::new)
                .push(fulfill_reaction);
            slots
                .reject_reactions
                .get_or_insert_with(Vec::new)
                .push(reject_reaction);
            None
        }
        PromiseState::Fulfilled => Some((fulfill_reaction, slots.result.clone())),
        PromiseState::Rejected => Some((reject_reaction, slots.result.clone())),
    };
    if !report_handle {
        slots.is_handled = true;
    }
    drop(slots);

    if report_handle {
        promise
            .inner
            .agent
            .track_rejection(promise, RejectionOperation::Handle);
        promise.inner.slots.lock().is_handled = true;
    }

    if let Some((reaction, argument)) = scheduled {
        promise.inner.agent.enqueue_job(Job::Reaction {
            reaction,
            argument: argument.unwrap_or(Value::Undefined),
        });
    }

    derived
}

/// Transition a pending promise to fulfilled
pub(crate) fn fulfill_promise(promise: &Promise, value: Value) {
    let reactions = {
        let mut slots = promise.inner.slots.lock();
        debug_assert_eq!(slots.state, PromiseState::Pending);
        let reactions = slots.fulfill_reactions.take();
        slots.result = Some(value.clone());
        slots.reject_reactions = None;
        slots.state = PromiseState::Fulfilled;
        reactions.unwrap_or_default()
    };
    tracing::debug!(reactions = reactions.len(), "promise fulfilled");
    trigger_promise_reactions(&promise.inner.agent, reactions, value);
}

/// Transition a pending promise to rejected, reporting it if unhandled
pub(crate) fn reject_promise(promise: &Promise, reason: Value) {
    let (reactions, is_handled) = {
        let mut slots = promise.inner.slots.lock();
        debug_assert_eq!(slots.state, PromiseState::Pending);
        let reactions = slots.reject_reactions.take();
        slots.result = Some(reason.clone());
        slots.fulfill_reactions = None;
        slots.state = PromiseState::Rejected;
        (reactions.unwrap_or_default(), slots.is_handled)
    };
    tracing::debug!(reactions = reactions.len(), "promise rejected");
    if !is_handled {
        promise
            .inner
            .agent
            .track_rejection(promise, RejectionOperation::Reject);
    }
    trigger_promise_reactions(&promise.inner.agent, reactions, reason);
}

fn trigger_promise_reactions(agent: &Agent, reactions: Vec<PromiseReaction>, argument: Value) {
    for reaction in reactions {
        agent.enqueue_job(Job::Reaction {
            reaction,
            argument: argument.clone(),
        });
    }
}
