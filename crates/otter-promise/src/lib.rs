//! # Otter Promise
//!
//! Promise state machine and await suspension point on top of a single
//! FIFO job queue.
//!
//! - [`Promise`]: pending → fulfilled | rejected, settled once through its
//!   resolving functions
//! - [`PromiseCapability`]: a promise plus the functions that settle it
//! - [`Agent`]: owns the job queue, the rejection tracker and the intrinsic
//!   constructor; the embedder drains it with [`Agent::run_jobs`]
//! - [`Await`]: two-step suspension point that yields a chained promise and
//!   resumes with its outcome
//!
//! Any object exposing a callable `then` is adopted as a thenable. Handlers
//! never run inside the call that registered them or settled their promise.

#![warn(clippy::all)]
#![warn(missing_docs)]

pub mod agent;
pub mod await_op;
pub mod capability;
pub mod config;
pub mod constructor;
pub mod error;
pub mod generator;
pub mod job;
pub mod promise;
pub mod reaction;
pub mod rejection;
pub mod resolving;
pub mod value;

pub use agent::{Agent, AgentBuilder};
pub use await_op::Await;
pub use capability::PromiseCapability;
pub use config::AgentConfig;
pub use constructor::Constructor;
pub use error::{PromiseError, PromiseResult};
pub use generator::IteratorResult;
pub use job::{Job, JobKind, JobQueue};
pub use promise::{Promise, PromiseState};
pub use reaction::{PromiseReaction, ReactionType};
pub use rejection::{LogRejectionTracker, RejectionOperation, RejectionTracker};
pub use resolving::ResolvingFunctions;
pub use value::{ErrorKind, ErrorObject, Function, Object, Property, Value, arg};
