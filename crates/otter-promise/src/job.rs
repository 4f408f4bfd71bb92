//! Job queue for promise reactions and thenable adoption.
//!
//! ## Ordering Guarantees
//!
//! - FIFO: jobs run in the order they were enqueued, across all promises
//! - A job never runs inside the call that enqueued it; the host drains the
//!   queue between synchronous turns (see [`Agent::run_jobs`](crate::Agent::run_jobs))
//! - Run-to-completion: a job finishes before the next one starts
//! - Jobs enqueued while draining run in the same drain, after every job
//!   that was already queued

use parking_lot::Mutex;
use std::collections::VecDeque;
use std::fmt;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};

use crate::error::PromiseResult;
use crate::promise::Promise;
use crate::reaction::{PromiseReaction, promise_reaction_job};
use crate::resolving::promise_resolve_thenable_job;
use crate::value::{Function, Value};

/// Kind of promise job
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobKind {
    /// Deliver a settlement to a reaction
    Reaction,
    /// Call a thenable's `then` with fresh resolving functions
    ResolveThenable,
}

/// A scheduled unit of promise work
pub enum Job {
    /// Run `reaction` with the settlement value `argument`
    Reaction {
        /// The reaction to run
        reaction: PromiseReaction,
        /// Fulfillment value or rejection reason
        argument: Value,
    },
    /// Adopt the state of `thenable` into `promise`
    ResolveThenable {
        /// The promise being resolved
        promise: Promise,
        /// The object whose `then` was read during resolution
        thenable: Value,
        /// The `then` function captured by that single read
        then: Function,
    },
}

impl Job {
    /// Job kind
    pub fn kind(&self) -> JobKind {
        match self {
            Job::Reaction { .. } => JobKind::Reaction,
            Job::ResolveThenable { .. } => JobKind::ResolveThenable,
        }
    }

    /// Run the job to completion.
    ///
    /// Callback failures become rejections inside the job. An error is only
    /// returned when a capability's own resolve/reject function fails.
    pub fn run(self) -> PromiseResult<()> {
        match self {
            Job::Reaction { reaction, argument } => promise_reaction_job(reaction, argument),
            Job::ResolveThenable {
                promise,
                thenable,
                then,
            } => {
                promise_resolve_thenable_job(promise, thenable, then);
                Ok(())
            }
        }
    }
}

impl fmt::Debug for Job {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Job::Reaction { reaction, argument } => f
                .debug_struct("Reaction")
                .field("kind", &reaction.kind())
                .field("argument", argument)
                .finish(),
            Job::ResolveThenable { thenable, then, .. } => f
                .debug_struct("ResolveThenable")
                .field("thenable", thenable)
                .field("then", then)
                .finish(),
        }
    }
}

/// FIFO queue of promise jobs
pub struct JobQueue {
    queue: Mutex<VecDeque<(u64, Job)>>,
    len: AtomicUsize,
    next_seq: AtomicU64,
}

impl JobQueue {
    /// Create new empty queue
    pub fn new() -> Self {
        Self {
            queue: Mutex::new(VecDeque::new()),
            len: AtomicUsize::new(0),
            next_seq: AtomicU64::new(0),
        }
    }

    /// Add a job to the back of the queue, returning its sequence number
    pub fn enqueue(&self, job: Job) -> u64 {
        let seq = self.next_seq.fetch_add(1, Ordering::Relaxed);
        self.queue.lock().push_back((seq, job));
        self.len.fetch_add(1, Ordering::Relaxed);
        seq
    }

    /// Take the oldest job together with its sequence number
    pub fn dequeue(&self) -> Option<(u64, Job)> {
        let job = self.queue.lock().pop_front();
        if job.is_some() {
            self.len.fetch_sub(1, Ordering::Relaxed);
        }
        job
    }

    /// Peek the next job sequence number
    pub fn peek_seq(&self) -> Option<u64> {
        self.queue.lock().front().map(|(seq, _)| *seq)
    }

    /// Number of queued jobs
    pub fn len(&self) -> usize {
        self.len.load(Ordering::Relaxed)
    }

    /// Check if queue is empty
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Clear all pending jobs
    pub fn clear(&self) {
        let mut queue = self.queue.lock();
        let len = queue.len();
        queue.clear();
        self.len.fetch_sub(len, Ordering::Relaxed);
    }
}

impl Default for JobQueue {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for JobQueue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("JobQueue").field("len", &self.len()).finish()
    }
}
