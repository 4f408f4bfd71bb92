//! Agent - the host that owns the job queue
//!
//! An [`Agent`] bundles the job queue, the rejection tracker, the
//! configuration and the intrinsic promise constructor. Promises keep a
//! handle to the agent that created them and schedule all of their work
//! onto its queue. The agent never drains on its own: the embedder calls
//! [`Agent::run_jobs`] once the current synchronous turn has finished.
//!
//! Queued jobs hold promises and every promise holds its agent, so an agent
//! dropped with jobs still queued is never freed. Drain the queue, or discard
//! it with [`Agent::clear_jobs`], before dropping the last handle.

use std::fmt;
use std::sync::Arc;

use crate::config::AgentConfig;
use crate::constructor::Constructor;
use crate::error::{PromiseError, PromiseResult};
use crate::job::{Job, JobQueue};
use crate::promise::Promise;
use crate::rejection::{LogRejectionTracker, RejectionOperation, RejectionTracker};
use crate::value::Function;

struct AgentInner {
    config: AgentConfig,
    jobs: JobQueue,
    tracker: Arc<dyn RejectionTracker>,
    promise_constructor: Constructor,
    then_function: Function,
}

/// Handle to a promise host. Clones share the same queue.
#[derive(Clone)]
pub struct Agent {
    inner: Arc<AgentInner>,
}

impl Agent {
    /// Create an agent with default configuration and the logging tracker
    pub fn new() -> Self {
        AgentBuilder::new().build()
    }

    /// Create an agent with `config` and the logging tracker
    pub fn with_config(config: AgentConfig) -> Self {
        AgentBuilder::new().config(config).build()
    }

    /// Start building an agent
    pub fn builder() -> AgentBuilder {
        AgentBuilder::new()
    }

    /// Agent configuration
    pub fn config(&self) -> &AgentConfig {
        &self.inner.config
    }

    /// The intrinsic `Promise` constructor of this agent
    pub fn promise_constructor(&self) -> &Constructor {
        &self.inner.promise_constructor
    }

    /// The `then` member shared by every promise of this agent
    pub fn then_function(&self) -> &Function {
        &self.inner.then_function
    }

    /// The job queue
    pub fn job_queue(&self) -> &JobQueue {
        &self.inner.jobs
    }

    /// Schedule `job` after every job already queued
    pub fn enqueue_job(&self, job: Job) {
        let kind = job.kind();
        let seq = self.inner.jobs.enqueue(job);
        tracing::trace!(seq, ?kind, "enqueued promise job");
    }

    /// Number of queued jobs
    pub fn pending_jobs(&self) -> usize {
        self.inner.jobs.len()
    }

    /// Check if any job is queued
    pub fn has_pending_jobs(&self) -> bool {
        !self.inner.jobs.is_empty()
    }

    /// Drain the job queue, returning the number of jobs executed.
    ///
    /// Jobs enqueued during the drain run in the same call. A failing job
    /// does not stop the drain; the first failure is returned once the
    /// queue is empty. When `max_jobs_per_drain` is reached with jobs still
    /// queued, the drain stops and returns `DrainBudgetExceeded`.
    pub fn run_jobs(&self) -> PromiseResult<usize> {
        let budget = self.inner.config.max_jobs_per_drain;
        let mut executed = 0;
        let mut first_error = None;

        loop {
            if let Some(max) = budget {
                if executed >= max && self.has_pending_jobs() {
                    tracing::warn!(max, pending = self.pending_jobs(), "job drain budget exhausted");
                    return Err(PromiseError::DrainBudgetExceeded(max));
                }
            }

            let Some((seq, job)) = self.inner.jobs.dequeue() else {
                break;
            };
            let kind = job.kind();
            tracing::trace!(seq, ?kind, "running promise job");
            if let Err(e) = job.run() {
                tracing::warn!("Promise job {} error: {}", seq, e);
                first_error.get_or_insert(e);
            }
            executed += 1;
        }

        match first_error {
            Some(e) => Err(e),
            None => Ok(executed),
        }
    }

    /// Discard every queued job without running it, returning how many
    /// were dropped.
    pub fn clear_jobs(&self) -> usize {
        let dropped = self.inner.jobs.len();
        self.inner.jobs.clear();
        if dropped > 0 {
            tracing::debug!(dropped, "cleared promise jobs");
        }
        dropped
    }

    pub(crate) fn track_rejection(&self, promise: &Promise, operation: RejectionOperation) {
        self.inner.tracker.track(promise, operation);
    }

    /// Identity comparison
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

impl Default for Agent {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Agent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Agent")
            .field("config", &self.inner.config)
            .field("pending_jobs", &self.pending_jobs())
            .finish()
    }
}

/// Builder for [`Agent`]
///
/// # Example
///
/// ```ignore
/// let agent = Agent::builder()
///     .config(AgentConfig::new().optimize_await(true))
///     .rejection_tracker(|promise: &Promise, op: RejectionOperation| {
///         eprintln!("{op}: {:?}", promise.result());
///     })
///     .build();
/// ```
pub struct AgentBuilder {
    config: Option<AgentConfig>,
    tracker: Option<Arc<dyn RejectionTracker>>,
}

impl AgentBuilder {
    /// Create a new builder
    pub fn new() -> Self {
        Self {
            config: None,
            tracker: None,
        }
    }

    /// Set agent configuration.
    ///
    /// If not set, uses `AgentConfig::default()`.
    pub fn config(mut self, config: AgentConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// Set the unhandled rejection hook.
    ///
    /// If not set, uses [`LogRejectionTracker`].
    pub fn rejection_tracker(mut self, tracker: impl RejectionTracker + 'static) -> Self {
        self.tracker = Some(Arc::new(tracker));
        self
    }

    /// Set a shared unhandled rejection hook
    pub fn shared_rejection_tracker(mut self, tracker: Arc<dyn RejectionTracker>) -> Self {
        self.tracker = Some(tracker);
        self
    }

    /// Build the agent
    pub fn build(self) -> Agent {
        Agent {
            inner: Arc::new(AgentInner {
                config: self.config.unwrap_or_default(),
                jobs: JobQueue::new(),
                tracker: self.tracker.unwrap_or_else(|| {
                    Arc::new(LogRejectionTracker) as Arc<dyn RejectionTracker>
                }),
                promise_constructor: Constructor::intrinsic(),
                then_function: Promise::then_function(),
            }),
        }
    }
}

impl Default for AgentBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::{Function, Value};
    use parking_lot::Mutex;

    #[test]
    fn test_run_jobs_counts_nested_jobs() {
        let agent = Agent::new();
        let promise = Promise::resolve(&agent, 1).unwrap();
        promise
            .then(None, None)
            .unwrap()
            .then(None, None)
            .unwrap();

        // One job per `then` link: the second is only scheduled by the first.
        assert_eq!(agent.pending_jobs(), 1);
        assert_eq!(agent.run_jobs().unwrap(), 2);
        assert!(!agent.has_pending_jobs());
    }

    #[test]
    fn test_budget_stops_drain() {
        let agent = Agent::with_config(AgentConfig::new().max_jobs_per_drain(1));
        let promise = Promise::resolve(&agent, 1).unwrap();
        promise.then(None, None).unwrap();
        promise.then(None, None).unwrap();

        assert!(matches!(
            agent.run_jobs(),
            Err(PromiseError::DrainBudgetExceeded(1))
        ));
        assert_eq!(agent.pending_jobs(), 1);
        assert_eq!(agent.run_jobs().unwrap(), 1);
    }

    #[test]
    fn test_custom_tracker_receives_reports() {
        let reports = Arc::new(Mutex::new(Vec::new()));
        let reports_clone = reports.clone();
        let agent = Agent::builder()
            .rejection_tracker(move |_: &Promise, op: RejectionOperation| {
                reports_clone.lock().push(op);
            })
            .build();

        let rejected = Promise::reject(&agent, "x").unwrap();
        assert_eq!(*reports.lock(), vec![RejectionOperation::Reject]);

        rejected
            .catch(Some(Function::new("ignore", |_, _| Ok(Value::Undefined))))
            .unwrap();
        assert_eq!(
            *reports.lock(),
            vec![RejectionOperation::Reject, RejectionOperation::Handle]
        );
    }

    #[test]
    fn test_clear_jobs_releases_agent() {
        let agent = Agent::new();
        let weak = Arc::downgrade(&agent.inner);
        Promise::resolve(&agent, 1)
            .unwrap()
            .then(None, None)
            .unwrap();

        assert_eq!(agent.clear_jobs(), 1);
        assert!(!agent.has_pending_jobs());
        drop(agent);
        assert!(weak.upgrade().is_none());
    }

    #[test]
    fn test_then_member_is_shared() {
        let agent = Agent::new();
        let a = Value::Promise(Promise::resolve(&agent, 1).unwrap());
        let b = Value::Promise(Promise::resolve(&agent, 2).unwrap());

        assert_eq!(a.get("then").unwrap(), a.get("then").unwrap());
        assert_eq!(a.get("then").unwrap(), b.get("then").unwrap());
        assert_eq!(
            a.get("then").unwrap(),
            Value::Function(agent.then_function().clone())
        );
    }

    #[test]
    fn test_agents_have_distinct_constructors() {
        let a = Agent::new();
        let b = Agent::new();
        assert!(!a.promise_constructor().ptr_eq(b.promise_constructor()));
        assert!(a.clone().ptr_eq(&a));
    }
}
