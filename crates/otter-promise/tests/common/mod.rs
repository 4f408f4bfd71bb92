#![allow(dead_code)]

use otter_promise::{
    Agent, AgentConfig, Await, Function, Promise, PromiseError, RejectionOperation, Value, arg,
};
use parking_lot::Mutex;
use std::sync::Arc;
use tracing_subscriber::filter::EnvFilter;

/// Route library logs to the test harness; `RUST_LOG` picks the level.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// Ordered record of values observed by handlers
#[derive(Clone, Default)]
pub struct Log {
    entries: Arc<Mutex<Vec<Value>>>,
}

impl Log {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&self, value: impl Into<Value>) {
        self.entries.lock().push(value.into());
    }

    /// A handler that records its first argument
    pub fn function(&self) -> Function {
        let log = self.clone();
        Function::new("log", move |_, args| {
            log.push(arg(args, 0));
            Ok(Value::Undefined)
        })
    }

    /// A handler that records `label` and ignores its argument
    pub fn marker(&self, label: &'static str) -> Function {
        let log = self.clone();
        Function::new(label, move |_, _| {
            log.push(label);
            Ok(Value::Undefined)
        })
    }

    pub fn values(&self) -> Vec<Value> {
        self.entries.lock().clone()
    }

    pub fn strings(&self) -> Vec<String> {
        self.entries.lock().iter().map(|v| v.to_string()).collect()
    }
}

/// Rejection reports received by an agent's tracker
#[derive(Clone, Default)]
pub struct Reports {
    entries: Arc<Mutex<Vec<(Promise, RejectionOperation)>>>,
}

impl Reports {
    pub fn operations(&self) -> Vec<RejectionOperation> {
        self.entries.lock().iter().map(|(_, op)| *op).collect()
    }

    pub fn promises(&self) -> Vec<Promise> {
        self.entries.lock().iter().map(|(p, _)| p.clone()).collect()
    }
}

/// Agent whose rejection tracker records into the returned [`Reports`]
pub fn recording_agent(config: AgentConfig) -> (Agent, Reports) {
    init_tracing();
    let reports = Reports::default();
    let sink = reports.entries.clone();
    let agent = Agent::builder()
        .config(config)
        .rejection_tracker(move |promise: &Promise, op: RejectionOperation| {
            sink.lock().push((promise.clone(), op));
        })
        .build();
    (agent, reports)
}

pub fn noop() -> Function {
    Function::new("noop", |_, _| Ok(Value::Undefined))
}

/// Drive `point` the way an async function body would: resume it once,
/// resume it again when the yielded promise settles, and resolve the
/// returned promise with the awaited value.
pub fn drive_await(agent: &Agent, point: Await) -> Promise {
    let point = Arc::new(Mutex::new(point));
    Promise::new(agent, |resolve, reject| {
        let step = point.lock().resume()?;
        let chained = step
            .value
            .as_promise()
            .cloned()
            .ok_or_else(|| PromiseError::type_error("await did not yield a promise"))?;

        let point = point.clone();
        let next = Function::new("next", move |_, _| {
            let step = point.lock().resume()?;
            if !step.done {
                reject.call(Value::Undefined, &["what".into()])?;
            }
            resolve.call(Value::Undefined, &[step.value])?;
            Ok(Value::Undefined)
        });
        chained.then(Some(next), None)?;
        Ok(())
    })
}
