mod common;

use common::{Log, drive_await, recording_agent};
use otter_promise::{
    AgentConfig, Await, Function, IteratorResult, Object, Promise, PromiseError, Value,
};
use parking_lot::Mutex;
use std::sync::Arc;

#[test]
fn test_fast_path_settles_before_wrapped_promise() {
    let (agent, _) = recording_agent(AgentConfig::default());
    let log = Log::new();

    let unoptimized = Await::with_fast_path(
        &agent,
        Promise::resolve(&agent, "async promise, unoptimized").unwrap(),
        false,
    );
    let optimized = Await::with_fast_path(
        &agent,
        Promise::resolve(&agent, "async promise, optimized").unwrap(),
        true,
    );
    let primitive = Await::new(&agent, "async primitive");

    for point in [unoptimized, optimized, primitive] {
        drive_await(&agent, point)
            .then(Some(log.function()), None)
            .unwrap();
    }

    agent.run_jobs().unwrap();
    assert_eq!(
        log.strings(),
        vec![
            "async promise, optimized",
            "async primitive",
            "async promise, unoptimized",
        ]
    );
}

#[test]
fn test_wrapping_a_promise_costs_two_extra_jobs() {
    let (agent, _) = recording_agent(AgentConfig::default());

    let mut fast = Await::with_fast_path(&agent, Promise::resolve(&agent, 1).unwrap(), true);
    fast.resume().unwrap();
    assert_eq!(agent.run_jobs().unwrap(), 1);

    let mut slow = Await::with_fast_path(&agent, Promise::resolve(&agent, 1).unwrap(), false);
    slow.resume().unwrap();
    assert_eq!(agent.run_jobs().unwrap(), 3);

    assert_eq!(fast.resume().unwrap(), IteratorResult::done(Value::from(1)));
    assert_eq!(slow.resume().unwrap(), IteratorResult::done(Value::from(1)));
}

#[test]
fn test_optimize_await_config_selects_fast_path() {
    let (agent, _) = recording_agent(AgentConfig::new().optimize_await(true));
    let mut point = Await::new(&agent, Promise::resolve(&agent, "x").unwrap());
    point.resume().unwrap();
    assert_eq!(agent.run_jobs().unwrap(), 1);
}

#[test]
fn test_fast_path_still_wraps_foreign_constructor_promises() {
    let (agent, _) = recording_agent(AgentConfig::default());
    let other = otter_promise::Agent::new();
    let foreign = Promise::resolve(&other, "foreign").unwrap();

    let mut point = Await::with_fast_path(&agent, foreign, true);
    point.resume().unwrap();

    // Adopting a promise of another constructor goes through its `then`;
    // those reactions land on the other agent's queue.
    agent.run_jobs().unwrap();
    other.run_jobs().unwrap();
    agent.run_jobs().unwrap();
    assert_eq!(point.resume().unwrap(), IteratorResult::done(Value::from("foreign")));
}

#[test]
fn test_await_adopts_plain_thenable() {
    let (agent, _) = recording_agent(AgentConfig::default());
    let thenable = Object::new();
    thenable.set(
        "then",
        Function::new("then", |_, args| {
            let resolve = args
                .first()
                .and_then(Value::as_function)
                .cloned()
                .ok_or_else(|| PromiseError::type_error("missing resolve"))?;
            resolve.call(Value::Undefined, &[Value::from(7)])
        }),
    );

    let mut point = Await::new(&agent, thenable);
    let step = point.resume().unwrap();
    assert!(!step.done);

    agent.run_jobs().unwrap();
    assert_eq!(point.resume().unwrap(), IteratorResult::done(Value::from(7)));
}

#[test]
fn test_rejected_await_raises_from_resume() {
    let (agent, _) = recording_agent(AgentConfig::default());
    let log = Log::new();

    let rejected = Promise::reject(&agent, "nope").unwrap();
    let point = Arc::new(Mutex::new(Await::new(&agent, rejected)));
    let chained = point.lock().resume().unwrap().value;

    let resumer = {
        let point = point.clone();
        let log = log.clone();
        Function::new("resume", move |_, _| {
            match point.lock().resume() {
                Err(PromiseError::Throw(reason)) => log.push(reason),
                other => log.push(format!("unexpected: {:?}", other)),
            }
            Ok(Value::Undefined)
        })
    };
    chained
        .as_promise()
        .expect("await should yield a promise")
        .then(None, Some(resumer))
        .unwrap();

    agent.run_jobs().unwrap();
    assert_eq!(log.strings(), vec!["nope"]);
    assert!(point.lock().is_completed());
}

#[test]
fn test_resume_state_sequence() {
    let (agent, _) = recording_agent(AgentConfig::default());
    let mut point = Await::new(&agent, Value::Null);

    let first = point.resume().unwrap();
    assert!(!first.done);
    assert!(first.value.as_promise().is_some());
    assert!(matches!(point.resume(), Err(PromiseError::AwaitNotSettled)));

    agent.run_jobs().unwrap();
    assert_eq!(point.resume().unwrap(), IteratorResult::done(Value::Null));
    assert!(point.is_completed());
    assert_eq!(point.resume().unwrap(), IteratorResult::done_undefined());
}
