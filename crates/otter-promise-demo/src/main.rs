use anyhow::Result;
use clap::Parser;
use otter_promise::{Agent, AgentConfig, Await, Function, Promise, PromiseError, Value, arg};
use parking_lot::Mutex;
use std::sync::Arc;
use tracing_subscriber::filter::EnvFilter;

#[derive(Parser)]
#[command(name = "promise-order", version, about = "Print the job ordering of otter-promise")]
struct Cli {
    /// Await intrinsic promises without wrapping them again
    #[arg(long)]
    optimize_await: bool,
    /// Fail a drain that runs more than this many jobs
    #[arg(long)]
    max_jobs: Option<usize>,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let mut config = AgentConfig::new().optimize_await(cli.optimize_await);
    if let Some(max) = cli.max_jobs {
        config = config.max_jobs_per_drain(max);
    }
    let agent = Agent::with_config(config);
    tracing::debug!(?agent, "agent ready");

    let log = Function::new("log", |_, args| {
        println!("{}", arg(args, 0));
        Ok(Value::Undefined)
    });

    // a, b, c, d
    constructor_ordering(&agent, &log)?;
    agent.run_jobs()?;

    // optimized, primitive, unoptimized
    drive_await(
        &agent,
        &log,
        Await::with_fast_path(
            &agent,
            Promise::resolve(&agent, "async promise, unoptimized")?,
            false,
        ),
    )?;
    drive_await(
        &agent,
        &log,
        Await::with_fast_path(
            &agent,
            Promise::resolve(&agent, "async promise, optimized")?,
            true,
        ),
    )?;
    drive_await(&agent, &log, Await::new(&agent, "async primitive"))?;
    agent.run_jobs()?;

    Ok(())
}

fn constructor_ordering(agent: &Agent, log: &Function) -> Result<()> {
    Promise::new(agent, |resolve, _| {
        resolve.call(Value::Undefined, &[Promise::resolve(agent, "d")?.into()])?;
        Ok(())
    })
    .then(Some(log.clone()), None)?;

    Promise::new(agent, |resolve, _| {
        println!("a");
        resolve.call(Value::Undefined, &["b".into()])?;
        Ok(())
    })
    .then(Some(log.clone()), None)?;

    Promise::resolve(agent, "c")?.then(Some(log.clone()), None)?;
    Ok(())
}

/// Resume `point` once, then again from a reaction on the promise it yields,
/// settling an outer promise with the awaited value.
fn drive_await(agent: &Agent, log: &Function, point: Await) -> Result<()> {
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
    .then(Some(log.clone()), None)?;

    Ok(())
}
