//! Resolving functions and the thenable adoption job
//!
//! A resolve/reject pair shares one `already_resolved` flag. The flag, not
//! the promise state, guards against double settlement: a promise waiting on
//! a thenable is still pending, yet its first pair must stay inert.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use crate::job::Job;
use crate::promise::{Promise, fulfill_promise, reject_promise};
use crate::value::{Function, Value, arg};

#[derive(Clone)]
struct Resolver {
    promise: Promise,
    already_resolved: Arc<AtomicBool>,
}

impl Resolver {
    fn new(promise: &Promise) -> Self {
        Self {
            promise: promise.clone(),
            already_resolved: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Check-and-set the shared flag; true only for the first caller
    fn claim(&self) -> bool {
        !self.already_resolved.swap(true, Ordering::SeqCst)
    }

    fn resolve(&self, resolution: Value) {
        if !self.claim() {
            return;
        }

        if let Value::Promise(inner) = &resolution {
            if inner.ptr_eq(&self.promise) {
                reject_promise(&self.promise, Value::type_error("Self resolution"));
                return;
            }
        }

        if !resolution.is_object() {
            fulfill_promise(&self.promise, resolution);
            return;
        }

        // `then` is read exactly once; the adoption job receives this reading.
        let then = match resolution.get("then") {
            Ok(then) => then,
            Err(error) => {
                reject_promise(&self.promise, error.into_value());
                return;
            }
        };

        match then {
            Value::Function(then) => self.promise.agent().enqueue_job(Job::ResolveThenable {
                promise: self.promise.clone(),
                thenable: resolution,
                then,
            }),
            _ => fulfill_promise(&self.promise, resolution),
        }
    }

    fn reject(&self, reason: Value) {
        if !self.claim() {
            return;
        }
        reject_promise(&self.promise, reason);
    }
}

/// A resolve/reject pair bound to one promise
#[derive(Clone)]
pub struct ResolvingFunctions {
    /// Resolve function: fulfills, rejects on self resolution, or adopts a thenable
    pub resolve: Function,
    /// Reject function
    pub reject: Function,
    resolver: Resolver,
}

impl ResolvingFunctions {
    pub(crate) fn new(promise: &Promise) -> Self {
        let resolver = Resolver::new(promise);

        let resolve = {
            let resolver = resolver.clone();
            Function::new("resolve", move |_, args| {
                resolver.resolve(arg(args, 0));
                Ok(Value::Undefined)
            })
        };

        let reject = {
            let resolver = resolver.clone();
            Function::new("reject", move |_, args| {
                resolver.reject(arg(args, 0));
                Ok(Value::Undefined)
            })
        };

        Self {
            resolve,
            reject,
            resolver,
        }
    }

    /// Whether either function of this pair has been called
    pub fn is_already_resolved(&self) -> bool {
        self.resolver.already_resolved.load(Ordering::SeqCst)
    }

    pub(crate) fn reject_with(&self, reason: Value) {
        self.resolver.reject(reason);
    }
}

pub(crate) fn promise_resolve_thenable_job(promise: Promise, thenable: Value, then: Function) {
    let functions = ResolvingFunctions::new(&promise);
    let args = [
        Value::Function(functions.resolve.clone()),
        Value::Function(functions.reject.clone()),
    ];
    if let Err(error) = then.call(thenable, &args) {
        functions.reject_with(error.into_value());
    }
}
