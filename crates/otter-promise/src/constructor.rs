//! Promise constructor kinds
//!
//! Every promise remembers the constructor that built it. `then` builds its
//! derived promise with the receiver's constructor, and
//! [`Constructor::resolve`] returns an argument unchanged only when it is a
//! promise of that exact constructor.

use std::fmt;
use std::sync::Arc;

use crate::agent::Agent;
use crate::capability::PromiseCapability;
use crate::error::PromiseResult;
use crate::promise::Promise;
use crate::value::{Function, Value};

/// Construct behavior of a derived constructor: `(agent, this constructor, executor)`
pub type ConstructHook =
    dyn Fn(&Agent, &Constructor, &Function) -> PromiseResult<Promise> + Send + Sync;

struct ConstructorData {
    name: Arc<str>,
    hook: Option<Box<ConstructHook>>,
}

/// A promise constructor. Clones share identity.
#[derive(Clone)]
pub struct Constructor {
    inner: Arc<ConstructorData>,
}

impl Constructor {
    /// A fresh intrinsic `Promise` constructor
    pub fn intrinsic() -> Self {
        Self {
            inner: Arc::new(ConstructorData {
                name: Arc::from("Promise"),
                hook: None,
            }),
        }
    }

    /// A derived constructor whose construction runs `hook`.
    ///
    /// The hook receives the executor it must hand resolving functions to;
    /// delegating to [`Promise::construct`] is the `super(executor)` call.
    pub fn derived<F>(name: impl Into<Arc<str>>, hook: F) -> Self
    where
        F: Fn(&Agent, &Constructor, &Function) -> PromiseResult<Promise> + Send + Sync + 'static,
    {
        Self {
            inner: Arc::new(ConstructorData {
                name: name.into(),
                hook: Some(Box::new(hook)),
            }),
        }
    }

    /// Constructor name
    pub fn name(&self) -> &str {
        &self.inner.name
    }

    /// `new C(executor)`
    pub fn construct(&self, agent: &Agent, executor: &Function) -> PromiseResult<Promise> {
        match &self.inner.hook {
            Some(hook) => hook(agent, self, executor),
            None => Ok(Promise::construct(agent, self, executor)),
        }
    }

    /// `C.resolve(value)`
    pub fn resolve(&self, agent: &Agent, value: impl Into<Value>) -> PromiseResult<Promise> {
        let value = value.into();
        if let Value::Promise(promise) = &value {
            if promise.constructor().ptr_eq(self) {
                return Ok(promise.clone());
            }
        }
        let capability = PromiseCapability::new(agent, self)?;
        capability.resolve(value)?;
        Ok(capability.promise().clone())
    }

    /// Identity comparison
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

impl fmt::Debug for Constructor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[Constructor: {}]", self.inner.name)
    }
}
