//! Dynamic values carried through promises
//!
//! Every promise settles with a [`Value`]. Primitives compare by value, objects
//! (errors, plain objects, functions and promises) compare by identity.
//!
//! ## Thenables
//!
//! Any object whose `then` member is a [`Function`] is a thenable. Plain
//! [`Object`]s may store `then` as a data property or behind a getter; reading
//! it through [`Value::get`] runs the getter exactly once per call. A
//! [`Promise`] exposes the intrinsic chaining operation as its `then` member.

use crate::error::PromiseResult;
use crate::promise::Promise;
use parking_lot::Mutex;
use rustc_hash::FxHashMap;
use std::fmt;
use std::sync::Arc;

/// Body of a native function: `(this, arguments) -> completion`
pub type NativeFn = dyn Fn(Value, &[Value]) -> PromiseResult<Value> + Send + Sync;

/// A value that can fulfill or reject a promise
#[derive(Clone)]
pub enum Value {
    /// `undefined`
    Undefined,
    /// `null`
    Null,
    /// Boolean primitive
    Boolean(bool),
    /// Number primitive
    Number(f64),
    /// String primitive
    String(Arc<str>),
    /// Error object
    Error(ErrorObject),
    /// Plain object (property bag)
    Object(Object),
    /// Callable object
    Function(Function),
    /// Promise object
    Promise(Promise),
}

impl Value {
    /// The `undefined` value
    pub fn undefined() -> Self {
        Value::Undefined
    }

    /// Create a string value
    pub fn string(s: impl Into<Arc<str>>) -> Self {
        Value::String(s.into())
    }

    /// Create a `TypeError` object
    pub fn type_error(message: impl Into<String>) -> Self {
        Value::Error(ErrorObject::new(ErrorKind::TypeError, message))
    }

    /// Create a plain `Error` object
    pub fn error(message: impl Into<String>) -> Self {
        Value::Error(ErrorObject::new(ErrorKind::Error, message))
    }

    /// Check for `undefined`
    pub fn is_undefined(&self) -> bool {
        matches!(self, Value::Undefined)
    }

    /// Check whether this value is an object rather than a primitive
    pub fn is_object(&self) -> bool {
        matches!(
            self,
            Value::Error(_) | Value::Object(_) | Value::Function(_) | Value::Promise(_)
        )
    }

    /// Get as function
    pub fn as_function(&self) -> Option<&Function> {
        match self {
            Value::Function(f) => Some(f),
            _ => None,
        }
    }

    /// Get as promise
    pub fn as_promise(&self) -> Option<&Promise> {
        match self {
            Value::Promise(p) => Some(p),
            _ => None,
        }
    }

    /// Get as string slice
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(&**s),
            _ => None,
        }
    }

    /// Get as number
    pub fn as_number(&self) -> Option<f64> {
        match self {
            Value::Number(n) => Some(*n),
            _ => None,
        }
    }

    /// Read a member.
    ///
    /// Accessor properties run their getter, which may raise. Primitives and
    /// objects without the member produce `undefined`.
    pub fn get(&self, key: &str) -> PromiseResult<Value> {
        match self {
            Value::Object(object) => object.get(key),
            Value::Promise(promise) if key == "then" => {
                Ok(Value::Function(promise.agent().then_function().clone()))
            }
            _ => Ok(Value::Undefined),
        }
    }
}

/// Get the argument at `index`, or `undefined` when it was not passed
pub fn arg(args: &[Value], index: usize) -> Value {
    args.get(index).cloned().unwrap_or(Value::Undefined)
}

fn format_number(n: f64, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    if n.is_nan() {
        write!(f, "NaN")
    } else if n.is_infinite() {
        write!(f, "{}", if n > 0.0 { "Infinity" } else { "-Infinity" })
    } else if n == 0.0 {
        write!(f, "0")
    } else if n.fract() == 0.0 && n.abs() < 1e21 {
        write!(f, "{:.0}", n)
    } else {
        write!(f, "{}", n)
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Undefined => write!(f, "undefined"),
            Value::Null => write!(f, "null"),
            Value::Boolean(b) => write!(f, "{}", b),
            Value::Number(n) => format_number(*n, f),
            Value::String(s) => write!(f, "{}", s),
            Value::Error(e) => write!(f, "{}", e),
            Value::Object(_) => write!(f, "[object Object]"),
            Value::Function(func) => write!(f, "[Function: {}]", func.name()),
            // Never the result: a promise may be settled with itself.
            Value::Promise(_) => write!(f, "[object Promise]"),
        }
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::String(s) => write!(f, "{:?}", s),
            other => write!(f, "{}", other),
        }
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Undefined, Value::Undefined) | (Value::Null, Value::Null) => true,
            (Value::Boolean(a), Value::Boolean(b)) => a == b,
            (Value::Number(a), Value::Number(b)) => a == b,
            (Value::String(a), Value::String(b)) => a == b,
            (Value::Error(a), Value::Error(b)) => a.ptr_eq(b),
            (Value::Object(a), Value::Object(b)) => a.ptr_eq(b),
            (Value::Function(a), Value::Function(b)) => a.ptr_eq(b),
            (Value::Promise(a), Value::Promise(b)) => a.ptr_eq(b),
            _ => false,
        }
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Boolean(b)
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Value::Number(n)
    }
}

impl From<i32> for Value {
    fn from(n: i32) -> Self {
        Value::Number(n as f64)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(Arc::from(s))
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(Arc::from(s))
    }
}

impl From<ErrorObject> for Value {
    fn from(e: ErrorObject) -> Self {
        Value::Error(e)
    }
}

impl From<Object> for Value {
    fn from(o: Object) -> Self {
        Value::Object(o)
    }
}

impl From<Function> for Value {
    fn from(f: Function) -> Self {
        Value::Function(f)
    }
}

impl From<Promise> for Value {
    fn from(p: Promise) -> Self {
        Value::Promise(p)
    }
}

/// Error constructor kind
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// `Error`
    Error,
    /// `TypeError`
    TypeError,
}

impl ErrorKind {
    /// Constructor name
    pub fn name(&self) -> &'static str {
        match self {
            ErrorKind::Error => "Error",
            ErrorKind::TypeError => "TypeError",
        }
    }
}

struct ErrorData {
    kind: ErrorKind,
    message: String,
}

/// An error object
#[derive(Clone)]
pub struct ErrorObject {
    inner: Arc<ErrorData>,
}

impl ErrorObject {
    /// Create a new error object
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            inner: Arc::new(ErrorData {
                kind,
                message: message.into(),
            }),
        }
    }

    /// Error kind
    pub fn kind(&self) -> ErrorKind {
        self.inner.kind
    }

    /// Error message
    pub fn message(&self) -> &str {
        &self.inner.message
    }

    /// Identity comparison
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

impl fmt::Display for ErrorObject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.inner.kind.name(), self.inner.message)
    }
}

impl fmt::Debug for ErrorObject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self)
    }
}

/// Object property slot
#[derive(Clone)]
pub enum Property {
    /// Plain stored value
    Data(Value),
    /// Getter invoked on every read, with the object as receiver
    Accessor(Function),
}

/// A plain object: a shared, mutable property bag
#[derive(Clone, Default)]
pub struct Object {
    properties: Arc<Mutex<FxHashMap<Arc<str>, Property>>>,
}

impl Object {
    /// Create an empty object
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a data property, replacing any previous slot
    pub fn set(&self, key: impl Into<Arc<str>>, value: impl Into<Value>) {
        self.properties
            .lock()
            .insert(key.into(), Property::Data(value.into()));
    }

    /// Install a getter, replacing any previous slot
    pub fn define_getter(&self, key: impl Into<Arc<str>>, getter: Function) {
        self.properties
            .lock()
            .insert(key.into(), Property::Accessor(getter));
    }

    /// Check whether the object has its own property `key`
    pub fn has(&self, key: &str) -> bool {
        self.properties.lock().contains_key(key)
    }

    /// Read a property, running the getter for accessor slots
    pub fn get(&self, key: &str) -> PromiseResult<Value> {
        // The lock must not be held while a getter runs: getters may touch
        // this object again.
        let property = self.properties.lock().get(key).cloned();
        match property {
            None => Ok(Value::Undefined),
            Some(Property::Data(value)) => Ok(value),
            Some(Property::Accessor(getter)) => getter.call(Value::Object(self.clone()), &[]),
        }
    }

    /// Identity comparison
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.properties, &other.properties)
    }
}

struct FunctionData {
    name: Arc<str>,
    body: Box<NativeFn>,
}

/// A callable native function
#[derive(Clone)]
pub struct Function {
    inner: Arc<FunctionData>,
}

impl Function {
    /// Wrap a Rust closure as a function value
    pub fn new<F>(name: impl Into<Arc<str>>, body: F) -> Self
    where
        F: Fn(Value, &[Value]) -> PromiseResult<Value> + Send + Sync + 'static,
    {
        Self {
            inner: Arc::new(FunctionData {
                name: name.into(),
                body: Box::new(body),
            }),
        }
    }

    /// Function name
    pub fn name(&self) -> &str {
        &self.inner.name
    }

    /// Call with an explicit receiver
    pub fn call(&self, this: Value, args: &[Value]) -> PromiseResult<Value> {
        (self.inner.body)(this, args)
    }

    /// Identity comparison
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

impl fmt::Debug for Function {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[Function: {}]", self.inner.name)
    }
}
