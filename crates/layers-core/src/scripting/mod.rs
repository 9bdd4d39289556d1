//! Scripting host used to evaluate layer rules.
//!
//! The host is engine-agnostic: a [`ScriptingManager`] hands out engines by
//! name and collects [`GlobalMethodProvider`]s. An engine binds those
//! methods plus the request bindings into a [`ScriptScope`] once per
//! request and evaluates expression text against it.
//!
//! Results are plain [`ScriptValue`]s. Turning one into a boolean goes
//! through [`ScriptValue::to_bool`] and nowhere else.

mod error;
pub mod expr;
pub mod methods;

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

pub use error::ScriptError;
pub use expr::ExpressionEngine;
pub use methods::{DefaultLayerMethods, RequestBindings};

/// Value produced by a script.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ScriptValue {
    Null,
    Bool(bool),
    Number(f64),
    Text(String),
}

impl ScriptValue {
    /// Truthiness conversion shared by every rule evaluation.
    ///
    /// - `Bool` passes through
    /// - `Number` is true when non-zero (NaN is false)
    /// - `Text` is true when non-empty
    /// - `Null` is false
    pub fn to_bool(&self) -> bool {
        match self {
            ScriptValue::Null => false,
            ScriptValue::Bool(b) => *b,
            ScriptValue::Number(n) => *n != 0.0 && !n.is_nan(),
            ScriptValue::Text(s) => !s.is_empty(),
        }
    }

    /// Name of the value's type, for error messages.
    pub fn type_name(&self) -> &'static str {
        match self {
            ScriptValue::Null => "null",
            ScriptValue::Bool(_) => "boolean",
            ScriptValue::Number(_) => "number",
            ScriptValue::Text(_) => "string",
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            ScriptValue::Text(s) => Some(s),
            _ => None,
        }
    }
}

impl fmt::Display for ScriptValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScriptValue::Null => write!(f, "null"),
            ScriptValue::Bool(b) => write!(f, "{b}"),
            ScriptValue::Number(n) => write!(f, "{n}"),
            ScriptValue::Text(s) => write!(f, "{s}"),
        }
    }
}

impl From<bool> for ScriptValue {
    fn from(value: bool) -> Self {
        ScriptValue::Bool(value)
    }
}

impl From<f64> for ScriptValue {
    fn from(value: f64) -> Self {
        ScriptValue::Number(value)
    }
}

impl From<&str> for ScriptValue {
    fn from(value: &str) -> Self {
        ScriptValue::Text(value.to_string())
    }
}

impl From<String> for ScriptValue {
    fn from(value: String) -> Self {
        ScriptValue::Text(value)
    }
}

type MethodFn =
    dyn Fn(&RequestBindings, &[ScriptValue]) -> Result<ScriptValue, ScriptError> + Send + Sync;

/// A host method callable from scripts.
#[derive(Clone)]
pub struct GlobalMethod {
    pub name: String,
    method: Arc<MethodFn>,
}

impl GlobalMethod {
    pub fn new<F>(name: impl Into<String>, method: F) -> Self
    where
        F: Fn(&RequestBindings, &[ScriptValue]) -> Result<ScriptValue, ScriptError>
            + Send
            + Sync
            + 'static,
    {
        Self {
            name: name.into(),
            method: Arc::new(method),
        }
    }

    pub fn invoke(
        &self,
        bindings: &RequestBindings,
        args: &[ScriptValue],
    ) -> Result<ScriptValue, ScriptError> {
        (self.method)(bindings, args)
    }
}

impl fmt::Debug for GlobalMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GlobalMethod")
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}

/// Source of host methods exposed to every scope.
pub trait GlobalMethodProvider: Send + Sync {
    fn methods(&self) -> Vec<GlobalMethod>;
}

/// Methods and request bindings visible to one request's scripts.
#[derive(Debug, Clone)]
pub struct ScriptScope {
    methods: HashMap<String, GlobalMethod>,
    bindings: Arc<RequestBindings>,
}

impl ScriptScope {
    /// Bind methods to a request. A later method with the same name wins.
    pub fn new(methods: impl IntoIterator<Item = GlobalMethod>, bindings: Arc<RequestBindings>) -> Self {
        Self {
            methods: methods
                .into_iter()
                .map(|m| (m.name.clone(), m))
                .collect(),
            bindings,
        }
    }

    pub fn method(&self, name: &str) -> Option<&GlobalMethod> {
        self.methods.get(name)
    }

    pub fn bindings(&self) -> &RequestBindings {
        &self.bindings
    }

    /// Call a bound method by name.
    pub fn call(&self, name: &str, args: &[ScriptValue]) -> Result<ScriptValue, ScriptError> {
        let method = self
            .method(name)
            .ok_or_else(|| ScriptError::UnknownMethod(name.to_string()))?;
        method.invoke(&self.bindings, args)
    }
}

/// An embedded expression language.
pub trait ScriptingEngine: Send + Sync {
    /// Name the engine is registered under.
    fn prefix(&self) -> &str;

    /// Bind host methods and request bindings into a reusable scope.
    fn create_scope(
        &self,
        methods: Vec<GlobalMethod>,
        bindings: Arc<RequestBindings>,
    ) -> ScriptScope {
        ScriptScope::new(methods, bindings)
    }

    /// Evaluate `script` in `scope`.
    fn evaluate(&self, scope: &ScriptScope, script: &str) -> Result<ScriptValue, ScriptError>;

    /// Check `script` without evaluating it. Engines that cannot tell
    /// before running accept everything.
    fn validate(&self, _script: &str) -> Result<(), ScriptError> {
        Ok(())
    }
}

/// Registry of engines and global method providers.
pub trait ScriptingManager: Send + Sync {
    fn get_engine(&self, prefix: &str) -> Option<Arc<dyn ScriptingEngine>>;

    fn global_method_providers(&self) -> &[Arc<dyn GlobalMethodProvider>];

    /// Every method from every provider, in registration order.
    fn global_methods(&self) -> Vec<GlobalMethod> {
        self.global_method_providers()
            .iter()
            .flat_map(|p| p.methods())
            .collect()
    }
}

/// `ScriptingManager` backed by in-process registrations.
#[derive(Default)]
pub struct DefaultScriptingManager {
    engines: Vec<Arc<dyn ScriptingEngine>>,
    providers: Vec<Arc<dyn GlobalMethodProvider>>,
}

impl DefaultScriptingManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Manager with the expression engine and the default layer methods.
    pub fn with_defaults() -> Self {
        Self::new()
            .with_engine(Arc::new(ExpressionEngine::new()))
            .with_provider(Arc::new(DefaultLayerMethods))
    }

    pub fn with_engine(mut self, engine: Arc<dyn ScriptingEngine>) -> Self {
        self.engines.push(engine);
        self
    }

    pub fn with_provider(mut self, provider: Arc<dyn GlobalMethodProvider>) -> Self {
        self.providers.push(provider);
        self
    }
}

impl ScriptingManager for DefaultScriptingManager {
    fn get_engine(&self, prefix: &str) -> Option<Arc<dyn ScriptingEngine>> {
        self.engines.iter().find(|e| e.prefix() == prefix).cloned()
    }

    fn global_method_providers(&self) -> &[Arc<dyn GlobalMethodProvider>] {
        &self.providers
    }
}
