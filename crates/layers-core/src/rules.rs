//! Per-request layer rule evaluation.
//!
//! A [`RuleEvaluator`] lives for one request. It owns the bound script
//! scope and remembers each layer's result by layer name, so a layer shared
//! by many widgets reaches the scripting engine once.

use std::collections::HashMap;
use std::sync::Arc;

use layers_state::Layer;

use crate::error::{LayerError, Result};
use crate::metrics::{Counter, METRICS};
use crate::obs::emit_rule_evaluated;
use crate::scripting::{RequestBindings, ScriptScope, ScriptingEngine, ScriptingManager};

/// Request-scoped, memoizing rule evaluator.
pub struct RuleEvaluator {
    engine: Arc<dyn ScriptingEngine>,
    scope: ScriptScope,
    results: HashMap<String, bool>,
    evaluations: u64,
}

impl RuleEvaluator {
    pub fn new(engine: Arc<dyn ScriptingEngine>, scope: ScriptScope) -> Self {
        Self {
            engine,
            scope,
            results: HashMap::new(),
            evaluations: 0,
        }
    }

    /// Resolve `engine_name` and bind every global method to `bindings`.
    pub fn for_request(
        manager: &dyn ScriptingManager,
        engine_name: &str,
        bindings: Arc<RequestBindings>,
    ) -> Result<Self> {
        let engine = manager
            .get_engine(engine_name)
            .ok_or_else(|| LayerError::ScriptingEngineNotFound(engine_name.to_string()))?;
        let scope = engine.create_scope(manager.global_methods(), bindings);
        Ok(Self::new(engine, scope))
    }

    /// Whether `layer` is active for this request.
    ///
    /// A missing or blank rule is `false` without touching the engine.
    /// Engine faults propagate; they are never read as `false`.
    pub fn evaluate(&mut self, layer: &Layer) -> Result<bool> {
        if let Some(&cached) = self.results.get(&layer.name) {
            return Ok(cached);
        }

        let display = match layer.rule_text() {
            None => false,
            Some(rule) => {
                self.evaluations += 1;
                METRICS.inc(Counter::RuleEvaluations);
                let value = self
                    .engine
                    .evaluate(&self.scope, rule)
                    .map_err(|source| LayerError::Script {
                        layer: layer.name.clone(),
                        source,
                    })?;
                value.to_bool()
            }
        };

        emit_rule_evaluated(&layer.name, display);
        self.results.insert(layer.name.clone(), display);
        Ok(display)
    }

    /// Number of times the engine was invoked.
    pub fn evaluations(&self) -> u64 {
        self.evaluations
    }

    /// Cached result for a layer, if it was evaluated already.
    pub fn cached(&self, layer_name: &str) -> Option<bool> {
        self.results.get(layer_name).copied()
    }
}
