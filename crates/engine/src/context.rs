//! `EngineExecutionContext` — the concrete implementation of
//! `nodes::ExecutionContext`. Built fresh (cheaply — everything shared is
//! behind an `Arc`) for every node invocation.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::RwLock;
use regex::Regex;
use serde_json::Value;

use nodes::{ExecutionContext as NodesExecutionContext, HttpPolicy, NodeData, NodeError};

use crate::config::EngineConfig;
use crate::state::StateManager;

/// Per-execution counters shared by every node, used to enforce the
/// execution-wide resource caps in `EngineConfig`.
pub struct ExecutionCounters {
    node_executions: AtomicUsize,
    http_calls: AtomicUsize,
    max_node_executions: usize,
    max_http_calls: usize,
}

impl ExecutionCounters {
    pub fn new(max_node_executions: usize, max_http_calls: usize) -> Self {
        ExecutionCounters {
            node_executions: AtomicUsize::new(0),
            http_calls: AtomicUsize::new(0),
            max_node_executions,
            max_http_calls,
        }
    }
}

/// Shared, read-only-after-construction state every `EngineExecutionContext`
/// for a single execution points back to.
pub struct SharedExecutionState {
    pub state: StateManager,
    pub node_results: RwLock<HashMap<String, Value>>,
    pub registry: nodes::Registry,
    pub config: EngineConfig,
    pub counters: ExecutionCounters,
    pub workflow_id: Option<String>,
}

pub struct EngineExecutionContext {
    node_id: String,
    inputs: Vec<Value>,
    shared: Arc<SharedExecutionState>,
}

impl EngineExecutionContext {
    pub fn new(node_id: impl Into<String>, inputs: Vec<Value>, shared: Arc<SharedExecutionState>) -> Self {
        EngineExecutionContext { node_id: node_id.into(), inputs, shared }
    }

    pub fn record_result(&self, value: Value) {
        self.shared.node_results.write().insert(self.node_id.clone(), value);
    }
}

fn interpolate_template(template: &str, resolve: impl Fn(&str, &str) -> Option<String>) -> String {
    // `{{ namespace.NAME }}` — matched once per pass; unresolved names are
    // left verbatim.
    let re = Regex::new(r"\{\{\s*(\w+)\.(\w+)\s*\}\}").expect("static regex is valid");
    re.replace_all(template, |caps: &regex::Captures| {
        let namespace = &caps[1];
        let name = &caps[2];
        resolve(namespace, name).unwrap_or_else(|| caps[0].to_string())
    })
    .into_owned()
}

#[async_trait]
impl NodesExecutionContext for EngineExecutionContext {
    fn node_id(&self) -> &str {
        &self.node_id
    }

    fn inputs(&self) -> &[Value] {
        &self.inputs
    }

    fn get_variable(&self, name: &str) -> Option<Value> {
        self.shared.state.get_variable(name)
    }

    fn set_variable(&self, name: &str, value: Value) {
        self.shared.state.set_variable(name, value)
    }

    fn variable_count(&self) -> usize {
        self.shared.state.variable_count()
    }

    fn max_variables(&self) -> usize {
        self.shared.config.max_variables
    }

    fn get_accumulator(&self) -> Value {
        self.shared.state.get_accumulator()
    }

    fn set_accumulator(&self, value: Value) {
        self.shared.state.set_accumulator(value)
    }

    fn get_counter(&self) -> f64 {
        self.shared.state.get_counter()
    }

    fn set_counter(&self, value: f64) {
        self.shared.state.set_counter(value)
    }

    fn cache_get(&self, key: &str) -> Option<Value> {
        self.shared.state.cache_get(key)
    }

    fn cache_set(&self, key: &str, value: Value, ttl: Option<Duration>) {
        self.shared.state.cache_set(key, value, ttl)
    }

    fn cache_delete(&self, key: &str) {
        self.shared.state.cache_delete(key)
    }

    fn context_constant_get(&self, name: &str) -> Option<Value> {
        self.shared.state.context_constant_get(name)
    }

    fn context_constant_set(&self, name: &str, value: Value) -> Result<(), NodeError> {
        self.shared.state.context_constant_set(name, value)
    }

    fn context_variable_get(&self, name: &str) -> Option<Value> {
        self.shared.state.context_variable_get(name)
    }

    fn context_variable_set(&self, name: &str, value: Value) {
        self.shared.state.context_variable_set(name, value)
    }

    fn node_result(&self, node_id: &str) -> Option<Value> {
        self.shared.node_results.read().get(node_id).cloned()
    }

    fn interpolate(&self, template: &str) -> String {
        interpolate_template(template, |namespace, name| match namespace {
            "variable" => self.get_variable(name).map(|v| scalar_to_string(&v)),
            "const" => self.context_constant_get(name).map(|v| scalar_to_string(&v)),
            _ => None,
        })
    }

    fn charge_node_execution(&self) -> Result<(), NodeError> {
        let prev = self.shared.counters.node_executions.fetch_add(1, Ordering::Relaxed);
        if prev + 1 > self.shared.counters.max_node_executions {
            return Err(NodeError::LimitExceeded(format!(
                "execution exceeded max_node_executions ({})",
                self.shared.counters.max_node_executions
            )));
        }
        Ok(())
    }

    fn charge_http_call(&self) -> Result<(), NodeError> {
        let prev = self.shared.counters.http_calls.fetch_add(1, Ordering::Relaxed);
        if prev + 1 > self.shared.counters.max_http_calls {
            return Err(NodeError::LimitExceeded(format!(
                "execution exceeded max_http_calls_per_execution ({})",
                self.shared.counters.max_http_calls
            )));
        }
        Ok(())
    }

    fn http_policy(&self) -> &HttpPolicy {
        &self.shared.config.http_policy
    }

    fn default_max_iterations(&self) -> usize {
        self.shared.config.default_max_iterations
    }

    fn default_cache_ttl(&self) -> Duration {
        self.shared.config.default_cache_ttl
    }

    fn workflow_id(&self) -> Option<&str> {
        self.shared.workflow_id.as_deref()
    }

    async fn dispatch_child(&self, type_tag: &str, data: &NodeData) -> Result<Value, NodeError> {
        self.charge_node_execution()?;
        let executor = self
            .shared
            .registry
            .get(type_tag)
            .ok_or_else(|| NodeError::NotFound(format!("no executor registered for type '{type_tag}'")))?;
        executor.execute(data, self).await
    }
}

fn scalar_to_string(v: &Value) -> String {
    match v {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EngineConfig;

    fn shared() -> Arc<SharedExecutionState> {
        Arc::new(SharedExecutionState {
            state: StateManager::new(1000),
            node_results: RwLock::new(HashMap::new()),
            registry: nodes::build_registry(),
            config: EngineConfig::default(),
            counters: ExecutionCounters::new(1000, 1000),
            workflow_id: None,
        })
    }

    #[test]
    fn interpolates_known_variable() {
        let shared = shared();
        shared.state.set_variable("name", Value::String("alice".into()));
        let ctx = EngineExecutionContext::new("n1", vec![], shared);
        assert_eq!(ctx.interpolate("hello {{ variable.name }}"), "hello alice");
    }

    #[test]
    fn leaves_unresolved_tokens_verbatim() {
        let ctx = EngineExecutionContext::new("n1", vec![], shared());
        assert_eq!(ctx.interpolate("hello {{ variable.missing }}"), "hello {{ variable.missing }}");
    }

    #[test]
    fn node_execution_cap_trips() {
        let shared = Arc::new(SharedExecutionState {
            state: StateManager::new(10),
            node_results: RwLock::new(HashMap::new()),
            registry: nodes::build_registry(),
            config: EngineConfig::default(),
            counters: ExecutionCounters::new(1, 10),
            workflow_id: None,
        });
        let ctx = EngineExecutionContext::new("n1", vec![], shared);
        assert!(ctx.charge_node_execution().is_ok());
        assert!(ctx.charge_node_execution().is_err());
    }
}
