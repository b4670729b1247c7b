//! The node contract: `ExecutableNode` and the `ExecutionContext` interface
//! it runs against.
//!
//! `ExecutionContext` is a trait, not a concrete struct — executors never
//! hold a reference to the engine itself, only to this interface. The
//! concrete implementation (`engine::context::EngineExecutionContext`) owns
//! the state manager, registry, and middleware chain; nothing in this crate
//! knows any of that exists.

use async_trait::async_trait;
use serde_json::Value;
use std::time::Duration;

use crate::data::NodeData;
use crate::error::NodeError;
use crate::http::HttpPolicy;

/// Everything a node implementation may need from the running workflow,
/// short of reaching into another executor's internals.
#[async_trait]
pub trait ExecutionContext: Send + Sync {
    /// Id of the node currently executing, for error messages and logging.
    fn node_id(&self) -> &str;

    /// Resolved outputs of this node's predecessors, in edge declaration
    /// order. Empty for a source node.
    fn inputs(&self) -> &[Value];

    /// Convenience accessor for the first predecessor's output.
    fn input(&self) -> Option<&Value> {
        self.inputs().first()
    }

    // -- workflow variables --------------------------------------------
    fn get_variable(&self, name: &str) -> Option<Value>;
    fn set_variable(&self, name: &str, value: Value);

    /// Number of distinct variables currently set, for `VariableExecutor`
    /// to check against `max_variables` before creating a new one.
    fn variable_count(&self) -> usize {
        0
    }

    /// `MaxVariables` resource cap for this execution.
    fn max_variables(&self) -> usize {
        usize::MAX
    }

    // -- accumulator / counter ------------------------------------------
    fn get_accumulator(&self) -> Value;
    fn set_accumulator(&self, value: Value);
    fn get_counter(&self) -> f64;
    fn set_counter(&self, value: f64);

    // -- TTL cache --------------------------------------------------------
    fn cache_get(&self, key: &str) -> Option<Value>;
    fn cache_set(&self, key: &str, value: Value, ttl: Option<Duration>);
    fn cache_delete(&self, key: &str);

    // -- context constants (write-once) and variables (mutable) ----------
    fn context_constant_get(&self, name: &str) -> Option<Value>;
    fn context_constant_set(&self, name: &str, value: Value) -> Result<(), NodeError>;
    fn context_variable_get(&self, name: &str) -> Option<Value>;
    fn context_variable_set(&self, name: &str, value: Value);

    /// Output of an already-executed node, by id.
    fn node_result(&self, node_id: &str) -> Option<Value>;

    /// Replace every `{{ variable.NAME }}` / `{{ const.NAME }}` token in
    /// `template` with its current value, left verbatim when unresolved.
    fn interpolate(&self, template: &str) -> String;

    /// Charge one unit against the per-execution node-invocation cap.
    fn charge_node_execution(&self) -> Result<(), NodeError>;

    /// Charge one unit against the per-execution HTTP-call cap.
    fn charge_http_call(&self) -> Result<(), NodeError>;

    /// Outbound HTTP policy (SSRF guard, allowed domains, redirect limit).
    fn http_policy(&self) -> &HttpPolicy;

    /// Default cap used by `for_each`/`while_loop` when the node omits
    /// `max_iterations`.
    fn default_max_iterations(&self) -> usize;

    /// Default TTL used by `cache` nodes that omit `ttl`.
    fn default_cache_ttl(&self) -> Duration;

    /// Default attempt cap used by `retry` nodes that omit `max_attempts`.
    fn default_max_attempts(&self) -> u32 {
        3
    }

    /// Default backoff strategy used by `retry` nodes that omit
    /// `backoff_strategy` — one of `exponential`/`linear`/`constant`.
    fn default_backoff(&self) -> &str {
        "exponential"
    }

    /// Id of the workflow this execution belongs to, if any — used by
    /// rate-limit middleware to scope a per-workflow token bucket.
    fn workflow_id(&self) -> Option<&str> {
        None
    }

    /// Run another node's executor as a nested step (used by `retry`,
    /// `try_catch`, `timeout`). The implementation looks the executor up
    /// in the registry and runs it with this same context.
    async fn dispatch_child(&self, type_tag: &str, data: &NodeData) -> Result<Value, NodeError>;
}

/// A node type's behavior. One implementation per entry in the registry.
#[async_trait]
pub trait ExecutableNode: Send + Sync {
    /// The type tag this executor answers to — must match the key it is
    /// registered under.
    fn type_tag(&self) -> &'static str;

    /// Structural validation run by `ValidationMiddleware` before dispatch,
    /// separate from whatever `execute` checks once it actually has inputs
    /// to look at. Most executors have nothing to add beyond what their
    /// `NodeData` variant's own deserialization already enforced; those
    /// leave this at the default no-op.
    fn validate(&self, _data: &NodeData) -> Result<(), NodeError> {
        Ok(())
    }

    async fn execute(&self, data: &NodeData, ctx: &dyn ExecutionContext) -> Result<Value, NodeError>;
}
