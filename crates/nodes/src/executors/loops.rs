//! `for_each` / `while_loop` — metadata-emitting loop control nodes.
//!
//! Neither executor iterates by itself: the engine's scheduler re-enters
//! the loop body based on the metadata returned here (`continue`, `items`,
//! `iteration_limit`), the same way `condition` reports a path rather than
//! branching itself.

use async_trait::async_trait;
use serde_json::{json, Value};

use super::predicate::eval_predicate;
use crate::data::NodeData;
use crate::error::NodeError;
use crate::traits::{ExecutableNode, ExecutionContext};

pub struct ForEachExecutor;

#[async_trait]
impl ExecutableNode for ForEachExecutor {
    fn type_tag(&self) -> &'static str {
        "for_each"
    }

    async fn execute(&self, data: &NodeData, ctx: &dyn ExecutionContext) -> Result<Value, NodeError> {
        let d = match data {
            NodeData::ForEach(d) => d,
            _ => return Err(NodeError::BadConfig("for_each executor received mismatched data".into())),
        };

        let items = match ctx.input() {
            Some(Value::Array(items)) => items.clone(),
            Some(other) => return Err(NodeError::TypeMismatch(format!("for_each requires an array input, got {other}"))),
            None => return Err(NodeError::BadConfig("for_each requires an input".into())),
        };

        let limit = d.max_iterations.unwrap_or_else(|| ctx.default_max_iterations());
        if items.len() > limit {
            return Err(NodeError::LimitExceeded(format!(
                "for_each input has {} items, exceeding iteration_limit {limit}",
                items.len()
            )));
        }

        Ok(json!({
            "items": items,
            "count": items.len(),
            "iteration_limit": limit,
        }))
    }
}

pub struct WhileLoopExecutor;

#[async_trait]
impl ExecutableNode for WhileLoopExecutor {
    fn type_tag(&self) -> &'static str {
        "while_loop"
    }

    async fn execute(&self, data: &NodeData, ctx: &dyn ExecutionContext) -> Result<Value, NodeError> {
        let d = match data {
            NodeData::WhileLoop(d) => d,
            _ => return Err(NodeError::BadConfig("while_loop executor received mismatched data".into())),
        };

        let limit = d.max_iterations.unwrap_or_else(|| ctx.default_max_iterations());

        let counter_key = format!("while_loop:{}:iterations", ctx.node_id());
        let iterations = ctx.context_variable_get(&counter_key).and_then(|v| v.as_u64()).unwrap_or(0) + 1;
        ctx.context_variable_set(&counter_key, json!(iterations));

        let should_continue = eval_predicate(&d.condition, ctx)?;

        if should_continue && iterations as usize >= limit {
            return Err(NodeError::LimitExceeded(format!(
                "while_loop '{}' reached max_iterations ({limit}) with condition still true",
                ctx.node_id()
            )));
        }

        Ok(json!({
            "continue": should_continue,
            "iterations": iterations,
        }))
    }
}
