//! `counter` — increment/decrement/reset/read the workflow-wide counter.

use async_trait::async_trait;
use serde_json::{json, Value};

use crate::data::NodeData;
use crate::error::NodeError;
use crate::traits::{ExecutableNode, ExecutionContext};

pub struct CounterExecutor;

#[async_trait]
impl ExecutableNode for CounterExecutor {
    fn type_tag(&self) -> &'static str {
        "counter"
    }

    async fn execute(&self, data: &NodeData, ctx: &dyn ExecutionContext) -> Result<Value, NodeError> {
        let d = match data {
            NodeData::Counter(d) => d,
            _ => return Err(NodeError::BadConfig("counter executor received mismatched data".into())),
        };
        let delta = d.delta.unwrap_or(1.0);

        let value = match d.counter_op.as_str() {
            "get" => ctx.get_counter(),
            "increment" => {
                let v = ctx.get_counter() + delta;
                ctx.set_counter(v);
                v
            }
            "decrement" => {
                let v = ctx.get_counter() - delta;
                ctx.set_counter(v);
                v
            }
            "reset" => {
                ctx.set_counter(0.0);
                0.0
            }
            other => return Err(NodeError::BadConfig(format!("unknown counter_op '{other}'"))),
        };
        Ok(json!(value))
    }
}
