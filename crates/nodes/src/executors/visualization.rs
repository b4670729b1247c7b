//! `visualization` — a terminal, display-only node: passes its input
//! through wrapped as `{ "value": ... }`, the shape a rendering client
//! expects.

use async_trait::async_trait;
use serde_json::{json, Value};

use crate::data::NodeData;
use crate::error::NodeError;
use crate::traits::{ExecutableNode, ExecutionContext};

pub struct VisualizationExecutor;

#[async_trait]
impl ExecutableNode for VisualizationExecutor {
    fn type_tag(&self) -> &'static str {
        "visualization"
    }

    async fn execute(&self, data: &NodeData, ctx: &dyn ExecutionContext) -> Result<Value, NodeError> {
        match data {
            NodeData::Visualization(_) => {}
            _ => return Err(NodeError::BadConfig("visualization executor received mismatched data".into())),
        }
        Ok(json!({ "value": ctx.input().cloned().unwrap_or(Value::Null) }))
    }
}
