//! `delay` — pause execution for a fixed duration, then pass the input
//! through unchanged.

use async_trait::async_trait;
use serde_json::Value;

use crate::data::NodeData;
use crate::duration::parse_duration;
use crate::error::NodeError;
use crate::traits::{ExecutableNode, ExecutionContext};

pub struct DelayExecutor;

#[async_trait]
impl ExecutableNode for DelayExecutor {
    fn type_tag(&self) -> &'static str {
        "delay"
    }

    async fn execute(&self, data: &NodeData, ctx: &dyn ExecutionContext) -> Result<Value, NodeError> {
        let d = match data {
            NodeData::Delay(d) => d,
            _ => return Err(NodeError::BadConfig("delay executor received mismatched data".into())),
        };
        let wait = parse_duration(&d.duration)?;
        tokio::time::sleep(wait).await;
        Ok(ctx.input().cloned().unwrap_or(Value::Null))
    }
}
