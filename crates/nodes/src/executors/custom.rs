//! `custom` — fallback for any `type` the registry doesn't recognize.
//! Echoes its raw config merged with the current input so an unfamiliar
//! node still produces a traceable output rather than aborting the run.

use async_trait::async_trait;
use serde_json::Value;

use crate::data::NodeData;
use crate::error::NodeError;
use crate::traits::{ExecutableNode, ExecutionContext};

pub struct CustomExecutor;

#[async_trait]
impl ExecutableNode for CustomExecutor {
    fn type_tag(&self) -> &'static str {
        "custom"
    }

    async fn execute(&self, data: &NodeData, ctx: &dyn ExecutionContext) -> Result<Value, NodeError> {
        let fields = match data {
            NodeData::Custom(fields) => fields.clone(),
            _ => return Err(NodeError::BadConfig("custom executor received mismatched data".into())),
        };
        let mut out = fields;
        out.insert("input".into(), ctx.input().cloned().unwrap_or(Value::Null));
        Ok(Value::Object(out))
    }
}
