//! `transform` — reshape the input value: `to_array`, `to_object`,
//! `flatten`, `stringify`, `parse_json`.

use async_trait::async_trait;
use serde_json::{json, Value};

use crate::data::NodeData;
use crate::error::NodeError;
use crate::traits::{ExecutableNode, ExecutionContext};

pub struct TransformExecutor;

#[async_trait]
impl ExecutableNode for TransformExecutor {
    fn type_tag(&self) -> &'static str {
        "transform"
    }

    async fn execute(&self, data: &NodeData, ctx: &dyn ExecutionContext) -> Result<Value, NodeError> {
        let d = match data {
            NodeData::Transform(d) => d,
            _ => return Err(NodeError::BadConfig("transform executor received mismatched data".into())),
        };
        let input = ctx
            .input()
            .cloned()
            .ok_or_else(|| NodeError::BadConfig("transform requires an input".into()))?;

        match d.transform_type.as_str() {
            "to_array" => Ok(if input.is_array() { input } else { json!([input]) }),
            "to_object" => Ok(json!({ "value": input })),
            "flatten" => {
                let arr = input
                    .as_array()
                    .ok_or_else(|| NodeError::TypeMismatch("flatten requires an array input".into()))?;
                let mut out = Vec::new();
                for item in arr {
                    match item.as_array() {
                        Some(inner) => out.extend(inner.iter().cloned()),
                        None => out.push(item.clone()),
                    }
                }
                Ok(Value::Array(out))
            }
            "stringify" => Ok(json!(input.to_string())),
            "parse_json" => {
                let s = input
                    .as_str()
                    .ok_or_else(|| NodeError::TypeMismatch("parse_json requires a string input".into()))?;
                serde_json::from_str(s)
                    .map_err(|e| NodeError::TypeMismatch(format!("input is not valid JSON: {e}")))
            }
            other => Err(NodeError::BadConfig(format!("unknown transform_type '{other}'"))),
        }
    }
}
