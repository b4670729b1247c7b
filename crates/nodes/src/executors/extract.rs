//! `extract` — pull one field (dotted path) or several fields out of a
//! map/array input.

use async_trait::async_trait;
use serde_json::{Map, Value};

use crate::data::NodeData;
use crate::error::NodeError;
use crate::traits::{ExecutableNode, ExecutionContext};

/// Walk a `.`-separated path through nested objects and arrays. An array
/// segment is matched by its numeric index; anything else is looked up as
/// an object key.
fn dotted_get<'a>(value: &'a Value, path: &str) -> Option<&'a Value> {
    path.split('.').try_fold(value, |current, segment| match current {
        Value::Object(obj) => obj.get(segment),
        Value::Array(arr) => segment.parse::<usize>().ok().and_then(|i| arr.get(i)),
        _ => None,
    })
}

pub struct ExtractExecutor;

#[async_trait]
impl ExecutableNode for ExtractExecutor {
    fn type_tag(&self) -> &'static str {
        "extract"
    }

    async fn execute(&self, data: &NodeData, ctx: &dyn ExecutionContext) -> Result<Value, NodeError> {
        let d = match data {
            NodeData::Extract(d) => d,
            _ => return Err(NodeError::BadConfig("extract executor received mismatched data".into())),
        };

        let input = ctx
            .input()
            .ok_or_else(|| NodeError::BadConfig("extract requires an input".into()))?;

        if let Some(field) = &d.field {
            return dotted_get(input, field)
                .cloned()
                .ok_or_else(|| NodeError::NotFound(format!("path '{field}' not present in input")));
        }

        if let Some(fields) = &d.fields {
            let mut out = Map::new();
            for field in fields {
                let v = dotted_get(input, field)
                    .cloned()
                    .ok_or_else(|| NodeError::NotFound(format!("path '{field}' not present in input")))?;
                out.insert(field.clone(), v);
            }
            return Ok(Value::Object(out));
        }

        Err(NodeError::BadConfig("extract requires 'field' or 'fields'".into()))
    }
}
