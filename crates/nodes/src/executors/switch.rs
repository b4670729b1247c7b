//! `switch` — match the input against a list of cases, in order, falling
//! back to `default_path`.

use async_trait::async_trait;
use serde_json::{json, Value};

use super::predicate::eval_predicate;
use crate::data::NodeData;
use crate::error::NodeError;
use crate::traits::{ExecutableNode, ExecutionContext};

pub struct SwitchExecutor;

#[async_trait]
impl ExecutableNode for SwitchExecutor {
    fn type_tag(&self) -> &'static str {
        "switch"
    }

    fn validate(&self, data: &NodeData) -> Result<(), NodeError> {
        match data {
            NodeData::Switch(d) if d.cases.is_empty() => {
                Err(NodeError::BadConfig("switch node declares no cases".into()))
            }
            NodeData::Switch(_) => Ok(()),
            _ => Err(NodeError::BadConfig("switch executor received mismatched data".into())),
        }
    }

    async fn execute(&self, data: &NodeData, ctx: &dyn ExecutionContext) -> Result<Value, NodeError> {
        let d = match data {
            NodeData::Switch(d) => d,
            _ => return Err(NodeError::BadConfig("switch executor received mismatched data".into())),
        };
        let input = ctx.input().cloned().unwrap_or(Value::Null);

        for case in &d.cases {
            let matched = if let Some(when) = &case.when {
                eval_predicate(when, ctx)?
            } else if let Some(value) = &case.value {
                value == &input
            } else {
                false
            };
            if matched {
                let descriptor = case
                    .value
                    .clone()
                    .or_else(|| case.when.clone().map(Value::String))
                    .unwrap_or(Value::Null);
                return Ok(json!({
                    "value": input,
                    "matched": true,
                    "case": descriptor,
                    "output_path": case.output_path,
                }));
            }
        }

        Ok(json!({
            "value": input,
            "matched": false,
            "output_path": d.default_path,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::SwitchData;

    #[test]
    fn validate_rejects_empty_case_list() {
        let data = NodeData::Switch(SwitchData { cases: vec![], default_path: None });
        assert!(SwitchExecutor.validate(&data).is_err());
    }
}
