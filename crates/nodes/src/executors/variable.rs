//! `variable` — read or write a named workflow variable.

use async_trait::async_trait;
use serde_json::{json, Value};

use crate::data::NodeData;
use crate::error::NodeError;
use crate::traits::{ExecutableNode, ExecutionContext};

pub struct VariableExecutor;

#[async_trait]
impl ExecutableNode for VariableExecutor {
    fn type_tag(&self) -> &'static str {
        "variable"
    }

    async fn execute(&self, data: &NodeData, ctx: &dyn ExecutionContext) -> Result<Value, NodeError> {
        let d = match data {
            NodeData::Variable(d) => d,
            _ => return Err(NodeError::BadConfig("variable executor received mismatched data".into())),
        };

        match d.var_op.as_str() {
            "get" => ctx
                .get_variable(&d.var_name)
                .ok_or_else(|| NodeError::NotFound(format!("variable '{}' is not set", d.var_name))),
            "set" => {
                if ctx.get_variable(&d.var_name).is_none() && ctx.variable_count() >= ctx.max_variables() {
                    return Err(NodeError::LimitExceeded(format!(
                        "variable cap of {} reached, cannot create '{}'",
                        ctx.max_variables(),
                        d.var_name
                    )));
                }
                let value = ctx.input().cloned().unwrap_or(Value::Null);
                ctx.set_variable(&d.var_name, value.clone());
                Ok(json!({ "name": d.var_name, "value": value }))
            }
            other => Err(NodeError::BadConfig(format!("unknown var_op '{other}'"))),
        }
    }
}
