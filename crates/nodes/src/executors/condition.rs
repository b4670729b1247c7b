//! `condition` and `filter` — boolean gates over the resolved predicate
//! string. `condition` reports which labeled path to take; `filter` simply
//! reports pass/fail against the current input.

use async_trait::async_trait;
use serde_json::{json, Value};

use super::predicate::eval_predicate;
use crate::data::NodeData;
use crate::error::NodeError;
use crate::traits::{ExecutableNode, ExecutionContext};

pub struct ConditionExecutor;

#[async_trait]
impl ExecutableNode for ConditionExecutor {
    fn type_tag(&self) -> &'static str {
        "condition"
    }

    async fn execute(&self, data: &NodeData, ctx: &dyn ExecutionContext) -> Result<Value, NodeError> {
        let d = match data {
            NodeData::Condition(d) => d,
            _ => return Err(NodeError::BadConfig("condition executor received mismatched data".into())),
        };
        let condition_met = eval_predicate(&d.condition, ctx)?;
        Ok(json!({
            "condition_met": condition_met,
            "value": ctx.input().cloned().unwrap_or(Value::Null),
        }))
    }
}

pub struct FilterExecutor;

#[async_trait]
impl ExecutableNode for FilterExecutor {
    fn type_tag(&self) -> &'static str {
        "filter"
    }

    async fn execute(&self, data: &NodeData, ctx: &dyn ExecutionContext) -> Result<Value, NodeError> {
        let d = match data {
            NodeData::Filter(d) => d,
            _ => return Err(NodeError::BadConfig("filter executor received mismatched data".into())),
        };
        let passed = eval_predicate(&d.condition, ctx)?;
        Ok(json!({
            "passed": passed,
            "value": ctx.input().cloned().unwrap_or(Value::Null),
        }))
    }
}
