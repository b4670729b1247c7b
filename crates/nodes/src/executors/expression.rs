//! `expression` / `reduce` — a minimal arithmetic fold, inferred when a node
//! carries an `expression` field with no companion operator/condition
//! fields. `reduce` is the same executor seeded with `initial_value`.

use async_trait::async_trait;
use serde_json::{json, Value};

use super::numeric::as_f64;
use crate::data::NodeData;
use crate::error::NodeError;
use crate::traits::{ExecutableNode, ExecutionContext};

pub struct ExpressionExecutor;

#[async_trait]
impl ExecutableNode for ExpressionExecutor {
    fn type_tag(&self) -> &'static str {
        "expression"
    }

    async fn execute(&self, data: &NodeData, ctx: &dyn ExecutionContext) -> Result<Value, NodeError> {
        let d = match data {
            NodeData::Expression(d) => d,
            _ => return Err(NodeError::BadConfig("expression executor received mismatched data".into())),
        };

        let op = ctx.interpolate(&d.expression);
        let op = op.trim();

        let mut operands: Vec<f64> = ctx.inputs().iter().map(as_f64).collect::<Result<_, _>>()?;
        let mut acc = if let Some(initial) = &d.initial_value {
            as_f64(initial)?
        } else if !operands.is_empty() {
            operands.remove(0)
        } else {
            return Err(NodeError::BadConfig("expression has no initial_value and no inputs".into()));
        };

        for rhs in operands {
            acc = fold(op, acc, rhs)?;
        }
        Ok(json!(acc))
    }
}

fn fold(op: &str, lhs: f64, rhs: f64) -> Result<f64, NodeError> {
    match op {
        "+" => Ok(lhs + rhs),
        "-" => Ok(lhs - rhs),
        "*" => Ok(lhs * rhs),
        "/" => {
            if rhs == 0.0 {
                Err(NodeError::Arith("division by zero".into()))
            } else {
                Ok(lhs / rhs)
            }
        }
        "%" => {
            if rhs == 0.0 {
                Err(NodeError::Arith("modulo by zero".into()))
            } else {
                Ok(lhs % rhs)
            }
        }
        "max" => Ok(lhs.max(rhs)),
        "min" => Ok(lhs.min(rhs)),
        other => Err(NodeError::BadConfig(format!("unsupported expression operator '{other}'"))),
    }
}
