//! `operation` — arithmetic over every resolved predecessor input, folded
//! left to right.

use async_trait::async_trait;
use serde_json::{json, Value};

use super::numeric::as_f64;
use crate::data::NodeData;
use crate::error::NodeError;
use crate::traits::{ExecutableNode, ExecutionContext};

pub struct OperationExecutor;

#[async_trait]
impl ExecutableNode for OperationExecutor {
    fn type_tag(&self) -> &'static str {
        "operation"
    }

    async fn execute(&self, data: &NodeData, ctx: &dyn ExecutionContext) -> Result<Value, NodeError> {
        let op = match data {
            NodeData::Operation(d) => d.op.as_str(),
            _ => return Err(NodeError::BadConfig("operation executor received mismatched data".into())),
        };

        let operands: Result<Vec<f64>, NodeError> = ctx.inputs().iter().map(as_f64).collect();
        let operands = operands?;
        if operands.len() < 2 {
            return Err(NodeError::BadConfig(format!(
                "operation '{op}' needs at least 2 numeric inputs, got {}",
                operands.len()
            )));
        }

        let mut acc = operands[0];
        for &rhs in &operands[1..] {
            acc = apply(op, acc, rhs)?;
        }
        Ok(json!(acc))
    }
}

fn apply(op: &str, lhs: f64, rhs: f64) -> Result<f64, NodeError> {
    match op {
        "add" => Ok(lhs + rhs),
        "subtract" => Ok(lhs - rhs),
        "multiply" => Ok(lhs * rhs),
        "divide" => {
            if rhs == 0.0 {
                Err(NodeError::Arith("division by zero".into()))
            } else {
                Ok(lhs / rhs)
            }
        }
        "modulo" => {
            if rhs == 0.0 {
                Err(NodeError::Arith("modulo by zero".into()))
            } else {
                Ok(lhs % rhs)
            }
        }
        "power" => {
            let result = lhs.powf(rhs);
            if !result.is_finite() {
                Err(NodeError::Arith(format!("{lhs} ** {rhs} overflowed")))
            } else {
                Ok(result)
            }
        }
        other => Err(NodeError::BadConfig(format!("unknown operation '{other}'"))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn divide_by_zero_is_arith_error() {
        let err = apply("divide", 1.0, 0.0).unwrap_err();
        assert_eq!(err.kind(), crate::error::ErrKind::Arith);
    }

    #[test]
    fn folds_three_operands() {
        assert_eq!(apply("add", apply("add", 1.0, 2.0).unwrap(), 3.0).unwrap(), 6.0);
    }
}
