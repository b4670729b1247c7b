//! Numeric coercion helpers shared by `operation`, `accumulator`, `counter`.

use serde_json::Value;

use crate::error::NodeError;

pub fn as_f64(v: &Value) -> Result<f64, NodeError> {
    match v {
        Value::Number(n) => n
            .as_f64()
            .ok_or_else(|| NodeError::TypeMismatch(format!("number '{n}' has no f64 representation"))),
        Value::String(s) => s
            .parse::<f64>()
            .map_err(|_| NodeError::TypeMismatch(format!("'{s}' is not numeric"))),
        other => Err(NodeError::TypeMismatch(format!("expected a number, got {other}"))),
    }
}
