//! Runs the executor's own `validate(data)` hook, then rejects obviously
//! malformed input before it reaches a node — NaN/infinite numbers, which
//! would otherwise propagate silently through arithmetic and comparisons
//! — and enforces the shape-level resource caps (`MaxStringLength`,
//! `MaxArrayLength`, `MaxContextDepth`) against every input value.

use async_trait::async_trait;
use serde_json::Value;

use nodes::{ExecutionContext, NodeData, NodeError};

use super::{Middleware, Next};

pub struct ValidationMiddleware {
    pub max_string_length: usize,
    pub max_array_length: usize,
    pub max_context_depth: usize,
}

fn has_non_finite(v: &Value) -> bool {
    match v {
        Value::Number(n) => n.as_f64().map(|f| !f.is_finite()).unwrap_or(false),
        Value::Array(items) => items.iter().any(has_non_finite),
        Value::Object(map) => map.values().any(has_non_finite),
        _ => false,
    }
}

fn check_shape(v: &Value, depth: usize, mw: &ValidationMiddleware) -> Result<(), String> {
    if depth > mw.max_context_depth {
        return Err(format!("nesting depth exceeds cap of {}", mw.max_context_depth));
    }
    match v {
        Value::String(s) if s.len() > mw.max_string_length => {
            Err(format!("string of {} bytes exceeds cap of {}", s.len(), mw.max_string_length))
        }
        Value::Array(items) => {
            if items.len() > mw.max_array_length {
                return Err(format!("array of {} items exceeds cap of {}", items.len(), mw.max_array_length));
            }
            items.iter().try_for_each(|item| check_shape(item, depth + 1, mw))
        }
        Value::Object(map) => map.values().try_for_each(|item| check_shape(item, depth + 1, mw)),
        _ => Ok(()),
    }
}

#[async_trait]
impl Middleware for ValidationMiddleware {
    async fn handle<'a>(
        &'a self,
        node_id: &'a str,
        data: &'a NodeData,
        ctx: &'a dyn ExecutionContext,
        next: Next<'a>,
    ) -> Result<Value, NodeError> {
        next.executor().validate(data).map_err(|e| {
            NodeError::BadConfig(format!("node '{node_id}' failed validation: {}", e.message()))
        })?;

        for input in ctx.inputs() {
            if has_non_finite(input) {
                return Err(NodeError::BadConfig(format!(
                    "node '{node_id}' received a NaN/infinite number in its input"
                )));
            }
            check_shape(input, 0, self)
                .map_err(|msg| NodeError::LimitExceeded(format!("node '{node_id}' input {msg}")))?;
        }
        next.run(node_id, data, ctx).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mw() -> ValidationMiddleware {
        ValidationMiddleware { max_string_length: 8, max_array_length: 4, max_context_depth: 2 }
    }

    #[test]
    fn string_over_cap_is_rejected() {
        assert!(check_shape(&Value::String("way too long".into()), 0, &mw()).is_err());
    }

    #[test]
    fn array_over_cap_is_rejected() {
        let arr = Value::Array((0..5).map(Value::from).collect());
        assert!(check_shape(&arr, 0, &mw()).is_err());
    }

    #[test]
    fn nesting_over_cap_is_rejected() {
        let nested = serde_json::json!({"a": {"b": {"c": 1}}});
        assert!(check_shape(&nested, 0, &mw()).is_err());
    }

    #[test]
    fn shallow_small_value_passes() {
        assert!(check_shape(&serde_json::json!({"a": [1, 2]}), 0, &mw()).is_ok());
    }
}
