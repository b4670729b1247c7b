//! `context_variable` / `context_constant` — seed the execution context
//! with named values, either as an ordinary mutable variable or a
//! write-once constant.

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use serde_json::{json, Value};

use crate::data::{ContextEntry, ContextValueType, ContextVariableData, NodeData};
use crate::error::NodeError;
use crate::traits::{ExecutableNode, ExecutionContext};

fn coerce(entry: &ContextEntry) -> Result<Value, NodeError> {
    match entry.r#type {
        ContextValueType::Null => Ok(Value::Null),
        ContextValueType::String => Ok(Value::String(match &entry.value {
            Value::String(s) => s.clone(),
            other => other.to_string(),
        })),
        ContextValueType::Number => {
            let n = match &entry.value {
                Value::Number(n) => n.as_f64().unwrap_or(0.0),
                Value::String(s) => s
                    .parse::<f64>()
                    .map_err(|_| NodeError::TypeMismatch(format!("'{s}' is not numeric for '{}'", entry.name)))?,
                other => return Err(NodeError::TypeMismatch(format!("cannot coerce {other} to number"))),
            };
            Ok(json!(n))
        }
        ContextValueType::Boolean => {
            let b = match &entry.value {
                Value::Bool(b) => *b,
                Value::String(s) if s == "true" => true,
                Value::String(s) if s == "false" => false,
                Value::Number(n) => n
                    .as_f64()
                    .map(|f| f != 0.0)
                    .ok_or_else(|| NodeError::TypeMismatch(format!("non-finite number for boolean coercion of '{}'", entry.name)))?,
                other => return Err(NodeError::TypeMismatch(format!("cannot coerce {other} to boolean"))),
            };
            Ok(json!(b))
        }
        ContextValueType::TimeString => match &entry.value {
            Value::String(s) => {
                DateTime::parse_from_rfc3339(s)
                    .map_err(|e| NodeError::BadConfig(format!("'{s}' is not a valid RFC3339 time_string: {e}")))?;
                Ok(Value::String(s.clone()))
            }
            other => Err(NodeError::TypeMismatch(format!("time_string requires a string value, got {other}"))),
        },
        ContextValueType::EpochSecond => {
            let secs = entry
                .value
                .as_i64()
                .ok_or_else(|| NodeError::TypeMismatch(format!("epoch_second value for '{}' is not an integer", entry.name)))?;
            let dt = Utc
                .timestamp_opt(secs, 0)
                .single()
                .ok_or_else(|| NodeError::BadConfig(format!("'{secs}' is not a valid epoch second")))?;
            Ok(Value::String(dt.to_rfc3339()))
        }
        ContextValueType::EpochMs => {
            let ms = entry
                .value
                .as_i64()
                .ok_or_else(|| NodeError::TypeMismatch(format!("epoch_ms value for '{}' is not an integer", entry.name)))?;
            let dt = Utc
                .timestamp_millis_opt(ms)
                .single()
                .ok_or_else(|| NodeError::BadConfig(format!("'{ms}' is not a valid epoch millisecond")))?;
            Ok(Value::String(dt.to_rfc3339()))
        }
    }
}

fn entries(d: &ContextVariableData) -> Result<Vec<(String, Value)>, NodeError> {
    if let Some(values) = &d.context_values {
        return values.iter().map(|e| Ok((e.name.clone(), coerce(e)?))).collect();
    }
    if let Some(name) = &d.context_name {
        return Ok(vec![(name.clone(), d.context_value.clone().unwrap_or(Value::Null))]);
    }
    Err(NodeError::BadConfig(
        "context node requires 'context_values' or 'context_name'/'context_value'".into(),
    ))
}

pub struct ContextVariableExecutor;

#[async_trait]
impl ExecutableNode for ContextVariableExecutor {
    fn type_tag(&self) -> &'static str {
        "context_variable"
    }

    async fn execute(&self, data: &NodeData, ctx: &dyn ExecutionContext) -> Result<Value, NodeError> {
        let d = match data {
            NodeData::ContextVariable(d) => d,
            _ => return Err(NodeError::BadConfig("context_variable executor received mismatched data".into())),
        };
        let set = entries(d)?;
        for (name, value) in &set {
            ctx.context_variable_set(name, value.clone());
        }
        Ok(json!(set.into_iter().collect::<std::collections::HashMap<_, _>>()))
    }
}

pub struct ContextConstantExecutor;

#[async_trait]
impl ExecutableNode for ContextConstantExecutor {
    fn type_tag(&self) -> &'static str {
        "context_constant"
    }

    async fn execute(&self, data: &NodeData, ctx: &dyn ExecutionContext) -> Result<Value, NodeError> {
        let d = match data {
            NodeData::ContextConstant(d) => d,
            _ => return Err(NodeError::BadConfig("context_constant executor received mismatched data".into())),
        };
        let set = entries(d)?;
        for (name, value) in &set {
            ctx.context_constant_set(name, value.clone())?;
        }
        Ok(json!(set.into_iter().collect::<std::collections::HashMap<_, _>>()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(value: Value) -> ContextEntry {
        ContextEntry { name: "flag".into(), value, r#type: ContextValueType::Boolean }
    }

    #[test]
    fn boolean_coerces_nonzero_number_to_true() {
        assert_eq!(coerce(&entry(json!(1))).unwrap(), json!(true));
        assert_eq!(coerce(&entry(json!(0))).unwrap(), json!(false));
        assert_eq!(coerce(&entry(json!(-3.5))).unwrap(), json!(true));
    }

    #[test]
    fn boolean_accepts_only_exact_true_false_strings() {
        assert_eq!(coerce(&entry(json!("true"))).unwrap(), json!(true));
        assert_eq!(coerce(&entry(json!("false"))).unwrap(), json!(false));
        assert!(coerce(&entry(json!("banana"))).is_err());
    }

    fn typed_entry(value: Value, r#type: ContextValueType) -> ContextEntry {
        ContextEntry { name: "x".into(), value, r#type }
    }

    #[test]
    fn number_coerces_numeric_string() {
        let result = coerce(&typed_entry(json!("3.25"), ContextValueType::Number)).unwrap();
        assert_eq!(result, json!(3.25));
    }

    #[test]
    fn number_rejects_non_numeric_string() {
        assert!(coerce(&typed_entry(json!("banana"), ContextValueType::Number)).is_err());
    }

    #[test]
    fn time_string_accepts_valid_rfc3339() {
        let result = coerce(&typed_entry(json!("2024-01-15T10:30:00Z"), ContextValueType::TimeString)).unwrap();
        assert_eq!(result, json!("2024-01-15T10:30:00Z"));
    }

    #[test]
    fn time_string_rejects_malformed_value() {
        let err = coerce(&typed_entry(json!("not a timestamp"), ContextValueType::TimeString)).unwrap_err();
        assert_eq!(err.kind(), crate::error::ErrKind::BadConfig);
    }

    #[test]
    fn epoch_second_converts_to_rfc3339() {
        let result = coerce(&typed_entry(json!(0), ContextValueType::EpochSecond)).unwrap();
        assert_eq!(result, json!("1970-01-01T00:00:00+00:00"));
    }

    #[test]
    fn epoch_second_rejects_non_integer() {
        assert!(coerce(&typed_entry(json!("nope"), ContextValueType::EpochSecond)).is_err());
    }

    #[test]
    fn epoch_ms_converts_to_rfc3339() {
        let result = coerce(&typed_entry(json!(1_000), ContextValueType::EpochMs)).unwrap();
        assert_eq!(result, json!("1970-01-01T00:00:01+00:00"));
    }
}
