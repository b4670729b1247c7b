//! `text_operation` — string transforms over the first resolved input.

use async_trait::async_trait;
use serde_json::{json, Value};

use crate::data::{NodeData, TextOperationData};
use crate::error::NodeError;
use crate::traits::{ExecutableNode, ExecutionContext};

pub struct TextOperationExecutor;

#[async_trait]
impl ExecutableNode for TextOperationExecutor {
    fn type_tag(&self) -> &'static str {
        "text_operation"
    }

    async fn execute(&self, data: &NodeData, ctx: &dyn ExecutionContext) -> Result<Value, NodeError> {
        let d = match data {
            NodeData::TextOperation(d) => d,
            _ => return Err(NodeError::BadConfig("text_operation executor received mismatched data".into())),
        };

        if d.text_op == "concat" {
            let sep = d.separator.as_deref().unwrap_or("");
            let joined = ctx
                .inputs()
                .iter()
                .map(value_to_text)
                .collect::<Vec<_>>()
                .join(sep);
            return Ok(json!(joined));
        }

        let text = ctx
            .input()
            .map(value_to_text)
            .ok_or_else(|| NodeError::BadConfig(format!("text_op '{}' requires an input", d.text_op)))?;

        apply(&d.text_op, &text, d)
    }
}

fn value_to_text(v: &Value) -> String {
    match v {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn apply(op: &str, text: &str, d: &TextOperationData) -> Result<Value, NodeError> {
    match op {
        "uppercase" => Ok(json!(text.to_uppercase())),
        "lowercase" => Ok(json!(text.to_lowercase())),
        "trim" => Ok(json!(text.trim())),
        "length" => Ok(json!(text.chars().count())),
        "reverse" => Ok(json!(text.chars().rev().collect::<String>())),
        "split" => {
            let sep = d.separator.as_deref().unwrap_or(",");
            Ok(json!(text.split(sep).collect::<Vec<_>>()))
        }
        "replace" => {
            let pattern = d.pattern.as_deref().unwrap_or("");
            let replacement = d.replacement.as_deref().unwrap_or("");
            Ok(json!(text.replace(pattern, replacement)))
        }
        "substring" => {
            let start = d.start.unwrap_or(0).max(0) as usize;
            let chars: Vec<char> = text.chars().collect();
            let end = d
                .length
                .map(|len| (start + len.max(0) as usize).min(chars.len()))
                .unwrap_or(chars.len());
            if start > chars.len() {
                return Err(NodeError::BadConfig(format!(
                    "substring start {start} is past end of {}-char text",
                    chars.len()
                )));
            }
            Ok(json!(chars[start..end].iter().collect::<String>()))
        }
        "repeat" => {
            let count = d.count.unwrap_or(1);
            Ok(json!(text.repeat(count)))
        }
        other => Err(NodeError::BadConfig(format!("unknown text_op '{other}'"))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn substring_clamps_to_text_length() {
        let d = TextOperationData {
            text_op: "substring".into(),
            start: Some(2),
            length: Some(100),
            ..Default::default()
        };
        assert_eq!(apply("substring", "hello", &d).unwrap(), json!("llo"));
    }

    #[test]
    fn replace_applies_pattern() {
        let d = TextOperationData {
            text_op: "replace".into(),
            pattern: Some("l".into()),
            replacement: Some("L".into()),
            ..Default::default()
        };
        assert_eq!(apply("replace", "hello", &d).unwrap(), json!("heLLo"));
    }
}
