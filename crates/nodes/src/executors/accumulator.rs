//! `accumulator` — fold every resolved predecessor input into the
//! workflow-wide accumulator slot using `accum_op`.

use async_trait::async_trait;
use serde_json::{json, Value};

use super::numeric::as_f64;
use crate::data::NodeData;
use crate::error::NodeError;
use crate::traits::{ExecutableNode, ExecutionContext};

pub struct AccumulatorExecutor;

#[async_trait]
impl ExecutableNode for AccumulatorExecutor {
    fn type_tag(&self) -> &'static str {
        "accumulator"
    }

    async fn execute(&self, data: &NodeData, ctx: &dyn ExecutionContext) -> Result<Value, NodeError> {
        let d = match data {
            NodeData::Accumulator(d) => d,
            _ => return Err(NodeError::BadConfig("accumulator executor received mismatched data".into())),
        };

        let current = match ctx.get_accumulator() {
            Value::Null => d.initial_value.clone().unwrap_or(Value::Null),
            existing => existing,
        };

        let updated = match d.accum_op.as_str() {
            "sum" => {
                let mut total = if current.is_null() { 0.0 } else { as_f64(&current)? };
                for input in ctx.inputs() {
                    total += as_f64(input)?;
                }
                json!(total)
            }
            "product" => {
                let mut total = if current.is_null() { 1.0 } else { as_f64(&current)? };
                for input in ctx.inputs() {
                    total *= as_f64(input)?;
                }
                json!(total)
            }
            "concat" => {
                let mut text = match current {
                    Value::Null => String::new(),
                    Value::String(s) => s,
                    other => other.to_string(),
                };
                for input in ctx.inputs() {
                    match input {
                        Value::String(s) => text.push_str(s),
                        other => text.push_str(&other.to_string()),
                    }
                }
                json!(text)
            }
            "collect" => {
                let mut arr = match current {
                    Value::Array(arr) => arr,
                    Value::Null => Vec::new(),
                    other => vec![other],
                };
                arr.extend(ctx.inputs().iter().cloned());
                Value::Array(arr)
            }
            other => return Err(NodeError::BadConfig(format!("unknown accum_op '{other}'"))),
        };

        ctx.set_accumulator(updated.clone());
        Ok(updated)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::AccumulatorData;
    use async_trait::async_trait;
    use std::sync::Mutex;

    struct FoldContext {
        inputs: Vec<Value>,
        accumulator: Mutex<Value>,
    }

    impl FoldContext {
        fn new(inputs: Vec<Value>) -> Self {
            Self { inputs, accumulator: Mutex::new(Value::Null) }
        }

        fn seeded(inputs: Vec<Value>, accumulator: Value) -> Self {
            Self { inputs, accumulator: Mutex::new(accumulator) }
        }
    }

    #[async_trait]
    impl ExecutionContext for FoldContext {
        fn node_id(&self) -> &str {
            "acc1"
        }
        fn inputs(&self) -> &[Value] {
            &self.inputs
        }
        fn get_variable(&self, _: &str) -> Option<Value> {
            None
        }
        fn set_variable(&self, _: &str, _: Value) {}
        fn get_accumulator(&self) -> Value {
            self.accumulator.lock().unwrap().clone()
        }
        fn set_accumulator(&self, value: Value) {
            *self.accumulator.lock().unwrap() = value;
        }
        fn get_counter(&self) -> f64 {
            0.0
        }
        fn set_counter(&self, _: f64) {}
        fn cache_get(&self, _: &str) -> Option<Value> {
            None
        }
        fn cache_set(&self, _: &str, _: Value, _: Option<std::time::Duration>) {}
        fn cache_delete(&self, _: &str) {}
        fn context_constant_get(&self, _: &str) -> Option<Value> {
            None
        }
        fn context_constant_set(&self, _: &str, _: Value) -> Result<(), NodeError> {
            Ok(())
        }
        fn context_variable_get(&self, _: &str) -> Option<Value> {
            None
        }
        fn context_variable_set(&self, _: &str, _: Value) {}
        fn node_result(&self, _: &str) -> Option<Value> {
            None
        }
        fn interpolate(&self, template: &str) -> String {
            template.to_string()
        }
        fn charge_node_execution(&self) -> Result<(), NodeError> {
            Ok(())
        }
        fn charge_http_call(&self) -> Result<(), NodeError> {
            Ok(())
        }
        fn http_policy(&self) -> &crate::http::HttpPolicy {
            unimplemented!()
        }
        fn default_max_iterations(&self) -> usize {
            100
        }
        fn default_cache_ttl(&self) -> std::time::Duration {
            std::time::Duration::from_secs(60)
        }
        async fn dispatch_child(&self, _: &str, _: &NodeData) -> Result<Value, NodeError> {
            unimplemented!()
        }
    }

    #[tokio::test]
    async fn sums_inputs_onto_existing_accumulator() {
        let executor = AccumulatorExecutor;
        let data = NodeData::Accumulator(AccumulatorData { accum_op: "sum".into(), initial_value: None });
        let ctx = FoldContext::seeded(vec![json!(2.0), json!(3.0)], json!(10.0));
        let result = executor.execute(&data, &ctx).await.unwrap();
        assert_eq!(result, json!(15.0));
    }

    #[tokio::test]
    async fn collect_appends_to_array() {
        let executor = AccumulatorExecutor;
        let data = NodeData::Accumulator(AccumulatorData { accum_op: "collect".into(), initial_value: None });
        let ctx = FoldContext::new(vec![json!("a"), json!("b")]);
        let result = executor.execute(&data, &ctx).await.unwrap();
        assert_eq!(result, json!(["a", "b"]));
    }

    #[tokio::test]
    async fn product_starts_from_one_when_unset() {
        let executor = AccumulatorExecutor;
        let data = NodeData::Accumulator(AccumulatorData { accum_op: "product".into(), initial_value: None });
        let ctx = FoldContext::new(vec![json!(4.0), json!(5.0)]);
        let result = executor.execute(&data, &ctx).await.unwrap();
        assert_eq!(result, json!(20.0));
    }

    #[tokio::test]
    async fn rejects_unknown_op() {
        let executor = AccumulatorExecutor;
        let data = NodeData::Accumulator(AccumulatorData { accum_op: "nonsense".into(), initial_value: None });
        let ctx = FoldContext::new(vec![]);
        assert!(executor.execute(&data, &ctx).await.is_err());
    }
}
