//! `parallel`, `join`, `split` — the fan-out/fan-in family.
//!
//! The actual concurrent execution of fanned-out branches is the
//! scheduler's job (branches are just nodes reachable from the same edge
//! in the DAG); these executors only carry the per-branch bookkeeping a
//! `parallel`/`join`/`split` node is responsible for.

use async_trait::async_trait;
use serde_json::{json, Value};

use crate::data::NodeData;
use crate::error::NodeError;
use crate::traits::{ExecutableNode, ExecutionContext};

pub struct ParallelExecutor;

#[async_trait]
impl ExecutableNode for ParallelExecutor {
    fn type_tag(&self) -> &'static str {
        "parallel"
    }

    async fn execute(&self, data: &NodeData, ctx: &dyn ExecutionContext) -> Result<Value, NodeError> {
        let d = match data {
            NodeData::Parallel(d) => d,
            _ => return Err(NodeError::BadConfig("parallel executor received mismatched data".into())),
        };
        Ok(json!({
            "values": ctx.inputs().to_vec(),
            "max_concurrency": d.max_concurrency,
        }))
    }
}

/// Merge fanned-out branch outputs back together. `all`/`any`/`first` are
/// the baseline strategies; `concat`/`merge` are additive conveniences for
/// array- and object-shaped branch outputs.
pub struct JoinExecutor;

#[async_trait]
impl ExecutableNode for JoinExecutor {
    fn type_tag(&self) -> &'static str {
        "join"
    }

    async fn execute(&self, data: &NodeData, ctx: &dyn ExecutionContext) -> Result<Value, NodeError> {
        let d = match data {
            NodeData::Join(d) => d,
            _ => return Err(NodeError::BadConfig("join executor received mismatched data".into())),
        };

        match d.join_strategy.as_str() {
            "all" => Ok(Value::Array(ctx.inputs().to_vec())),
            "any" => Ok(ctx.inputs().iter().find(|v| !v.is_null()).cloned().unwrap_or(Value::Null)),
            "first" => ctx
                .inputs()
                .first()
                .cloned()
                .ok_or_else(|| NodeError::BadConfig("join 'first' has no inputs to join".into())),
            "concat" => {
                let mut out = Vec::new();
                for v in ctx.inputs() {
                    match v.as_array() {
                        Some(arr) => out.extend(arr.iter().cloned()),
                        None => out.push(v.clone()),
                    }
                }
                Ok(Value::Array(out))
            }
            "merge" => {
                let mut out = serde_json::Map::new();
                for v in ctx.inputs() {
                    if let Some(obj) = v.as_object() {
                        for (k, val) in obj {
                            out.insert(k.clone(), val.clone());
                        }
                    }
                }
                Ok(Value::Object(out))
            }
            other => Err(NodeError::BadConfig(format!("unknown join_strategy '{other}'"))),
        }
    }
}

pub struct SplitExecutor;

#[async_trait]
impl ExecutableNode for SplitExecutor {
    fn type_tag(&self) -> &'static str {
        "split"
    }

    async fn execute(&self, data: &NodeData, ctx: &dyn ExecutionContext) -> Result<Value, NodeError> {
        let d = match data {
            NodeData::Split(d) => d,
            _ => return Err(NodeError::BadConfig("split executor received mismatched data".into())),
        };
        let input = ctx.input().cloned().unwrap_or(Value::Null);
        let mut out = serde_json::Map::new();
        for path in &d.paths {
            out.insert(path.clone(), input.clone());
        }
        Ok(Value::Object(out))
    }
}
