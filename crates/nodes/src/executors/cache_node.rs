//! `cache` — get/set/delete against the TTL-indexed execution cache.

use async_trait::async_trait;
use serde_json::{json, Value};

use crate::data::NodeData;
use crate::duration::parse_duration;
use crate::error::NodeError;
use crate::traits::{ExecutableNode, ExecutionContext};

pub struct CacheExecutor;

#[async_trait]
impl ExecutableNode for CacheExecutor {
    fn type_tag(&self) -> &'static str {
        "cache"
    }

    fn validate(&self, data: &NodeData) -> Result<(), NodeError> {
        match data {
            NodeData::Cache(d) if d.cache_key.is_empty() => {
                Err(NodeError::BadConfig("cache node has an empty cache_key".into()))
            }
            NodeData::Cache(d) if !matches!(d.cache_op.as_str(), "get" | "set" | "delete") => {
                Err(NodeError::BadConfig(format!("unknown cache_op '{}'", d.cache_op)))
            }
            NodeData::Cache(_) => Ok(()),
            _ => Err(NodeError::BadConfig("cache executor received mismatched data".into())),
        }
    }

    async fn execute(&self, data: &NodeData, ctx: &dyn ExecutionContext) -> Result<Value, NodeError> {
        let d = match data {
            NodeData::Cache(d) => d,
            _ => return Err(NodeError::BadConfig("cache executor received mismatched data".into())),
        };
        let key = ctx.interpolate(&d.cache_key);

        match d.cache_op.as_str() {
            "get" => Ok(ctx.cache_get(&key).unwrap_or(Value::Null)),
            "set" => {
                let ttl = match &d.ttl {
                    Some(raw) => Some(parse_duration(raw)?),
                    None => Some(ctx.default_cache_ttl()),
                };
                let value = d
                    .value
                    .clone()
                    .or_else(|| ctx.input().cloned())
                    .unwrap_or(Value::Null);
                ctx.cache_set(&key, value.clone(), ttl);
                Ok(json!({ "key": key, "value": value }))
            }
            "delete" => {
                ctx.cache_delete(&key);
                Ok(json!({ "key": key, "deleted": true }))
            }
            other => Err(NodeError::BadConfig(format!("unknown cache_op '{other}'"))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::CacheData;

    #[test]
    fn validate_rejects_unknown_cache_op() {
        let data = NodeData::Cache(CacheData {
            cache_op: "flush".into(),
            cache_key: "k".into(),
            ttl: None,
            value: None,
        });
        assert!(CacheExecutor.validate(&data).is_err());
    }

    #[test]
    fn validate_rejects_empty_key() {
        let data = NodeData::Cache(CacheData {
            cache_op: "get".into(),
            cache_key: String::new(),
            ttl: None,
            value: None,
        });
        assert!(CacheExecutor.validate(&data).is_err());
    }
}
