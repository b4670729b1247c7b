//! Token-bucket rate limiting, checked at three scopes before a node runs:
//! a global bucket shared by the whole execution, a per-node-type bucket
//! so one noisy node type can't starve the rest, and (when the execution
//! carries a workflow id) a per-workflow bucket so one workflow can't
//! starve others sharing the same engine instance.

use std::collections::HashMap;
use std::time::Instant;

use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::Value;

use nodes::{ExecutionContext, NodeData, NodeError};

use super::{Middleware, Next};

#[derive(Debug, Clone, Copy)]
pub struct RateLimitConfig {
    pub enabled: bool,
    pub global_capacity: f64,
    pub global_refill_per_sec: f64,
    pub per_type_capacity: f64,
    pub per_type_refill_per_sec: f64,
    pub per_workflow_capacity: f64,
    pub per_workflow_refill_per_sec: f64,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        RateLimitConfig {
            enabled: true,
            global_capacity: 500.0,
            global_refill_per_sec: 200.0,
            per_type_capacity: 100.0,
            per_type_refill_per_sec: 50.0,
            per_workflow_capacity: 200.0,
            per_workflow_refill_per_sec: 80.0,
        }
    }
}

impl RateLimitConfig {
    pub fn disabled() -> Self {
        RateLimitConfig { enabled: false, ..RateLimitConfig::default() }
    }
}

struct TokenBucket {
    capacity: f64,
    tokens: f64,
    refill_per_sec: f64,
    last_refill: Instant,
}

impl TokenBucket {
    fn new(capacity: f64, refill_per_sec: f64) -> Self {
        TokenBucket { capacity, tokens: capacity, refill_per_sec, last_refill: Instant::now() }
    }

    fn try_take(&mut self) -> bool {
        let now = Instant::now();
        let elapsed = now.duration_since(self.last_refill).as_secs_f64();
        self.tokens = (self.tokens + elapsed * self.refill_per_sec).min(self.capacity);
        self.last_refill = now;

        if self.tokens >= 1.0 {
            self.tokens -= 1.0;
            true
        } else {
            false
        }
    }
}

pub struct RateLimitMiddleware {
    config: RateLimitConfig,
    global: Mutex<TokenBucket>,
    per_type: Mutex<HashMap<&'static str, TokenBucket>>,
    per_workflow: Mutex<HashMap<String, TokenBucket>>,
}

impl RateLimitMiddleware {
    pub fn new(config: RateLimitConfig) -> Self {
        RateLimitMiddleware {
            global: Mutex::new(TokenBucket::new(config.global_capacity, config.global_refill_per_sec)),
            per_type: Mutex::new(HashMap::new()),
            per_workflow: Mutex::new(HashMap::new()),
            config,
        }
    }
}

#[async_trait]
impl Middleware for RateLimitMiddleware {
    async fn handle<'a>(
        &'a self,
        node_id: &'a str,
        data: &'a NodeData,
        ctx: &'a dyn ExecutionContext,
        next: Next<'a>,
    ) -> Result<Value, NodeError> {
        if self.config.enabled {
            if !self.global.lock().try_take() {
                return Err(NodeError::RateLimited(format!("node '{node_id}' rejected: global rate limit exceeded")));
            }
            let type_tag = data.type_tag();
            let mut buckets = self.per_type.lock();
            let bucket = buckets
                .entry(type_tag)
                .or_insert_with(|| TokenBucket::new(self.config.per_type_capacity, self.config.per_type_refill_per_sec));
            if !bucket.try_take() {
                return Err(NodeError::RateLimited(format!(
                    "node '{node_id}' rejected: rate limit exceeded for type '{type_tag}'"
                )));
            }

            if let Some(workflow_id) = ctx.workflow_id() {
                let mut buckets = self.per_workflow.lock();
                let bucket = buckets.entry(workflow_id.to_owned()).or_insert_with(|| {
                    TokenBucket::new(self.config.per_workflow_capacity, self.config.per_workflow_refill_per_sec)
                });
                if !bucket.try_take() {
                    return Err(NodeError::RateLimited(format!(
                        "node '{node_id}' rejected: rate limit exceeded for workflow '{workflow_id}'"
                    )));
                }
            }
        }
        next.run(node_id, data, ctx).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bucket_refuses_once_drained() {
        let mut bucket = TokenBucket::new(1.0, 0.0);
        assert!(bucket.try_take());
        assert!(!bucket.try_take());
    }

    mod per_workflow_scope {
        use super::*;
        use crate::config::EngineConfig;
        use crate::context::{EngineExecutionContext, ExecutionCounters, SharedExecutionState};
        use crate::state::StateManager;
        use async_trait::async_trait;
        use nodes::{ExecutableNode, NodeData, NodeError};
        use parking_lot::RwLock as PlRwLock;
        use serde_json::{json, Value};
        use std::collections::HashMap as Map;
        use std::sync::Arc;

        struct StubExecutor;

        #[async_trait]
        impl ExecutableNode for StubExecutor {
            fn type_tag(&self) -> &'static str {
                "stub"
            }
            async fn execute(&self, _data: &NodeData, _ctx: &dyn nodes::ExecutionContext) -> Result<Value, NodeError> {
                Ok(json!("ok"))
            }
        }

        fn context_for(workflow_id: Option<&str>) -> EngineExecutionContext {
            let shared = Arc::new(SharedExecutionState {
                state: StateManager::new(100),
                node_results: PlRwLock::new(Map::new()),
                registry: nodes::build_registry(),
                config: EngineConfig::default(),
                counters: ExecutionCounters::new(1000, 1000),
                workflow_id: workflow_id.map(str::to_owned),
            });
            EngineExecutionContext::new("n1", vec![], shared)
        }

        #[tokio::test]
        async fn separate_workflows_get_separate_buckets() {
            let config = RateLimitConfig {
                global_capacity: 1000.0,
                global_refill_per_sec: 1000.0,
                per_type_capacity: 1000.0,
                per_type_refill_per_sec: 1000.0,
                per_workflow_capacity: 1.0,
                per_workflow_refill_per_sec: 0.0,
                ..RateLimitConfig::default()
            };
            let mw = RateLimitMiddleware::new(config);
            let executor = StubExecutor;
            let data = NodeData::Custom(Default::default());

            let ctx_a = context_for(Some("wf-a"));
            assert!(mw.handle("n1", &data, &ctx_a, Next::new(&[], &executor)).await.is_ok());
            assert!(mw.handle("n1", &data, &ctx_a, Next::new(&[], &executor)).await.is_err());

            let ctx_b = context_for(Some("wf-b"));
            assert!(mw.handle("n1", &data, &ctx_b, Next::new(&[], &executor)).await.is_ok());
        }

        #[tokio::test]
        async fn no_workflow_id_skips_the_per_workflow_check() {
            let config = RateLimitConfig {
                global_capacity: 1000.0,
                global_refill_per_sec: 1000.0,
                per_type_capacity: 1000.0,
                per_type_refill_per_sec: 1000.0,
                per_workflow_capacity: 1.0,
                per_workflow_refill_per_sec: 0.0,
                ..RateLimitConfig::default()
            };
            let mw = RateLimitMiddleware::new(config);
            let executor = StubExecutor;
            let data = NodeData::Custom(Default::default());
            let ctx = context_for(None);
            assert!(mw.handle("n1", &data, &ctx, Next::new(&[], &executor)).await.is_ok());
            assert!(mw.handle("n1", &data, &ctx, Next::new(&[], &executor)).await.is_ok());
        }
    }
}
