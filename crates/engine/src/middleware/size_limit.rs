//! Caps the serialized size of a node's resolved inputs and its produced
//! result, so one oversized upstream payload — or one node that builds an
//! oversized output — can't blow memory out through the rest of the graph.

use async_trait::async_trait;
use serde_json::Value;

use nodes::{ExecutionContext, NodeData, NodeError};

use super::{Middleware, Next};

pub struct SizeLimitMiddleware {
    pub max_input_bytes: usize,
    pub max_result_bytes: usize,
}

fn estimated_size(v: &Value) -> usize {
    v.to_string().len()
}

#[async_trait]
impl Middleware for SizeLimitMiddleware {
    async fn handle<'a>(
        &'a self,
        node_id: &'a str,
        data: &'a NodeData,
        ctx: &'a dyn ExecutionContext,
        next: Next<'a>,
    ) -> Result<Value, NodeError> {
        let size: usize = ctx.inputs().iter().map(estimated_size).sum();
        if size > self.max_input_bytes {
            return Err(NodeError::LimitExceeded(format!(
                "node '{node_id}' input ({size} bytes) exceeds cap of {} bytes",
                self.max_input_bytes
            )));
        }

        let result = next.run(node_id, data, ctx).await?;
        let result_size = estimated_size(&result);
        if result_size > self.max_result_bytes {
            return Err(NodeError::LimitExceeded(format!(
                "node '{node_id}' result ({result_size} bytes) exceeds cap of {} bytes",
                self.max_result_bytes
            )));
        }
        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EngineConfig;
    use crate::context::{EngineExecutionContext, ExecutionCounters, SharedExecutionState};
    use crate::state::StateManager;
    use parking_lot::RwLock;
    use serde_json::json;
    use std::collections::HashMap;
    use std::sync::Arc;

    struct StubExecutor(Value);

    #[async_trait]
    impl nodes::ExecutableNode for StubExecutor {
        fn type_tag(&self) -> &'static str {
            "stub"
        }
        async fn execute(&self, _data: &NodeData, _ctx: &dyn ExecutionContext) -> Result<Value, NodeError> {
            Ok(self.0.clone())
        }
    }

    fn test_context() -> EngineExecutionContext {
        let shared = Arc::new(SharedExecutionState {
            state: StateManager::new(100),
            node_results: RwLock::new(HashMap::new()),
            registry: nodes::build_registry(),
            config: EngineConfig::default(),
            counters: ExecutionCounters::new(1000, 1000),
            workflow_id: None,
        });
        EngineExecutionContext::new("n1", vec![], shared)
    }

    #[tokio::test]
    async fn oversized_result_is_rejected() {
        let mw = SizeLimitMiddleware { max_input_bytes: 1_000_000, max_result_bytes: 8 };
        let executor = StubExecutor(json!("this string is definitely longer than eight bytes"));
        let data = NodeData::Custom(Default::default());
        let ctx = test_context();
        let chain = Next::new(&[], &executor);
        let err = mw.handle("n1", &data, &ctx, chain).await.unwrap_err();
        assert!(matches!(err, NodeError::LimitExceeded(_)));
    }

    #[tokio::test]
    async fn result_within_cap_passes_through() {
        let mw = SizeLimitMiddleware { max_input_bytes: 1_000_000, max_result_bytes: 1_000_000 };
        let executor = StubExecutor(json!("short"));
        let data = NodeData::Custom(Default::default());
        let ctx = test_context();
        let chain = Next::new(&[], &executor);
        assert_eq!(mw.handle("n1", &data, &ctx, chain).await.unwrap(), json!("short"));
    }
}
