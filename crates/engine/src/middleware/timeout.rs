//! Enforces the engine's default per-node deadline. Independent of the
//! `timeout` node type, which wraps a specific embedded child step —
//! this applies to every node, including built-ins that don't opt in.

use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;

use nodes::{ExecutionContext, NodeData, NodeError};

use super::{Middleware, Next};

pub struct TimeoutMiddleware {
    pub node_deadline: Duration,
}

#[async_trait]
impl Middleware for TimeoutMiddleware {
    async fn handle<'a>(
        &'a self,
        node_id: &'a str,
        data: &'a NodeData,
        ctx: &'a dyn ExecutionContext,
        next: Next<'a>,
    ) -> Result<Value, NodeError> {
        match tokio::time::timeout(self.node_deadline, next.run(node_id, data, ctx)).await {
            Ok(result) => result,
            Err(_) => Err(NodeError::Timeout(format!(
                "node '{node_id}' exceeded its {}ms deadline",
                self.node_deadline.as_millis()
            ))),
        }
    }
}
