//! Logs node entry/exit and duration via `tracing`.

use async_trait::async_trait;
use serde_json::Value;
use std::time::Instant;
use tracing::{info, warn};

use nodes::{ExecutionContext, NodeData, NodeError};

use super::{Middleware, Next};

pub struct LoggingMiddleware;

#[async_trait]
impl Middleware for LoggingMiddleware {
    async fn handle<'a>(
        &'a self,
        node_id: &'a str,
        data: &'a NodeData,
        ctx: &'a dyn ExecutionContext,
        next: Next<'a>,
    ) -> Result<Value, NodeError> {
        let type_tag = data.type_tag();
        let started = Instant::now();
        info!(node_id, node_type = type_tag, "node started");

        let result = next.run(node_id, data, ctx).await;

        let elapsed = started.elapsed();
        match &result {
            Ok(_) => info!(node_id, node_type = type_tag, ?elapsed, "node succeeded"),
            Err(e) => warn!(node_id, node_type = type_tag, ?elapsed, error = %e, "node failed"),
        }
        result
    }
}
