//! The middleware chain that wraps every node invocation: logging,
//! metrics, validation, a request-size cap, rate limiting, a per-node
//! timeout, and retry — in that order, outermost first.
//!
//! Each middleware decides whether to call `next` at all, and may inspect
//! or replace the result. The chain itself is just a cons-list walked by
//! [`Next::run`]; the final link calls the node's own `execute`.

pub mod logging;
pub mod metrics;
pub mod rate_limit;
pub mod retry;
pub mod size_limit;
pub mod timeout;
pub mod validation;

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;

use nodes::{ExecutableNode, ExecutionContext, NodeData, NodeError};

#[async_trait]
pub trait Middleware: Send + Sync {
    async fn handle<'a>(
        &'a self,
        node_id: &'a str,
        data: &'a NodeData,
        ctx: &'a dyn ExecutionContext,
        next: Next<'a>,
    ) -> Result<Value, NodeError>;
}

pub struct Next<'a> {
    middlewares: &'a [Arc<dyn Middleware>],
    executor: &'a dyn ExecutableNode,
}

impl<'a> Next<'a> {
    pub fn new(middlewares: &'a [Arc<dyn Middleware>], executor: &'a dyn ExecutableNode) -> Self {
        Next { middlewares, executor }
    }

    /// The node's own executor, exposed so `ValidationMiddleware` can call
    /// its `validate` hook before `next.run` actually dispatches.
    pub fn executor(&self) -> &'a dyn ExecutableNode {
        self.executor
    }

    pub async fn run(self, node_id: &'a str, data: &'a NodeData, ctx: &'a dyn ExecutionContext) -> Result<Value, NodeError> {
        match self.middlewares.split_first() {
            Some((mw, rest)) => {
                let next = Next { middlewares: rest, executor: self.executor };
                mw.handle(node_id, data, ctx, next).await
            }
            None => self.executor.execute(data, ctx).await,
        }
    }
}

/// The ordered, shared chain every node invocation is wrapped in.
pub struct MiddlewareChain {
    middlewares: Vec<Arc<dyn Middleware>>,
}

impl MiddlewareChain {
    pub fn new(middlewares: Vec<Arc<dyn Middleware>>) -> Self {
        MiddlewareChain { middlewares }
    }

    pub async fn run(
        &self,
        node_id: &str,
        data: &NodeData,
        ctx: &dyn ExecutionContext,
        executor: &dyn ExecutableNode,
    ) -> Result<Value, NodeError> {
        Next::new(&self.middlewares, executor).run(node_id, data, ctx).await
    }
}
