//! Engine-wide retry for transient failures — distinct from the `retry`
//! node type, which wraps one specific embedded child step. This applies
//! uniformly to every node invocation, the same way the `timeout`
//! middleware backstops the `timeout` node type.

use std::time::Duration;

use async_trait::async_trait;
use rand::Rng;
use serde_json::Value;

use nodes::{ExecutionContext, NodeData, NodeError};

use super::{Middleware, Next};

pub struct RetryMiddleware {
    pub max_attempts: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
}

impl Default for RetryMiddleware {
    fn default() -> Self {
        RetryMiddleware { max_attempts: 2, base_delay: Duration::from_millis(50), max_delay: Duration::from_secs(2) }
    }
}

fn backoff(attempt: u32, base: Duration, max: Duration) -> Duration {
    let exp = base.as_millis() as u64 * (1u64 << attempt.min(16));
    let capped = exp.min(max.as_millis() as u64);
    let jitter = rand::thread_rng().gen_range(0..=capped / 4 + 1);
    Duration::from_millis(capped.saturating_add(jitter))
}

#[async_trait]
impl Middleware for RetryMiddleware {
    async fn handle<'a>(
        &'a self,
        node_id: &'a str,
        data: &'a NodeData,
        ctx: &'a dyn ExecutionContext,
        next: Next<'a>,
    ) -> Result<Value, NodeError> {
        // `next` is consumed by the first attempt; subsequent attempts
        // dispatch straight through the node itself via the context, since
        // the remaining middleware slice was already consumed building `next`.
        let mut attempt = 0;
        loop {
            let outcome = if attempt == 0 {
                next.run(node_id, data, ctx).await
            } else {
                ctx.dispatch_child(data.type_tag(), data).await
            };

            match outcome {
                Ok(v) => return Ok(v),
                Err(e) if e.is_transient() && attempt + 1 < self.max_attempts => {
                    attempt += 1;
                    tokio::time::sleep(backoff(attempt, self.base_delay, self.max_delay)).await;
                }
                Err(e) => return Err(e),
            }
        }
    }
}
