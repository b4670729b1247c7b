//! Counts node invocations and failures per type tag. A minimal in-memory
//! stand-in for a real metrics backend — exposed read-only so the API
//! layer can surface it without the engine depending on a metrics crate.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use parking_lot::RwLock;
use serde_json::Value;

use nodes::{ExecutionContext, NodeData, NodeError};

use super::{Middleware, Next};

#[derive(Debug, Default, Clone, Copy)]
pub struct NodeTypeCounters {
    pub invocations: u64,
    pub failures: u64,
}

#[derive(Default)]
pub struct MetricsRegistry {
    by_type: RwLock<HashMap<&'static str, (AtomicU64, AtomicU64)>>,
}

impl MetricsRegistry {
    pub fn snapshot(&self) -> HashMap<&'static str, NodeTypeCounters> {
        self.by_type
            .read()
            .iter()
            .map(|(k, (inv, fail))| {
                (
                    *k,
                    NodeTypeCounters {
                        invocations: inv.load(Ordering::Relaxed),
                        failures: fail.load(Ordering::Relaxed),
                    },
                )
            })
            .collect()
    }

    fn record(&self, type_tag: &'static str, failed: bool) {
        if !self.by_type.read().contains_key(type_tag) {
            self.by_type.write().entry(type_tag).or_insert_with(|| (AtomicU64::new(0), AtomicU64::new(0)));
        }
        let guard = self.by_type.read();
        let (inv, fail) = &guard[type_tag];
        inv.fetch_add(1, Ordering::Relaxed);
        if failed {
            fail.fetch_add(1, Ordering::Relaxed);
        }
    }
}

pub struct MetricsMiddleware {
    pub registry: std::sync::Arc<MetricsRegistry>,
}

#[async_trait]
impl Middleware for MetricsMiddleware {
    async fn handle<'a>(
        &'a self,
        node_id: &'a str,
        data: &'a NodeData,
        ctx: &'a dyn ExecutionContext,
        next: Next<'a>,
    ) -> Result<Value, NodeError> {
        let result = next.run(node_id, data, ctx).await;
        self.registry.record(data.type_tag(), result.is_err());
        result
    }
}
