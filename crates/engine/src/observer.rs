//! Structured event fan-out. The engine never persists anything itself —
//! `Observer` is the seam a caller hangs logging, metrics export, or a
//! websocket feed off of. Notifications are fire-and-forget: each one runs
//! on its own detached task with panic recovery, so a misbehaving observer
//! can never stall or abort the dispatcher.

use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use async_trait::async_trait;
use futures::FutureExt;
use serde_json::Value;
use tracing::error;

/// One notable thing that happened during an execution.
#[derive(Debug, Clone)]
pub enum ExecutionEvent {
    NodeStarted { node_id: String },
    NodeSucceeded { node_id: String, result: Value },
    NodeFailed { node_id: String, error: String },
    ExecutionCompleted { execution_id: String, final_output: Value },
}

#[async_trait]
pub trait Observer: Send + Sync + 'static {
    fn name(&self) -> &str;
    async fn notify(&self, event: ExecutionEvent);
}

/// Fan an event out to every observer without waiting for any of them.
/// A panicking observer is caught and logged as `ObserverPanic`; it never
/// propagates back to the caller.
pub fn notify_all(observers: &[Arc<dyn Observer>], event: ExecutionEvent) {
    for observer in observers {
        let observer = Arc::clone(observer);
        let event = event.clone();
        tokio::spawn(async move {
            let name = observer.name().to_owned();
            let outcome = AssertUnwindSafe(observer.notify(event)).catch_unwind().await;
            if let Err(panic) = outcome {
                let message = panic
                    .downcast_ref::<&str>()
                    .map(|s| s.to_string())
                    .or_else(|| panic.downcast_ref::<String>().cloned())
                    .unwrap_or_else(|| "observer panicked with a non-string payload".to_owned());
                error!(observer = %name, %message, "observer panicked");
            }
        });
    }
}
