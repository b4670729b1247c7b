//! `retry`, `try_catch`, `timeout` — control-flow wrappers around a single
//! embedded child step, dispatched back through the context rather than
//! held as a direct reference to another executor.

use async_trait::async_trait;
use rand::Rng;
use serde_json::{json, Value};
use std::time::Duration;

use crate::data::{infer_type, ChildSpec, NodeData};
use crate::duration::parse_duration;
use crate::error::NodeError;
use crate::traits::{ExecutableNode, ExecutionContext};

pub(crate) fn resolve_child(child: &ChildSpec) -> Result<(String, NodeData), NodeError> {
    let type_tag = child
        .r#type
        .clone()
        .or_else(|| infer_type(&child.data).map(String::from))
        .ok_or_else(|| NodeError::BadConfig("embedded child step has no resolvable type".into()))?;
    let data = NodeData::decode(&type_tag, &child.data)?;
    Ok((type_tag, data))
}

const BASE_DELAY_MS: u64 = 100;
const DEFAULT_MAX_DELAY_MS: u64 = 10_000;

/// `exponential` doubles per attempt (the default), `linear` scales with
/// attempt number, `constant` always waits `BASE_DELAY_MS`.
fn backoff_delay(strategy: &str, attempt: u32, max_delay: Duration) -> Duration {
    let raw = match strategy {
        "linear" => BASE_DELAY_MS.saturating_mul(attempt as u64),
        "constant" => BASE_DELAY_MS,
        _ => BASE_DELAY_MS.saturating_mul(1u64 << attempt.min(20)),
    };
    let capped = raw.min(max_delay.as_millis() as u64);
    let jitter = rand::thread_rng().gen_range(0..=capped / 4 + 1);
    Duration::from_millis(capped.saturating_add(jitter))
}

pub struct RetryExecutor;

#[async_trait]
impl ExecutableNode for RetryExecutor {
    fn type_tag(&self) -> &'static str {
        "retry"
    }

    async fn execute(&self, data: &NodeData, ctx: &dyn ExecutionContext) -> Result<Value, NodeError> {
        let d = match data {
            NodeData::Retry(d) => d,
            _ => return Err(NodeError::BadConfig("retry executor received mismatched data".into())),
        };
        let (child_tag, child_data) = resolve_child(&d.child)?;
        let max_attempts = d.max_attempts.unwrap_or_else(|| ctx.default_max_attempts()).max(1);
        let strategy = d.backoff_strategy.as_deref().unwrap_or_else(|| ctx.default_backoff());
        let max_delay = match &d.max_delay {
            Some(raw) => parse_duration(raw)?,
            None => Duration::from_millis(DEFAULT_MAX_DELAY_MS),
        };

        let mut attempt = 0;
        loop {
            match ctx.dispatch_child(&child_tag, &child_data).await {
                Ok(v) => return Ok(v),
                Err(e) => {
                    attempt += 1;
                    // An empty or absent `retry_on_errors` list means every
                    // error is retry-eligible, not none.
                    let eligible = match &d.retry_on_errors {
                        Some(patterns) if !patterns.is_empty() => {
                            patterns.iter().any(|p| e.message().contains(p.as_str()))
                        }
                        _ => true,
                    };
                    if !eligible || attempt >= max_attempts {
                        return Err(e);
                    }
                    tokio::time::sleep(backoff_delay(strategy, attempt, max_delay)).await;
                }
            }
        }
    }
}

pub struct TryCatchExecutor;

#[async_trait]
impl ExecutableNode for TryCatchExecutor {
    fn type_tag(&self) -> &'static str {
        "try_catch"
    }

    async fn execute(&self, data: &NodeData, ctx: &dyn ExecutionContext) -> Result<Value, NodeError> {
        let d = match data {
            NodeData::TryCatch(d) => d,
            _ => return Err(NodeError::BadConfig("try_catch executor received mismatched data".into())),
        };
        let (child_tag, child_data) = resolve_child(&d.child)?;

        match ctx.dispatch_child(&child_tag, &child_data).await {
            Ok(v) => Ok(v),
            Err(e) => {
                if let Some(fallback) = &d.fallback_value {
                    return Ok(fallback.clone());
                }
                if d.continue_on_error.unwrap_or(false) {
                    return Ok(json!({ "caught": true, "error": e.message() }));
                }
                Err(e)
            }
        }
    }
}

pub struct TimeoutExecutor;

#[async_trait]
impl ExecutableNode for TimeoutExecutor {
    fn type_tag(&self) -> &'static str {
        "timeout"
    }

    async fn execute(&self, data: &NodeData, ctx: &dyn ExecutionContext) -> Result<Value, NodeError> {
        let d = match data {
            NodeData::Timeout(d) => d,
            _ => return Err(NodeError::BadConfig("timeout executor received mismatched data".into())),
        };
        let (child_tag, child_data) = resolve_child(&d.child)?;
        let limit = parse_duration(&d.timeout)?;

        match tokio::time::timeout(limit, ctx.dispatch_child(&child_tag, &child_data)).await {
            Ok(result) => result,
            Err(_) => match d.timeout_action.as_deref().unwrap_or("error") {
                "error" => Err(NodeError::Timeout(format!("child step exceeded {}ms", limit.as_millis()))),
                "continue_with_partial" => Ok(Value::Null),
                other => Err(NodeError::BadConfig(format!("unknown timeout_action '{other}'"))),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::{RetryData, TimeoutData, TryCatchData};
    use std::sync::Mutex;
    use std::time::Duration as StdDuration;

    /// A fake `ExecutionContext` whose `dispatch_child` plays back a
    /// programmed sequence of outcomes, optionally sleeping first — enough
    /// to exercise `retry`/`try_catch`/`timeout` without a real registry.
    struct ScriptedContext {
        outcomes: Mutex<std::collections::VecDeque<Result<Value, NodeError>>>,
        delay: Option<StdDuration>,
        attempts: std::sync::atomic::AtomicUsize,
    }

    impl ScriptedContext {
        fn new(outcomes: Vec<Result<Value, NodeError>>) -> Self {
            ScriptedContext {
                outcomes: Mutex::new(outcomes.into()),
                delay: None,
                attempts: std::sync::atomic::AtomicUsize::new(0),
            }
        }

        fn with_delay(outcomes: Vec<Result<Value, NodeError>>, delay: StdDuration) -> Self {
            ScriptedContext {
                outcomes: Mutex::new(outcomes.into()),
                delay: Some(delay),
                attempts: std::sync::atomic::AtomicUsize::new(0),
            }
        }

        fn attempt_count(&self) -> usize {
            self.attempts.load(std::sync::atomic::Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl ExecutionContext for ScriptedContext {
        fn node_id(&self) -> &str {
            "ctrl1"
        }
        fn inputs(&self) -> &[Value] {
            &[]
        }
        fn get_variable(&self, _: &str) -> Option<Value> {
            None
        }
        fn set_variable(&self, _: &str, _: Value) {}
        fn get_accumulator(&self) -> Value {
            Value::Null
        }
        fn set_accumulator(&self, _: Value) {}
        fn get_counter(&self) -> f64 {
            0.0
        }
        fn set_counter(&self, _: f64) {}
        fn cache_get(&self, _: &str) -> Option<Value> {
            None
        }
        fn cache_set(&self, _: &str, _: Value, _: Option<StdDuration>) {}
        fn cache_delete(&self, _: &str) {}
        fn context_constant_get(&self, _: &str) -> Option<Value> {
            None
        }
        fn context_constant_set(&self, _: &str, _: Value) -> Result<(), NodeError> {
            Ok(())
        }
        fn context_variable_get(&self, _: &str) -> Option<Value> {
            None
        }
        fn context_variable_set(&self, _: &str, _: Value) {}
        fn node_result(&self, _: &str) -> Option<Value> {
            None
        }
        fn interpolate(&self, template: &str) -> String {
            template.to_string()
        }
        fn charge_node_execution(&self) -> Result<(), NodeError> {
            Ok(())
        }
        fn charge_http_call(&self) -> Result<(), NodeError> {
            Ok(())
        }
        fn http_policy(&self) -> &crate::http::HttpPolicy {
            unimplemented!()
        }
        fn default_max_iterations(&self) -> usize {
            100
        }
        fn default_cache_ttl(&self) -> StdDuration {
            StdDuration::from_secs(60)
        }
        async fn dispatch_child(&self, _type_tag: &str, _data: &NodeData) -> Result<Value, NodeError> {
            self.attempts.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
            if let Some(d) = self.delay {
                tokio::time::sleep(d).await;
            }
            let mut outcomes = self.outcomes.lock().unwrap();
            outcomes.pop_front().unwrap_or_else(|| Err(NodeError::Fatal("scripted outcomes exhausted".into())))
        }
    }

    fn retry_data(max_attempts: u32, retry_on_errors: Option<Vec<String>>) -> NodeData {
        NodeData::Retry(RetryData {
            max_attempts: Some(max_attempts),
            backoff_strategy: Some("constant".into()),
            max_delay: Some("50ms".into()),
            retry_on_errors,
            child: ChildSpec { r#type: Some("custom".into()), data: Value::Null },
        })
    }

    #[tokio::test]
    async fn retry_succeeds_after_transient_failures_under_the_attempt_cap() {
        let ctx = ScriptedContext::new(vec![
            Err(NodeError::Http("upstream 502".into())),
            Err(NodeError::Http("upstream 502".into())),
            Ok(json!({ "ok": true })),
        ]);
        let data = retry_data(3, None);
        let result = RetryExecutor.execute(&data, &ctx).await.unwrap();
        assert_eq!(result, json!({ "ok": true }));
        assert_eq!(ctx.attempt_count(), 3);
    }

    #[tokio::test]
    async fn retry_gives_up_once_max_attempts_is_exhausted() {
        let ctx = ScriptedContext::new(vec![
            Err(NodeError::Http("upstream 502".into())),
            Err(NodeError::Http("upstream 502".into())),
        ]);
        let data = retry_data(2, None);
        let err = RetryExecutor.execute(&data, &ctx).await.unwrap_err();
        assert!(matches!(err, NodeError::Http(_)));
        assert_eq!(ctx.attempt_count(), 2);
    }

    #[tokio::test]
    async fn retry_on_errors_filters_out_non_matching_failures() {
        let ctx = ScriptedContext::new(vec![Err(NodeError::Http("DNS resolution failed".into()))]);
        let data = retry_data(5, Some(vec!["status 503".into()]));
        let err = RetryExecutor.execute(&data, &ctx).await.unwrap_err();
        assert!(matches!(err, NodeError::Http(_)));
        // no retry attempted beyond the first, non-matching failure
        assert_eq!(ctx.attempt_count(), 1);
    }

    #[tokio::test]
    async fn try_catch_returns_fallback_value_on_error() {
        let ctx = ScriptedContext::new(vec![Err(NodeError::Fatal("boom".into()))]);
        let data = NodeData::TryCatch(TryCatchData {
            fallback_value: Some(json!("default")),
            continue_on_error: None,
            child: ChildSpec { r#type: Some("custom".into()), data: Value::Null },
        });
        let result = TryCatchExecutor.execute(&data, &ctx).await.unwrap();
        assert_eq!(result, json!("default"));
    }

    #[tokio::test]
    async fn try_catch_continues_on_error_without_a_fallback() {
        let ctx = ScriptedContext::new(vec![Err(NodeError::Fatal("boom".into()))]);
        let data = NodeData::TryCatch(TryCatchData {
            fallback_value: None,
            continue_on_error: Some(true),
            child: ChildSpec { r#type: Some("custom".into()), data: Value::Null },
        });
        let result = TryCatchExecutor.execute(&data, &ctx).await.unwrap();
        assert_eq!(result["caught"], json!(true));
    }

    #[tokio::test]
    async fn try_catch_propagates_the_error_when_no_recovery_is_configured() {
        let ctx = ScriptedContext::new(vec![Err(NodeError::Fatal("boom".into()))]);
        let data = NodeData::TryCatch(TryCatchData {
            fallback_value: None,
            continue_on_error: None,
            child: ChildSpec { r#type: Some("custom".into()), data: Value::Null },
        });
        assert!(TryCatchExecutor.execute(&data, &ctx).await.is_err());
    }

    #[tokio::test]
    async fn timeout_passes_through_a_child_that_finishes_in_time() {
        let ctx = ScriptedContext::new(vec![Ok(json!("done"))]);
        let data = NodeData::Timeout(TimeoutData {
            timeout: "200ms".into(),
            timeout_action: None,
            child: ChildSpec { r#type: Some("custom".into()), data: Value::Null },
        });
        let result = TimeoutExecutor.execute(&data, &ctx).await.unwrap();
        assert_eq!(result, json!("done"));
    }

    #[tokio::test]
    async fn timeout_errors_by_default_when_the_child_exceeds_the_deadline() {
        let ctx = ScriptedContext::with_delay(vec![Ok(json!("too late"))], StdDuration::from_millis(100));
        let data = NodeData::Timeout(TimeoutData {
            timeout: "10ms".into(),
            timeout_action: None,
            child: ChildSpec { r#type: Some("custom".into()), data: Value::Null },
        });
        let err = TimeoutExecutor.execute(&data, &ctx).await.unwrap_err();
        assert!(matches!(err, NodeError::Timeout(_)));
    }

    #[tokio::test]
    async fn timeout_continue_with_partial_yields_null_instead_of_erroring() {
        let ctx = ScriptedContext::with_delay(vec![Ok(json!("too late"))], StdDuration::from_millis(100));
        let data = NodeData::Timeout(TimeoutData {
            timeout: "10ms".into(),
            timeout_action: Some("continue_with_partial".into()),
            child: ChildSpec { r#type: Some("custom".into()), data: Value::Null },
        });
        let result = TimeoutExecutor.execute(&data, &ctx).await.unwrap();
        assert_eq!(result, Value::Null);
    }
}
