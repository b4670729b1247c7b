//! `Engine` — the orchestrator. Validates and decodes a workflow, computes
//! an execution order, and dispatches every node through the middleware
//! chain, either one at a time (`run_sequential`) or in bounded-concurrency
//! levels (`run_parallel`, grounded in the level-by-level executor pattern
//! in the pack). Construct one `Engine` per execution — it owns no
//! cross-run state.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;
use rand::Rng;
use serde_json::Value;
use tracing::{error, info, instrument, warn};

use nodes::NodeError;

use crate::config::EngineConfig;
use crate::context::{EngineExecutionContext, ExecutionCounters, SharedExecutionState};
use crate::error::EngineError;
use crate::graph::{compute_levels, topo_sort, validate_workflow_size};
use crate::middleware::logging::LoggingMiddleware;
use crate::middleware::metrics::{MetricsMiddleware, MetricsRegistry};
use crate::middleware::rate_limit::RateLimitMiddleware;
use crate::middleware::retry::RetryMiddleware;
use crate::middleware::size_limit::SizeLimitMiddleware;
use crate::middleware::timeout::TimeoutMiddleware;
use crate::middleware::validation::ValidationMiddleware;
use crate::middleware::MiddlewareChain;
use crate::observer::{notify_all, ExecutionEvent, Observer};
use crate::payload::decode_workflow;
use crate::state::StateManager;
use crate::types::Workflow;

/// The outcome of a full execution — always returned on `Ok` once the
/// workflow has passed graph validation; a failing node surfaces in
/// `errors`, not as an `Err`.
#[derive(Debug, Clone, serde::Serialize)]
pub struct ExecutionResult {
    pub execution_id: String,
    pub workflow_id: Option<String>,
    pub node_results: HashMap<String, Value>,
    pub final_output: Value,
    pub errors: Vec<String>,
}

fn random_execution_id() -> String {
    let bytes: [u8; 8] = rand::thread_rng().gen();
    bytes.iter().map(|b| format!("{b:02x}")).collect()
}

/// Node ids with no outgoing edge, in the order they appear in `sorted`.
fn terminal_nodes_in_order<'a>(workflow: &Workflow, sorted: &'a [String]) -> Vec<&'a str> {
    let has_outgoing: std::collections::HashSet<&str> =
        workflow.edges.iter().map(|e| e.source.as_str()).collect();
    sorted.iter().map(String::as_str).filter(|id| !has_outgoing.contains(id)).collect()
}

/// Ordered predecessor ids per node, preserving edge declaration order —
/// this is the order a multi-input node (e.g. `operation` on `subtract`)
/// folds its inputs in.
fn predecessor_map(workflow: &Workflow) -> HashMap<&str, Vec<&str>> {
    let mut preds: HashMap<&str, Vec<&str>> = HashMap::new();
    for node in &workflow.nodes {
        preds.entry(node.id.as_str()).or_default();
    }
    for edge in &workflow.edges {
        preds.entry(edge.target.as_str()).or_default().push(edge.source.as_str());
    }
    preds
}

pub struct Engine {
    config: EngineConfig,
    registry: nodes::Registry,
    middleware: MiddlewareChain,
    observers: Vec<Arc<dyn Observer>>,
    metrics: Arc<MetricsRegistry>,
}

impl Engine {
    pub fn new(config: EngineConfig) -> Result<Self, EngineError> {
        config.validate()?;
        let metrics = Arc::new(MetricsRegistry::default());
        let middleware = MiddlewareChain::new(vec![
            Arc::new(LoggingMiddleware),
            Arc::new(MetricsMiddleware { registry: metrics.clone() }),
            Arc::new(ValidationMiddleware {
                max_string_length: config.max_string_length,
                max_array_length: config.max_array_length,
                max_context_depth: config.max_context_depth,
            }),
            Arc::new(SizeLimitMiddleware {
                max_input_bytes: config.max_input_bytes,
                max_result_bytes: config.max_result_bytes,
            }),
            Arc::new(RateLimitMiddleware::new(config.rate_limit)),
            Arc::new(TimeoutMiddleware { node_deadline: config.node_deadline }),
            Arc::new(RetryMiddleware::default()),
        ]);
        Ok(Engine {
            config,
            registry: nodes::build_registry(),
            middleware,
            observers: Vec::new(),
            metrics,
        })
    }

    pub fn with_observer(mut self, observer: Arc<dyn Observer>) -> Self {
        self.observers.push(observer);
        self
    }

    pub fn metrics(&self) -> Arc<MetricsRegistry> {
        self.metrics.clone()
    }

    /// Run every node one at a time in topological order.
    #[instrument(skip(self, workflow), fields(workflow_id = workflow.workflow_id.as_deref().unwrap_or("")))]
    pub async fn run_sequential(&self, workflow: &Workflow) -> Result<ExecutionResult, EngineError> {
        validate_workflow_size(workflow, &self.config)?;
        let sorted = topo_sort(workflow)?;
        let levels: Vec<Vec<String>> = sorted.iter().map(|id| vec![id.clone()]).collect();
        self.run_levels(workflow, sorted, levels).await
    }

    /// Run the workflow level by level, every node within a level
    /// dispatched concurrently under a `max_concurrency_per_level` bound.
    #[instrument(skip(self, workflow), fields(workflow_id = workflow.workflow_id.as_deref().unwrap_or("")))]
    pub async fn run_parallel(&self, workflow: &Workflow) -> Result<ExecutionResult, EngineError> {
        validate_workflow_size(workflow, &self.config)?;
        let sorted = topo_sort(workflow)?;
        let levels = compute_levels(workflow, &sorted);
        self.run_levels(workflow, sorted, levels).await
    }

    async fn run_levels(
        &self,
        workflow: &Workflow,
        sorted: Vec<String>,
        levels: Vec<Vec<String>>,
    ) -> Result<ExecutionResult, EngineError> {
        let decoded = Arc::new(decode_workflow(workflow)?);
        let predecessors = predecessor_map(workflow);
        let execution_id = random_execution_id();

        let shared = Arc::new(SharedExecutionState {
            state: StateManager::new(self.config.cache_capacity),
            node_results: RwLock::new(HashMap::new()),
            registry: self.registry.clone(),
            config: self.config.clone(),
            counters: ExecutionCounters::new(
                self.config.max_node_executions_per_execution,
                self.config.max_http_calls_per_execution,
            ),
            workflow_id: workflow.workflow_id.clone(),
        });
        let semaphore = Arc::new(tokio::sync::Semaphore::new(self.config.max_concurrency_per_level));
        let observers = &self.observers;
        let middleware = &self.middleware;

        info!(execution_id, levels = levels.len(), "execution started");

        let body = async {
            let mut errors: Vec<String> = Vec::new();

            'levels: for level in &levels {
                let outcomes = futures::future::join_all(level.iter().map(|node_id| {
                    let shared = shared.clone();
                    let semaphore = semaphore.clone();
                    let decoded = decoded.clone();
                    let preds = predecessors.get(node_id.as_str()).cloned().unwrap_or_default();
                    async move {
                        let _permit = semaphore.acquire().await.expect("semaphore is never closed");

                        let inputs: Vec<Value> = preds
                            .iter()
                            .filter_map(|p| shared.node_results.read().get(*p).cloned())
                            .collect();

                        let data = match decoded.get(node_id.as_str()) {
                            Some(d) => d,
                            None => {
                                return (
                                    node_id.clone(),
                                    Err(NodeError::NotFound(format!("no decoded payload for node '{node_id}'"))),
                                )
                            }
                        };

                        let executor = match shared.registry.get(data.type_tag()) {
                            Some(e) => e,
                            None => {
                                return (
                                    node_id.clone(),
                                    Err(NodeError::NotFound(format!("no executor for type '{}'", data.type_tag()))),
                                )
                            }
                        };

                        notify_all(observers, ExecutionEvent::NodeStarted { node_id: node_id.clone() });

                        let ctx = EngineExecutionContext::new(node_id.clone(), inputs, shared.clone());
                        let result = middleware.run(node_id, data, &ctx, executor.as_ref()).await;

                        match &result {
                            Ok(value) => {
                                ctx.record_result(value.clone());
                                notify_all(
                                    observers,
                                    ExecutionEvent::NodeSucceeded { node_id: node_id.clone(), result: value.clone() },
                                );
                            }
                            Err(e) => {
                                notify_all(
                                    observers,
                                    ExecutionEvent::NodeFailed { node_id: node_id.clone(), error: e.to_string() },
                                );
                            }
                        }

                        (node_id.clone(), result)
                    }
                }))
                .await;

                let mut level_failed = false;
                for (node_id, outcome) in outcomes {
                    if let Err(e) = outcome {
                        level_failed = true;
                        warn!(node_id, error = %e, "node failed, aborting remaining levels");
                        errors.push(format!("{node_id}: {e}"));
                    }
                }
                if level_failed {
                    break 'levels;
                }
            }

            errors
        };

        let errors = match tokio::time::timeout(self.config.execution_deadline, body).await {
            Ok(errors) => errors,
            Err(_) => {
                error!(execution_id, "execution exceeded its deadline");
                return Err(EngineError::ExecutionTimeout);
            }
        };

        let node_results = shared.node_results.read().clone();
        let final_output = if errors.is_empty() {
            terminal_nodes_in_order(workflow, &sorted)
                .last()
                .and_then(|id| node_results.get(*id))
                .cloned()
                .unwrap_or(Value::Null)
        } else {
            Value::Null
        };

        let result = ExecutionResult {
            execution_id: execution_id.clone(),
            workflow_id: workflow.workflow_id.clone(),
            node_results,
            final_output: final_output.clone(),
            errors,
        };

        notify_all(
            &self.observers,
            ExecutionEvent::ExecutionCompleted { execution_id, final_output },
        );
        info!(workflow_id = workflow.workflow_id.as_deref().unwrap_or(""), errors = result.errors.len(), "execution finished");

        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Edge, NodeDefinition};
    use serde_json::json;

    fn node(id: &str, node_type: &str, data: Value) -> NodeDefinition {
        NodeDefinition { id: id.into(), node_type: Some(node_type.into()), data }
    }

    fn wf(nodes: Vec<NodeDefinition>, edges: Vec<Edge>) -> Workflow {
        Workflow::new(nodes, edges)
    }

    #[tokio::test]
    async fn simple_arithmetic_matches_across_sequential_and_parallel() {
        let workflow = wf(
            vec![
                node("1", "number", json!({ "value": 10.0 })),
                node("2", "number", json!({ "value": 5.0 })),
                node("3", "operation", json!({ "op": "add" })),
            ],
            vec![
                Edge { id: None, source: "1".into(), target: "3".into() },
                Edge { id: None, source: "2".into(), target: "3".into() },
            ],
        );

        let engine = Engine::new(EngineConfig::from_preset(crate::config::ConfigPreset::Validation)).unwrap();
        let sequential = engine.run_sequential(&workflow).await.unwrap();
        let parallel = engine.run_parallel(&workflow).await.unwrap();

        assert!(sequential.errors.is_empty());
        assert_eq!(sequential.node_results["3"], json!(15.0));
        assert_eq!(sequential.final_output, json!(15.0));
        assert_eq!(sequential.node_results, parallel.node_results);
        assert_eq!(sequential.final_output, parallel.final_output);
    }

    #[tokio::test]
    async fn cycle_is_rejected_before_any_executor_runs() {
        let workflow = wf(
            vec![node("1", "number", json!({"value": 1.0})), node("2", "number", json!({"value": 2.0}))],
            vec![Edge { id: None, source: "1".into(), target: "2".into() }, Edge { id: None, source: "2".into(), target: "1".into() }],
        );
        let engine = Engine::new(EngineConfig::from_preset(crate::config::ConfigPreset::Validation)).unwrap();
        let err = engine.run_sequential(&workflow).await.unwrap_err();
        assert!(matches!(err, EngineError::CycleDetected));
    }

    #[tokio::test]
    async fn failing_node_is_reported_without_aborting_the_process() {
        let workflow = wf(
            vec![node("1", "operation", json!({ "op": "divide" }))],
            vec![],
        );
        let engine = Engine::new(EngineConfig::from_preset(crate::config::ConfigPreset::Validation)).unwrap();
        let result = engine.run_sequential(&workflow).await.unwrap();
        assert!(!result.errors.is_empty());
        assert_eq!(result.final_output, Value::Null);
    }

    #[tokio::test]
    async fn condition_node_evaluates_regex_predicate_against_its_input() {
        let workflow = wf(
            vec![
                node("1", "text_input", json!({ "text": "order-4471" })),
                node("2", "condition", json!({ "condition": "regex:^order-\\d+$" })),
            ],
            vec![Edge { id: None, source: "1".into(), target: "2".into() }],
        );
        let engine = Engine::new(EngineConfig::from_preset(crate::config::ConfigPreset::Validation)).unwrap();
        let result = engine.run_sequential(&workflow).await.unwrap();
        assert!(result.errors.is_empty());
        assert_eq!(result.node_results["2"]["condition_met"], json!(true));
    }

    #[tokio::test]
    async fn text_input_interpolates_context_variables_and_constants() {
        let workflow = wf(
            vec![
                node("var", "context_variable", json!({ "context_name": "user", "context_value": "alice" })),
                node("const", "context_constant", json!({ "context_name": "host", "context_value": "api.example.com" })),
                node(
                    "tpl",
                    "text_input",
                    json!({ "text": "User {{ variable.user }} at {{ const.host }}" }),
                ),
                node("viz", "visualization", json!({})),
            ],
            vec![
                Edge { id: None, source: "var".into(), target: "tpl".into() },
                Edge { id: None, source: "const".into(), target: "tpl".into() },
                Edge { id: None, source: "tpl".into(), target: "viz".into() },
            ],
        );
        let engine = Engine::new(EngineConfig::from_preset(crate::config::ConfigPreset::Validation)).unwrap();
        let result = engine.run_sequential(&workflow).await.unwrap();
        assert!(result.errors.is_empty(), "errors: {:?}", result.errors);
        assert_eq!(result.node_results["tpl"], json!("User alice at api.example.com"));
        assert_eq!(result.final_output["value"], json!("User alice at api.example.com"));
    }

    #[tokio::test]
    async fn counter_and_variable_state_persists_across_sequential_nodes() {
        let workflow = wf(
            vec![
                node("n1", "number", json!({ "value": 7.0 })),
                node("set", "variable", json!({ "var_name": "saved", "var_op": "set" })),
                node("bump1", "counter", json!({ "counter_op": "increment", "delta": 2.0 })),
                node("bump2", "counter", json!({ "counter_op": "increment", "delta": 3.0 })),
                node("get", "variable", json!({ "var_name": "saved", "var_op": "get" })),
            ],
            vec![
                Edge { id: None, source: "n1".into(), target: "set".into() },
                Edge { id: None, source: "set".into(), target: "bump1".into() },
                Edge { id: None, source: "bump1".into(), target: "bump2".into() },
                Edge { id: None, source: "bump2".into(), target: "get".into() },
            ],
        );
        let engine = Engine::new(EngineConfig::from_preset(crate::config::ConfigPreset::Validation)).unwrap();
        let result = engine.run_sequential(&workflow).await.unwrap();
        assert!(result.errors.is_empty(), "errors: {:?}", result.errors);
        assert_eq!(result.node_results["bump1"], json!(2.0));
        assert_eq!(result.node_results["bump2"], json!(5.0));
        assert_eq!(result.node_results["get"], json!(7.0));
        assert_eq!(result.final_output, json!(7.0));
    }

    #[tokio::test]
    async fn execution_ids_are_sixteen_hex_chars_and_unique() {
        let a = random_execution_id();
        let b = random_execution_id();
        assert_eq!(a.len(), 16);
        assert!(a.chars().all(|c| c.is_ascii_hexdigit()));
        assert_ne!(a, b);
    }
}
