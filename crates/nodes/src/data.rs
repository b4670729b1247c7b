//! `NodeData` — the tagged union carried by every [`crate::ExecutableNode`].
//!
//! A node's `data` field in the workflow JSON is decoded into exactly one of
//! these variants, either because the node declared a `type` or because the
//! raw object was probed for a signature field (see [`infer_type`]). Unknown
//! types land in `NodeData::Custom`, carrying the raw field map unchanged —
//! the "custom executor" dispatch may consume or reject it.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::NodeError;

// ---------------------------------------------------------------------------
// Per-type config structs
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct NumberData {
    pub value: f64,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TextInputData {
    pub text: String,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct BooleanInputData {
    pub boolean_value: bool,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DateInputData {
    pub date_value: String,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DatetimeInputData {
    pub datetime_value: String,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct OperationData {
    pub op: String,
}

#[derive(Debug, Clone, Deserialize, Serialize, Default)]
pub struct TextOperationData {
    pub text_op: String,
    #[serde(default)]
    pub separator: Option<String>,
    #[serde(default)]
    pub pattern: Option<String>,
    #[serde(default)]
    pub replacement: Option<String>,
    #[serde(default)]
    pub start: Option<i64>,
    #[serde(default)]
    pub length: Option<i64>,
    #[serde(default)]
    pub count: Option<usize>,
}

#[derive(Debug, Clone, Deserialize, Serialize, Default)]
pub struct HttpData {
    pub url: String,
    #[serde(default)]
    pub method: Option<String>,
    #[serde(default)]
    pub headers: Option<HashMap<String, String>>,
    #[serde(default)]
    pub body: Option<Value>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ConditionData {
    pub condition: String,
    #[serde(default)]
    pub true_path: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Serialize, Default)]
pub struct ForEachData {
    #[serde(default)]
    pub max_iterations: Option<usize>,
}

#[derive(Debug, Clone, Deserialize, Serialize, Default)]
pub struct WhileLoopData {
    pub condition: String,
    #[serde(default)]
    pub max_iterations: Option<usize>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct VariableData {
    pub var_name: String,
    pub var_op: String,
}

#[derive(Debug, Clone, Deserialize, Serialize, Default)]
pub struct ExtractData {
    #[serde(default)]
    pub field: Option<String>,
    #[serde(default)]
    pub fields: Option<Vec<String>>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TransformData {
    pub transform_type: String,
}

#[derive(Debug, Clone, Deserialize, Serialize, Default)]
pub struct AccumulatorData {
    pub accum_op: String,
    #[serde(default)]
    pub initial_value: Option<Value>,
}

#[derive(Debug, Clone, Deserialize, Serialize, Default)]
pub struct CounterData {
    pub counter_op: String,
    #[serde(default)]
    pub delta: Option<f64>,
}

#[derive(Debug, Clone, Deserialize, Serialize, Default)]
pub struct SwitchCase {
    #[serde(default)]
    pub value: Option<Value>,
    #[serde(default)]
    pub when: Option<String>,
    #[serde(default)]
    pub output_path: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Serialize, Default)]
pub struct SwitchData {
    pub cases: Vec<SwitchCase>,
    #[serde(default)]
    pub default_path: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Serialize, Default)]
pub struct ParallelData {
    #[serde(default)]
    pub max_concurrency: Option<usize>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct JoinData {
    pub join_strategy: String,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SplitData {
    pub paths: Vec<String>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DelayData {
    pub duration: String,
}

#[derive(Debug, Clone, Deserialize, Serialize, Default)]
pub struct CacheData {
    pub cache_op: String,
    pub cache_key: String,
    #[serde(default)]
    pub ttl: Option<String>,
    #[serde(default)]
    pub value: Option<Value>,
}

/// An embedded child step, used by the control-flow wrapper nodes
/// (`retry`, `try_catch`, `timeout`) in place of a nested sub-workflow —
/// see SPEC_FULL.md §5.6.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
pub struct ChildSpec {
    #[serde(default, rename = "type")]
    pub r#type: Option<String>,
    #[serde(default)]
    pub data: Value,
}

#[derive(Debug, Clone, Deserialize, Serialize, Default)]
pub struct RetryData {
    #[serde(default)]
    pub max_attempts: Option<u32>,
    #[serde(default)]
    pub backoff_strategy: Option<String>,
    #[serde(default)]
    pub max_delay: Option<String>,
    #[serde(default)]
    pub retry_on_errors: Option<Vec<String>>,
    #[serde(default)]
    pub child: ChildSpec,
}

#[derive(Debug, Clone, Deserialize, Serialize, Default)]
pub struct TryCatchData {
    #[serde(default)]
    pub fallback_value: Option<Value>,
    #[serde(default)]
    pub continue_on_error: Option<bool>,
    #[serde(default)]
    pub child: ChildSpec,
}

#[derive(Debug, Clone, Deserialize, Serialize, Default)]
pub struct TimeoutData {
    pub timeout: String,
    #[serde(default)]
    pub timeout_action: Option<String>,
    #[serde(default)]
    pub child: ChildSpec,
}

#[derive(Debug, Clone, Copy, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ContextValueType {
    String,
    Number,
    Boolean,
    TimeString,
    EpochSecond,
    EpochMs,
    Null,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ContextEntry {
    pub name: String,
    #[serde(default)]
    pub value: Value,
    pub r#type: ContextValueType,
}

#[derive(Debug, Clone, Deserialize, Serialize, Default)]
pub struct ContextVariableData {
    // Legacy single-value shape.
    #[serde(default)]
    pub context_name: Option<String>,
    #[serde(default)]
    pub context_value: Option<Value>,
    // New list-of-typed-values shape.
    #[serde(default)]
    pub context_values: Option<Vec<ContextEntry>>,
}

#[derive(Debug, Clone, Deserialize, Serialize, Default)]
pub struct VisualizationData {
    #[serde(default)]
    pub mode: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Serialize, Default)]
pub struct FilterData {
    pub condition: String,
}

#[derive(Debug, Clone, Deserialize, Serialize, Default)]
pub struct ExpressionData {
    pub expression: String,
    #[serde(default)]
    pub initial_value: Option<Value>,
}

// ---------------------------------------------------------------------------
// NodeData — the tagged union
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub enum NodeData {
    Number(NumberData),
    TextInput(TextInputData),
    BooleanInput(BooleanInputData),
    DateInput(DateInputData),
    DatetimeInput(DatetimeInputData),
    Operation(OperationData),
    TextOperation(TextOperationData),
    Http(HttpData),
    Condition(ConditionData),
    Filter(FilterData),
    Expression(ExpressionData),
    ForEach(ForEachData),
    WhileLoop(WhileLoopData),
    Variable(VariableData),
    Extract(ExtractData),
    Transform(TransformData),
    Accumulator(AccumulatorData),
    Counter(CounterData),
    Switch(SwitchData),
    Parallel(ParallelData),
    Join(JoinData),
    Split(SplitData),
    Delay(DelayData),
    Cache(CacheData),
    Retry(RetryData),
    TryCatch(TryCatchData),
    Timeout(TimeoutData),
    ContextVariable(ContextVariableData),
    ContextConstant(ContextVariableData),
    Visualization(VisualizationData),
    Custom(serde_json::Map<String, Value>),
}

impl NodeData {
    /// The canonical type tag for this variant — what `registry.dispatch`
    /// keys on, and what gets written back if the type was inferred.
    pub fn type_tag(&self) -> &'static str {
        match self {
            NodeData::Number(_) => "number",
            NodeData::TextInput(_) => "text_input",
            NodeData::BooleanInput(_) => "boolean_input",
            NodeData::DateInput(_) => "date_input",
            NodeData::DatetimeInput(_) => "datetime_input",
            NodeData::Operation(_) => "operation",
            NodeData::TextOperation(_) => "text_operation",
            NodeData::Http(_) => "http",
            NodeData::Condition(_) => "condition",
            NodeData::Filter(_) => "filter",
            NodeData::Expression(_) => "expression",
            NodeData::ForEach(_) => "for_each",
            NodeData::WhileLoop(_) => "while_loop",
            NodeData::Variable(_) => "variable",
            NodeData::Extract(_) => "extract",
            NodeData::Transform(_) => "transform",
            NodeData::Accumulator(_) => "accumulator",
            NodeData::Counter(_) => "counter",
            NodeData::Switch(_) => "switch",
            NodeData::Parallel(_) => "parallel",
            NodeData::Join(_) => "join",
            NodeData::Split(_) => "split",
            NodeData::Delay(_) => "delay",
            NodeData::Cache(_) => "cache",
            NodeData::Retry(_) => "retry",
            NodeData::TryCatch(_) => "try_catch",
            NodeData::Timeout(_) => "timeout",
            NodeData::ContextVariable(_) => "context_variable",
            NodeData::ContextConstant(_) => "context_constant",
            NodeData::Visualization(_) => "visualization",
            NodeData::Custom(_) => "custom",
        }
    }

    /// Decode `raw` as the variant named by `type_tag`.
    pub fn decode(type_tag: &str, raw: &Value) -> Result<NodeData, NodeError> {
        let bad = |e: serde_json::Error| {
            NodeError::BadConfig(format!("invalid data for type '{type_tag}': {e}"))
        };
        let v = raw.clone();
        Ok(match type_tag {
            "number" => NodeData::Number(serde_json::from_value(v).map_err(bad)?),
            "text_input" => NodeData::TextInput(serde_json::from_value(v).map_err(bad)?),
            "boolean_input" => NodeData::BooleanInput(serde_json::from_value(v).map_err(bad)?),
            "date_input" => NodeData::DateInput(serde_json::from_value(v).map_err(bad)?),
            "datetime_input" => NodeData::DatetimeInput(serde_json::from_value(v).map_err(bad)?),
            "operation" => NodeData::Operation(serde_json::from_value(v).map_err(bad)?),
            "text_operation" => NodeData::TextOperation(serde_json::from_value(v).map_err(bad)?),
            "http" => NodeData::Http(serde_json::from_value(v).map_err(bad)?),
            "condition" => NodeData::Condition(serde_json::from_value(v).map_err(bad)?),
            "filter" => NodeData::Filter(serde_json::from_value(v).map_err(bad)?),
            "expression" | "reduce" => NodeData::Expression(serde_json::from_value(v).map_err(bad)?),
            "for_each" => NodeData::ForEach(serde_json::from_value(v).map_err(bad)?),
            "while_loop" => NodeData::WhileLoop(serde_json::from_value(v).map_err(bad)?),
            "variable" => NodeData::Variable(serde_json::from_value(v).map_err(bad)?),
            "extract" => NodeData::Extract(serde_json::from_value(v).map_err(bad)?),
            "transform" => NodeData::Transform(serde_json::from_value(v).map_err(bad)?),
            "accumulator" => NodeData::Accumulator(serde_json::from_value(v).map_err(bad)?),
            "counter" => NodeData::Counter(serde_json::from_value(v).map_err(bad)?),
            "switch" => NodeData::Switch(serde_json::from_value(v).map_err(bad)?),
            "parallel" => NodeData::Parallel(serde_json::from_value(v).map_err(bad)?),
            "join" => NodeData::Join(serde_json::from_value(v).map_err(bad)?),
            "split" => NodeData::Split(serde_json::from_value(v).map_err(bad)?),
            "delay" => NodeData::Delay(serde_json::from_value(v).map_err(bad)?),
            "cache" => NodeData::Cache(serde_json::from_value(v).map_err(bad)?),
            "retry" => NodeData::Retry(serde_json::from_value(v).map_err(bad)?),
            "try_catch" => NodeData::TryCatch(serde_json::from_value(v).map_err(bad)?),
            "timeout" => NodeData::Timeout(serde_json::from_value(v).map_err(bad)?),
            "context_variable" => NodeData::ContextVariable(serde_json::from_value(v).map_err(bad)?),
            "context_constant" => NodeData::ContextConstant(serde_json::from_value(v).map_err(bad)?),
            "visualization" => NodeData::Visualization(serde_json::from_value(v).map_err(bad)?),
            _ => {
                let map = v.as_object().cloned().unwrap_or_default();
                NodeData::Custom(map)
            }
        })
    }
}

/// Probe `raw` for a signature field and return the inferred type tag,
/// following the fixed priority order from SPEC_FULL.md §7 (spec.md §6).
/// Returns `None` when nothing matches — the caller falls back to `custom`.
pub fn infer_type(raw: &Value) -> Option<&'static str> {
    let obj = raw.as_object()?;

    // Priority 1
    if obj.contains_key("value") {
        return Some("number");
    }
    if obj.contains_key("text") {
        return Some("text_input");
    }
    if obj.contains_key("boolean_value") {
        return Some("boolean_input");
    }
    if obj.contains_key("date_value") {
        return Some("date_input");
    }
    if obj.contains_key("datetime_value") {
        return Some("datetime_input");
    }
    if obj.contains_key("mode") {
        return Some("visualization");
    }

    // Priority 2
    if obj.contains_key("op") {
        return Some("operation");
    }
    if obj.contains_key("text_op") {
        return Some("text_operation");
    }
    if obj.contains_key("url") {
        return Some("http");
    }

    // Priority 3
    if obj.contains_key("condition") && obj.contains_key("true_path") {
        return Some("condition");
    }
    if obj.contains_key("condition") {
        return Some("filter");
    }
    if obj.contains_key("expression") {
        return Some(if obj.contains_key("initial_value") {
            "reduce"
        } else {
            "expression"
        });
    }

    // Priority 4
    if obj.contains_key("var_name") && obj.contains_key("var_op") {
        return Some("variable");
    }
    if obj.contains_key("field") || obj.contains_key("fields") {
        return Some("extract");
    }
    if obj.contains_key("transform_type") {
        return Some("transform");
    }
    if obj.contains_key("accum_op") {
        return Some("accumulator");
    }
    if obj.contains_key("counter_op") {
        return Some("counter");
    }

    // Priority 5
    if obj.contains_key("cases") {
        return Some("switch");
    }
    if obj.contains_key("join_strategy") {
        return Some("join");
    }
    if obj.contains_key("paths") {
        return Some("split");
    }
    if obj.contains_key("duration") {
        return Some("delay");
    }
    if obj.contains_key("cache_op") && obj.contains_key("cache_key") {
        return Some("cache");
    }

    // Priority 6
    if obj.contains_key("context_name") || obj.contains_key("context_values") {
        return Some("context_variable");
    }

    // Priority 7
    if obj.contains_key("max_attempts") || obj.contains_key("backoff_strategy") {
        return Some("retry");
    }
    if obj.contains_key("fallback_value") || obj.contains_key("continue_on_error") {
        return Some("try_catch");
    }
    if obj.contains_key("timeout") && obj.contains_key("timeout_action") {
        return Some("timeout");
    }

    // Priority 8: custom
    None
}
