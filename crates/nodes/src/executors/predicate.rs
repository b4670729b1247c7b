//! Shared boolean-predicate grammar used by `condition`, `filter`,
//! `while_loop`, and `switch`'s `when` clauses.
//!
//! A predicate is evaluated against the node's first input (after template
//! interpolation of the predicate string itself): `>N|<N|>=N|<=N|==N|!=N`
//! compares the input numerically against the literal `N`; `true`/`false`
//! are literal booleans, ignoring the input; `regex:PATTERN` matches the
//! pattern against the input's text form. A non-numeric input against a
//! numeric predicate evaluates to `false`.

use serde_json::Value;

use crate::error::NodeError;
use crate::traits::ExecutionContext;

fn value_to_text(v: &Value) -> String {
    match v {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn value_to_f64(v: &Value) -> Option<f64> {
    match v {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    }
}

const NUMERIC_OPERATORS: &[&str] = &[">=", "<=", "==", "!=", ">", "<"];

pub fn eval_predicate(raw: &str, ctx: &dyn ExecutionContext) -> Result<bool, NodeError> {
    let interpolated = ctx.interpolate(raw);
    let trimmed = interpolated.trim();

    match trimmed {
        "true" => return Ok(true),
        "false" => return Ok(false),
        _ => {}
    }

    if let Some(pattern) = trimmed.strip_prefix("regex:") {
        let re = regex::Regex::new(pattern)
            .map_err(|e| NodeError::BadConfig(format!("invalid regex predicate '{pattern}': {e}")))?;
        let subject = ctx.input().map(value_to_text).unwrap_or_default();
        return Ok(re.is_match(&subject));
    }

    for op in NUMERIC_OPERATORS {
        if let Some(rest) = trimmed.strip_prefix(op) {
            let threshold: f64 = rest
                .trim()
                .parse()
                .map_err(|_| NodeError::BadConfig(format!("predicate '{trimmed}' has a non-numeric operand")))?;
            let Some(input) = ctx.input().and_then(value_to_f64) else {
                return Ok(false);
            };
            return Ok(compare(input, *op, threshold));
        }
    }

    Err(NodeError::BadConfig(format!("unrecognized predicate '{trimmed}'")))
}

fn compare(left: f64, op: &str, right: f64) -> bool {
    match op {
        "==" => (left - right).abs() < f64::EPSILON,
        "!=" => (left - right).abs() >= f64::EPSILON,
        ">=" => left >= right,
        "<=" => left <= right,
        ">" => left > right,
        "<" => left < right,
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FixedInputContext {
        input: Option<Value>,
    }

    #[async_trait::async_trait]
    impl ExecutionContext for FixedInputContext {
        fn node_id(&self) -> &str {
            "n"
        }
        fn inputs(&self) -> &[Value] {
            std::slice::from_ref(self.input.as_ref().unwrap_or(&Value::Null))
        }
        fn input(&self) -> Option<&Value> {
            self.input.as_ref()
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
        fn cache_set(&self, _: &str, _: Value, _: Option<std::time::Duration>) {}
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
            unimplemented!("not exercised by predicate tests")
        }
        fn default_max_iterations(&self) -> usize {
            100
        }
        fn default_cache_ttl(&self) -> std::time::Duration {
            std::time::Duration::from_secs(60)
        }
        async fn dispatch_child(&self, _: &str, _: &crate::data::NodeData) -> Result<Value, NodeError> {
            unimplemented!("not exercised by predicate tests")
        }
    }

    fn ctx(input: Value) -> FixedInputContext {
        FixedInputContext { input: Some(input) }
    }

    #[test]
    fn numeric_operators_compare_without_spaces() {
        assert!(eval_predicate(">100", &ctx(Value::from(150))).unwrap());
        assert!(!eval_predicate(">100", &ctx(Value::from(50))).unwrap());
        assert!(eval_predicate("<=100", &ctx(Value::from(100))).unwrap());
        assert!(eval_predicate("==5", &ctx(Value::from(5))).unwrap());
        assert!(eval_predicate("!=5", &ctx(Value::from(6))).unwrap());
    }

    #[test]
    fn non_numeric_input_against_numeric_predicate_is_false() {
        assert!(!eval_predicate(">100", &ctx(Value::String("not a number".into()))).unwrap());
    }

    #[test]
    fn literal_booleans_ignore_input() {
        assert!(eval_predicate("true", &ctx(Value::from(0))).unwrap());
        assert!(!eval_predicate("false", &ctx(Value::from(999))).unwrap());
    }

    #[test]
    fn regex_matches_against_input_text() {
        assert!(eval_predicate("regex:^order-\\d+$", &ctx(Value::String("order-42".into()))).unwrap());
        assert!(!eval_predicate("regex:^order-\\d+$", &ctx(Value::String("nope".into()))).unwrap());
    }
}
