//! Built-in node executors and the registry that dispatches by type tag.

mod accumulator;
mod cache_node;
mod condition;
mod context_node;
mod control;
mod counter;
mod custom;
mod delay;
mod expression;
mod extract;
mod fanout;
mod http_node;
mod io_nodes;
mod loops;
mod numeric;
mod operation;
mod predicate;
mod switch;
mod text_operation;
mod transform;
mod variable;
mod visualization;

use std::collections::HashMap;
use std::sync::Arc;

use crate::traits::ExecutableNode;

/// Maps a node type tag to its executor. Built once at startup and shared
/// (read-only) across every concurrent execution.
#[derive(Clone)]
pub struct Registry {
    executors: HashMap<&'static str, Arc<dyn ExecutableNode>>,
}

impl Registry {
    pub fn get(&self, type_tag: &str) -> Option<Arc<dyn ExecutableNode>> {
        self.executors.get(type_tag).cloned()
    }

    pub fn register(&mut self, executor: Arc<dyn ExecutableNode>) {
        self.executors.insert(executor.type_tag(), executor);
    }

    /// Register `executor` under an additional tag — used for `reduce`,
    /// which decodes to the same `NodeData::Expression` variant as
    /// `expression` and is dispatched by the same executor.
    pub fn alias(&mut self, tag: &'static str, executor: Arc<dyn ExecutableNode>) {
        self.executors.insert(tag, executor);
    }

    pub fn contains(&self, type_tag: &str) -> bool {
        self.executors.contains_key(type_tag)
    }
}

/// Construct the registry with every built-in executor installed.
pub fn build_registry() -> Registry {
    let mut registry = Registry { executors: HashMap::new() };

    registry.register(Arc::new(io_nodes::NumberExecutor));
    registry.register(Arc::new(io_nodes::TextInputExecutor));
    registry.register(Arc::new(io_nodes::BooleanInputExecutor));
    registry.register(Arc::new(io_nodes::DateInputExecutor));
    registry.register(Arc::new(io_nodes::DatetimeInputExecutor));

    registry.register(Arc::new(operation::OperationExecutor));
    registry.register(Arc::new(text_operation::TextOperationExecutor));
    registry.register(Arc::new(http_node::HttpExecutor::new()));

    registry.register(Arc::new(condition::ConditionExecutor));
    registry.register(Arc::new(condition::FilterExecutor));
    let expression_executor: Arc<dyn ExecutableNode> = Arc::new(expression::ExpressionExecutor);
    registry.register(expression_executor.clone());
    registry.alias("reduce", expression_executor);

    registry.register(Arc::new(loops::ForEachExecutor));
    registry.register(Arc::new(loops::WhileLoopExecutor));

    registry.register(Arc::new(variable::VariableExecutor));
    registry.register(Arc::new(extract::ExtractExecutor));
    registry.register(Arc::new(transform::TransformExecutor));
    registry.register(Arc::new(accumulator::AccumulatorExecutor));
    registry.register(Arc::new(counter::CounterExecutor));
    registry.register(Arc::new(switch::SwitchExecutor));

    registry.register(Arc::new(fanout::ParallelExecutor));
    registry.register(Arc::new(fanout::JoinExecutor));
    registry.register(Arc::new(fanout::SplitExecutor));

    registry.register(Arc::new(delay::DelayExecutor));
    registry.register(Arc::new(cache_node::CacheExecutor));

    registry.register(Arc::new(control::RetryExecutor));
    registry.register(Arc::new(control::TryCatchExecutor));
    registry.register(Arc::new(control::TimeoutExecutor));

    registry.register(Arc::new(context_node::ContextVariableExecutor));
    registry.register(Arc::new(context_node::ContextConstantExecutor));
    registry.register(Arc::new(visualization::VisualizationExecutor));
    registry.register(Arc::new(custom::CustomExecutor));

    registry
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn registry_covers_every_declared_type_tag() {
        let registry = build_registry();
        for tag in [
            "number",
            "text_input",
            "boolean_input",
            "date_input",
            "datetime_input",
            "operation",
            "text_operation",
            "http",
            "condition",
            "filter",
            "expression",
            "reduce",
            "for_each",
            "while_loop",
            "variable",
            "extract",
            "transform",
            "accumulator",
            "counter",
            "switch",
            "parallel",
            "join",
            "split",
            "delay",
            "cache",
            "retry",
            "try_catch",
            "timeout",
            "context_variable",
            "context_constant",
            "visualization",
            "custom",
        ] {
            assert!(registry.contains(tag), "missing executor for '{tag}'");
        }
    }
}
