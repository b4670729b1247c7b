//! The literal-input source nodes: `number`, `text_input`, `boolean_input`,
//! `date_input`, `datetime_input`. Each simply re-emits its own config as a
//! JSON scalar, giving a DAG a typed starting point. `text_input` is the one
//! exception: its `text` field is run through template interpolation first,
//! so a constant can reference `{{ variable.NAME }}` / `{{ const.NAME }}`.

use async_trait::async_trait;
use serde_json::{json, Value};

use crate::data::NodeData;
use crate::error::NodeError;
use crate::traits::{ExecutableNode, ExecutionContext};

macro_rules! scalar_node {
    ($exec:ident, $tag:literal, $variant:path, $field:ident) => {
        pub struct $exec;

        #[async_trait]
        impl ExecutableNode for $exec {
            fn type_tag(&self) -> &'static str {
                $tag
            }

            async fn execute(&self, data: &NodeData, _ctx: &dyn ExecutionContext) -> Result<Value, NodeError> {
                match data {
                    $variant(d) => Ok(json!(d.$field)),
                    _ => Err(NodeError::BadConfig(format!("{} executor received mismatched data", $tag))),
                }
            }
        }
    };
}

scalar_node!(NumberExecutor, "number", NodeData::Number, value);

pub struct TextInputExecutor;

#[async_trait]
impl ExecutableNode for TextInputExecutor {
    fn type_tag(&self) -> &'static str {
        "text_input"
    }

    async fn execute(&self, data: &NodeData, ctx: &dyn ExecutionContext) -> Result<Value, NodeError> {
        match data {
            NodeData::TextInput(d) => Ok(json!(ctx.interpolate(&d.text))),
            _ => Err(NodeError::BadConfig("text_input executor received mismatched data".into())),
        }
    }
}

scalar_node!(
    BooleanInputExecutor,
    "boolean_input",
    NodeData::BooleanInput,
    boolean_value
);
scalar_node!(DateInputExecutor, "date_input", NodeData::DateInput, date_value);
scalar_node!(
    DatetimeInputExecutor,
    "datetime_input",
    NodeData::DatetimeInput,
    datetime_value
);
