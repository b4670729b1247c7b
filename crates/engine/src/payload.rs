//! Two-pass payload decoding: the raw workflow envelope is already typed
//! by [`crate::types::Workflow`]; this module resolves each node's `type`
//! (inferring it from `config`'s shape when absent) and decodes `config`
//! into a [`nodes::NodeData`] variant, failing fast on the first invalid
//! node.

use std::collections::HashMap;

use nodes::data::infer_type;
use nodes::NodeData;

use crate::error::EngineError;
use crate::types::Workflow;

/// Decoded node data, keyed by node id, produced once per execution and
/// shared read-only across every node invocation.
pub type DecodedNodes = HashMap<String, NodeData>;

/// Resolve every node's type tag and decode its config. Returns the
/// decoded map plus the (possibly inferred) type tag to use for registry
/// dispatch — `NodeData::type_tag()` is authoritative once decoded.
pub fn decode_workflow(workflow: &Workflow) -> Result<DecodedNodes, EngineError> {
    let mut decoded = HashMap::with_capacity(workflow.nodes.len());

    for node in &workflow.nodes {
        let type_tag = match &node.node_type {
            Some(t) if !t.is_empty() => t.clone(),
            _ => infer_type(&node.data)
                .map(str::to_owned)
                .unwrap_or_else(|| "custom".to_owned()),
        };

        let data = NodeData::decode(&type_tag, &node.data).map_err(|e| EngineError::DecoderInvalidPayload {
            node_id: node.id.clone(),
            field: e.message().to_owned(),
        })?;

        decoded.insert(node.id.clone(), data);
    }

    Ok(decoded)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Edge, NodeDefinition};
    use serde_json::json;

    fn wf(nodes: Vec<NodeDefinition>) -> Workflow {
        Workflow::new(nodes, Vec::<Edge>::new())
    }

    #[test]
    fn decodes_declared_type() {
        let workflow = wf(vec![NodeDefinition {
            id: "n1".into(),
            node_type: Some("number".into()),
            data: json!({ "value": 5.0 }),
        }]);
        let decoded = decode_workflow(&workflow).unwrap();
        assert!(matches!(decoded.get("n1"), Some(NodeData::Number(_))));
    }

    #[test]
    fn infers_type_when_absent() {
        let workflow = wf(vec![NodeDefinition {
            id: "n1".into(),
            node_type: None,
            data: json!({ "text": "hi" }),
        }]);
        let decoded = decode_workflow(&workflow).unwrap();
        assert!(matches!(decoded.get("n1"), Some(NodeData::TextInput(_))));
    }

    #[test]
    fn unresolvable_shape_falls_back_to_custom() {
        let workflow = wf(vec![NodeDefinition {
            id: "n1".into(),
            node_type: None,
            data: json!({ "mystery_field": 1 }),
        }]);
        let decoded = decode_workflow(&workflow).unwrap();
        assert!(matches!(decoded.get("n1"), Some(NodeData::Custom(_))));
    }

    #[test]
    fn invalid_payload_reports_node_id() {
        let workflow = wf(vec![NodeDefinition {
            id: "bad".into(),
            node_type: Some("operation".into()),
            data: json!({}),
        }]);
        let err = decode_workflow(&workflow).unwrap_err();
        assert!(matches!(err, EngineError::DecoderInvalidPayload { node_id, .. } if node_id == "bad"));
    }
}
