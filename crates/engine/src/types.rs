//! Core domain models for the workflow engine — the envelope shape every
//! workflow JSON document decodes into before per-node payloads are
//! resolved (see [`crate::payload`]).

use serde::{Deserialize, Serialize};

/// A single step in the workflow graph, still carrying its data as raw
/// JSON — [`crate::payload::decode_workflow`] turns `data` into a typed
/// `nodes::NodeData` per node.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodeDefinition {
    pub id: String,
    /// Declared type tag. Absent or empty triggers signature-based
    /// inference from `data` (see `nodes::data::infer_type`).
    #[serde(rename = "type", default)]
    pub node_type: Option<String>,
    #[serde(default)]
    pub data: serde_json::Value,
}

/// Directed edge from one node to another.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Edge {
    #[serde(default)]
    pub id: Option<String>,
    pub source: String,
    pub target: String,
}

/// A complete workflow definition.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Workflow {
    #[serde(default)]
    pub workflow_id: Option<String>,
    pub nodes: Vec<NodeDefinition>,
    pub edges: Vec<Edge>,
}

impl Workflow {
    /// Convenience constructor for tests.
    pub fn new(nodes: Vec<NodeDefinition>, edges: Vec<Edge>) -> Self {
        Self { workflow_id: None, nodes, edges }
    }
}
