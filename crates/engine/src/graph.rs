//! DAG validation, topological ordering, and level computation.
//!
//! Run before any executor runs. Node IDs must be unique, every edge must
//! reference real nodes, and the graph must be acyclic. Level computation
//! additionally partitions the topological order into batches that may run
//! concurrently — every node in a level has all of its dependencies
//! resolved by the end of the previous level.

use std::cmp::Reverse;
use std::collections::{BinaryHeap, HashMap, HashSet};

use crate::config::EngineConfig;
use crate::error::EngineError;
use crate::types::Workflow;

/// Reject a workflow outright if it is too large to safely execute —
/// checked before decoding or topo-sorting a single node. Mirrors the
/// `MaxNodeCount`/`MaxEdgeCount`/`MaxWorkflowSize` caps in spec.md §4.7.
pub fn validate_workflow_size(workflow: &Workflow, config: &EngineConfig) -> Result<(), EngineError> {
    if workflow.nodes.len() > config.max_nodes {
        return Err(EngineError::LimitExceeded(format!(
            "workflow has {} nodes, exceeding the cap of {}",
            workflow.nodes.len(),
            config.max_nodes
        )));
    }
    if workflow.edges.len() > config.max_edges {
        return Err(EngineError::LimitExceeded(format!(
            "workflow has {} edges, exceeding the cap of {}",
            workflow.edges.len(),
            config.max_edges
        )));
    }
    let estimated_bytes: usize = workflow.nodes.iter().map(|n| n.data.to_string().len()).sum();
    if estimated_bytes > config.max_workflow_bytes {
        return Err(EngineError::LimitExceeded(format!(
            "workflow payload is ~{estimated_bytes} bytes, exceeding the cap of {}",
            config.max_workflow_bytes
        )));
    }
    Ok(())
}

/// Validate the workflow's DAG and return node IDs in topological order,
/// breaking ties lexicographically so the same workflow always produces
/// the same order.
pub fn topo_sort(workflow: &Workflow) -> Result<Vec<String>, EngineError> {
    let mut seen_ids: HashSet<&str> = HashSet::new();
    for node in &workflow.nodes {
        if !seen_ids.insert(node.id.as_str()) {
            return Err(EngineError::DuplicateNodeId(node.id.clone()));
        }
    }

    let node_set: HashSet<&str> = workflow.nodes.iter().map(|n| n.id.as_str()).collect();
    for edge in &workflow.edges {
        if !node_set.contains(edge.source.as_str()) {
            return Err(EngineError::UnknownNodeReference {
                node_id: edge.source.clone(),
                side: "source",
            });
        }
        if !node_set.contains(edge.target.as_str()) {
            return Err(EngineError::UnknownNodeReference {
                node_id: edge.target.clone(),
                side: "target",
            });
        }
    }

    let mut adjacency: HashMap<&str, Vec<&str>> = HashMap::new();
    let mut in_degree: HashMap<&str, usize> = HashMap::new();
    for node in &workflow.nodes {
        adjacency.entry(node.id.as_str()).or_default();
        in_degree.entry(node.id.as_str()).or_insert(0);
    }
    // Duplicate (source, target) pairs are tracked once for the in-degree
    // count, so a repeated edge doesn't make the graph look cyclic.
    let mut distinct_edges: HashSet<(&str, &str)> = HashSet::new();
    for edge in &workflow.edges {
        if edge.source == edge.target {
            return Err(EngineError::SelfEdge(edge.source.clone()));
        }
        if distinct_edges.insert((edge.source.as_str(), edge.target.as_str())) {
            adjacency.entry(edge.source.as_str()).or_default().push(edge.target.as_str());
            *in_degree.entry(edge.target.as_str()).or_insert(0) += 1;
        }
    }

    let mut ready: BinaryHeap<Reverse<&str>> = in_degree
        .iter()
        .filter(|(_, &d)| d == 0)
        .map(|(&id, _)| Reverse(id))
        .collect();

    let mut sorted: Vec<String> = Vec::with_capacity(workflow.nodes.len());
    while let Some(Reverse(node_id)) = ready.pop() {
        sorted.push(node_id.to_owned());
        if let Some(neighbours) = adjacency.get(node_id) {
            for &neighbour in neighbours {
                let deg = in_degree.entry(neighbour).or_insert(0);
                *deg -= 1;
                if *deg == 0 {
                    ready.push(Reverse(neighbour));
                }
            }
        }
    }

    if sorted.len() != workflow.nodes.len() {
        return Err(EngineError::CycleDetected);
    }
    Ok(sorted)
}

/// Partition the topological order into levels: every node in level N has
/// all of its dependencies satisfied by nodes in levels `0..N`. Nodes
/// within a level carry no edge between them and may run concurrently.
pub fn compute_levels(workflow: &Workflow, sorted: &[String]) -> Vec<Vec<String>> {
    let mut depends_on: HashMap<&str, Vec<&str>> = HashMap::new();
    for node in &workflow.nodes {
        depends_on.entry(node.id.as_str()).or_default();
    }
    for edge in &workflow.edges {
        depends_on.entry(edge.target.as_str()).or_default().push(edge.source.as_str());
    }

    let mut level_of: HashMap<&str, usize> = HashMap::new();
    let mut levels: Vec<Vec<String>> = Vec::new();

    for id in sorted {
        let deps = depends_on.get(id.as_str()).cloned().unwrap_or_default();
        let level = deps.iter().map(|d| level_of.get(d).copied().unwrap_or(0) + 1).max().unwrap_or(0);
        level_of.insert(id.as_str(), level);
        if levels.len() <= level {
            levels.push(Vec::new());
        }
        levels[level].push(id.clone());
    }

    levels
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Edge, NodeDefinition};

    fn node(id: &str) -> NodeDefinition {
        NodeDefinition { id: id.into(), node_type: Some("mock".into()), data: serde_json::Value::Null }
    }

    fn workflow(nodes: Vec<NodeDefinition>, edges: Vec<Edge>) -> Workflow {
        Workflow::new(nodes, edges)
    }

    #[test]
    fn lexicographic_tie_break() {
        let wf = workflow(vec![node("c"), node("b"), node("a")], vec![]);
        assert_eq!(topo_sort(&wf).unwrap(), vec!["a", "b", "c"]);
    }

    #[test]
    fn diamond_produces_three_levels() {
        let wf = workflow(
            vec![node("a"), node("b"), node("c"), node("d")],
            vec![
                Edge { id: None, source: "a".into(), target: "b".into() },
                Edge { id: None, source: "a".into(), target: "c".into() },
                Edge { id: None, source: "b".into(), target: "d".into() },
                Edge { id: None, source: "c".into(), target: "d".into() },
            ],
        );
        let sorted = topo_sort(&wf).unwrap();
        let levels = compute_levels(&wf, &sorted);
        assert_eq!(levels.len(), 3);
        assert_eq!(levels[0], vec!["a"]);
        assert_eq!(levels[2], vec!["d"]);
        let mut mid = levels[1].clone();
        mid.sort();
        assert_eq!(mid, vec!["b", "c"]);
    }

    #[test]
    fn cycle_is_rejected_before_levels_are_computed() {
        let wf = workflow(
            vec![node("a"), node("b")],
            vec![Edge { id: None, source: "a".into(), target: "b".into() }, Edge { id: None, source: "b".into(), target: "a".into() }],
        );
        assert!(matches!(topo_sort(&wf), Err(EngineError::CycleDetected)));
    }

    #[test]
    fn duplicate_ids_rejected() {
        let wf = workflow(vec![node("a"), node("a")], vec![]);
        assert!(matches!(topo_sort(&wf), Err(EngineError::DuplicateNodeId(id)) if id == "a"));
    }

    #[test]
    fn self_edge_is_rejected() {
        let wf = workflow(vec![node("a")], vec![Edge { id: None, source: "a".into(), target: "a".into() }]);
        assert!(matches!(topo_sort(&wf), Err(EngineError::SelfEdge(id)) if id == "a"));
    }

    #[test]
    fn duplicate_edges_are_idempotent_for_in_degree() {
        let wf = workflow(
            vec![node("a"), node("b")],
            vec![
                Edge { id: None, source: "a".into(), target: "b".into() },
                Edge { id: None, source: "a".into(), target: "b".into() },
                Edge { id: None, source: "a".into(), target: "b".into() },
            ],
        );
        assert_eq!(topo_sort(&wf).unwrap(), vec!["a", "b"]);
    }

    #[test]
    fn workflow_size_cap_rejects_too_many_nodes() {
        let wf = workflow((0..5).map(|i| node(&i.to_string())).collect(), vec![]);
        let mut cfg = EngineConfig::default();
        cfg.max_nodes = 3;
        assert!(matches!(validate_workflow_size(&wf, &cfg), Err(EngineError::LimitExceeded(_))));
    }

    #[test]
    fn workflow_within_caps_passes() {
        let wf = workflow(vec![node("a")], vec![]);
        assert!(validate_workflow_size(&wf, &EngineConfig::default()).is_ok());
    }
}
