//! Engine-level error types.
//!
//! Every variant maps to a [`nodes::ErrKind`] so middleware and API
//! handlers can branch on category without matching the full enum.

use nodes::{ErrKind, NodeError};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("duplicate node ID: '{0}'")]
    DuplicateNodeId(String),

    #[error("edge references unknown node '{node_id}' ({side} side)")]
    UnknownNodeReference { node_id: String, side: &'static str },

    #[error("workflow graph contains a cycle")]
    CycleDetected,

    #[error("node '{0}' has a self-edge, which is forbidden")]
    SelfEdge(String),

    #[error("node '{node_id}' has an invalid payload: {field}")]
    DecoderInvalidPayload { node_id: String, field: String },

    #[error("node '{node_id}' has no registered executor for type '{type_tag}'")]
    UnknownNodeType { node_id: String, type_tag: String },

    #[error("node '{node_id}' failed: {source}")]
    NodeFailed { node_id: String, #[source] source: NodeError },

    #[error("execution exceeded its deadline")]
    ExecutionTimeout,

    #[error("a resource limit was exceeded: {0}")]
    LimitExceeded(String),

    #[error("rate limit exceeded: {0}")]
    RateLimited(String),

    #[error("observer '{observer}' panicked: {message}")]
    ObserverPanic { observer: String, message: String },

    #[error("invalid engine configuration: {0}")]
    BadConfig(String),
}

impl EngineError {
    pub fn kind(&self) -> ErrKind {
        match self {
            EngineError::DuplicateNodeId(_)
            | EngineError::UnknownNodeReference { .. }
            | EngineError::CycleDetected
            | EngineError::SelfEdge(_) => ErrKind::GraphInvalid,
            EngineError::DecoderInvalidPayload { .. } => ErrKind::DecoderInvalidPayload,
            EngineError::UnknownNodeType { .. } => ErrKind::NotFound,
            EngineError::NodeFailed { source, .. } => source.kind(),
            EngineError::ExecutionTimeout => ErrKind::Timeout,
            EngineError::LimitExceeded(_) => ErrKind::LimitExceeded,
            EngineError::RateLimited(_) => ErrKind::RateLimited,
            EngineError::ObserverPanic { .. } => ErrKind::ObserverPanic,
            EngineError::BadConfig(_) => ErrKind::BadConfig,
        }
    }
}
