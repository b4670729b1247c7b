//! Node-level error type.
//!
//! `ErrKind` is the small, payload-free classification every error in the
//! engine can be matched on (middleware routing, test assertions) without
//! destructuring the full `NodeError`/`EngineError` variant.

use thiserror::Error;

/// Coarse error classification shared across the node and engine crates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrKind {
    DecoderInvalidPayload,
    GraphInvalid,
    BadConfig,
    Arith,
    TypeMismatch,
    Timeout,
    RateLimited,
    LimitExceeded,
    Http,
    NotFound,
    ObserverPanic,
}

/// Errors returned by a node's `execute` method.
#[derive(Debug, Error, Clone)]
pub enum NodeError {
    /// Missing required field, unknown operator, unparsable duration, …
    #[error("{0}")]
    BadConfig(String),

    /// Division/modulo by zero, numeric overflow.
    #[error("{0}")]
    Arith(String),

    /// Input was not of the shape the executor expected.
    #[error("{0}")]
    TypeMismatch(String),

    /// Per-node deadline exceeded.
    #[error("{0}")]
    Timeout(String),

    /// Rate-limit middleware rejected the call before dispatch.
    #[error("{0}")]
    RateLimited(String),

    /// A resource cap (executions, HTTP calls, size) was exceeded.
    #[error("{0}")]
    LimitExceeded(String),

    /// Network failure, SSRF rejection, status >= 400, body too large.
    #[error("{0}")]
    Http(String),

    /// Variable/cache lookup found nothing.
    #[error("{0}")]
    NotFound(String),

    /// Anything else — treated as a non-retryable failure by default.
    #[error("{0}")]
    Fatal(String),
}

impl NodeError {
    pub fn kind(&self) -> ErrKind {
        match self {
            NodeError::BadConfig(_) => ErrKind::BadConfig,
            NodeError::Arith(_) => ErrKind::Arith,
            NodeError::TypeMismatch(_) => ErrKind::TypeMismatch,
            NodeError::Timeout(_) => ErrKind::Timeout,
            NodeError::RateLimited(_) => ErrKind::RateLimited,
            NodeError::LimitExceeded(_) => ErrKind::LimitExceeded,
            NodeError::Http(_) => ErrKind::Http,
            NodeError::NotFound(_) => ErrKind::NotFound,
            NodeError::Fatal(_) => ErrKind::BadConfig,
        }
    }

    /// Whether this error kind is, in principle, worth retrying.
    /// The `retry` executor still filters by `retry_on_errors` patterns on
    /// top of this — this is just the default when that list is empty.
    pub fn is_transient(&self) -> bool {
        matches!(
            self.kind(),
            ErrKind::Timeout | ErrKind::Http | ErrKind::RateLimited
        )
    }

    pub fn message(&self) -> &str {
        match self {
            NodeError::BadConfig(m)
            | NodeError::Arith(m)
            | NodeError::TypeMismatch(m)
            | NodeError::Timeout(m)
            | NodeError::RateLimited(m)
            | NodeError::LimitExceeded(m)
            | NodeError::Http(m)
            | NodeError::NotFound(m)
            | NodeError::Fatal(m) => m,
        }
    }
}
