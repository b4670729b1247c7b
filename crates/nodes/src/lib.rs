//! `nodes` crate — the `ExecutableNode` contract and the built-in executors.
//!
//! Every node — built-in and plugin alike — implements [`ExecutableNode`].
//! The engine dispatches execution through this trait object, reaching the
//! rest of the running workflow only through [`traits::ExecutionContext`].

pub mod data;
pub mod duration;
pub mod error;
pub mod executors;
pub mod http;
pub mod mock;
pub mod traits;

pub use data::NodeData;
pub use error::{ErrKind, NodeError};
pub use executors::{build_registry, Registry};
pub use http::{HttpClient, HttpPolicy};
pub use traits::{ExecutableNode, ExecutionContext};
