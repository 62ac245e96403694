//! Error types for graph construction and execution.

use thiserror::Error;

/// A boxed error from a node's own domain (retrieval, generation, ...).
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Errors returned by a single node.
#[derive(Debug, Error)]
pub enum NodeError {
    /// The node observed the invocation's cancellation signal.
    #[error("node cancelled")]
    Cancelled,

    /// A required input slot was absent.
    #[error("missing input slot '{0}'")]
    MissingInput(String),

    /// An input slot held a value of the wrong shape.
    #[error("invalid input slot '{key}': {message}")]
    InvalidInput { key: String, message: String },

    /// The node's work failed.
    #[error(transparent)]
    Failed(BoxError),
}

impl NodeError {
    pub fn failed(error: impl Into<BoxError>) -> Self {
        Self::Failed(error.into())
    }

    pub fn invalid_input(key: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidInput { key: key.into(), message: message.into() }
    }
}

/// Errors returned by graph compilation or invocation.
#[derive(Debug, Error)]
pub enum GraphError {
    /// The graph structure is not a valid DAG.
    #[error("invalid graph: {0}")]
    InvalidGraph(String),

    /// A node failed; downstream nodes that had not finished were cancelled.
    #[error("node '{node}' failed: {source}")]
    NodeFailed {
        /// The failing node.
        node: String,
        /// Nodes that never ran or were interrupted because of the failure.
        cancelled: Vec<String>,
        #[source]
        source: NodeError,
    },

    /// The invocation's cancellation signal fired.
    #[error("graph execution cancelled")]
    Cancelled,

    /// The background task driving a streamed invocation died.
    #[error("graph execution aborted: {0}")]
    Aborted(String),
}

impl GraphError {
    /// The name of the failing node, if this is a node failure.
    pub fn node(&self) -> Option<&str> {
        match self {
            Self::NodeFailed { node, .. } => Some(node),
            _ => None,
        }
    }
}

/// A convenience result type for graph operations.
pub type Result<T> = std::result::Result<T, GraphError>;
