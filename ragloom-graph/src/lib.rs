//! # ragloom-graph
//!
//! A small DAG executor for retrieval-augmented generation workflows.
//!
//! Nodes consume a [`State`] (a map of named slots) and produce another one.
//! A node runs once **all** of its declared predecessors have completed, so a
//! node with several incoming edges acts as a fan-in barrier. Independent
//! ready nodes run concurrently.
//!
//! ```rust,ignore
//! use ragloom_graph::{StateGraph, FunctionNode, START, END};
//!
//! let graph = StateGraph::new()
//!     .node(FunctionNode::new("upper", |state, _ctx| async move { Ok(state) }))
//!     .edge(START, "upper")
//!     .edge("upper", END)
//!     .compile()?;
//!
//! let output = graph.invoke(state, &ExecutionContext::default()).await?;
//! ```

pub mod edge;
pub mod error;
pub mod executor;
pub mod graph;
pub mod node;
pub mod state;
pub mod stream;

pub use edge::{END, Edge, START};
pub use error::{BoxError, GraphError, NodeError, Result};
pub use executor::NodeState;
pub use graph::{CompiledGraph, StateGraph};
pub use node::{ExecutionContext, FunctionNode, Node};
pub use state::{State, StateExt};
pub use stream::StreamEvent;
