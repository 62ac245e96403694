//! Edges and the synthetic entry/exit nodes.

/// Synthetic source node. Its output is the invocation input.
pub const START: &str = "__start__";

/// Synthetic sink node. Its input is the invocation result.
pub const END: &str = "__end__";

/// A directed dependency: `to` cannot run before `from` has completed.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Edge {
    pub from: String,
    pub to: String,
}

impl Edge {
    pub fn new(from: impl Into<String>, to: impl Into<String>) -> Self {
        Self { from: from.into(), to: to.into() }
    }
}

pub(crate) fn is_reserved(name: &str) -> bool {
    name == START || name == END
}
