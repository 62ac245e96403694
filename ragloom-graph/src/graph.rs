//! Graph construction and validation.

use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::Arc;

use crate::edge::{END, Edge, START, is_reserved};
use crate::error::{GraphError, Result};
use crate::node::Node;

/// Builder for a DAG of [`Node`]s.
///
/// Nodes are identified by [`Node::name`]. Edges may start at [`START`] and
/// end at [`END`]. Call [`compile`](StateGraph::compile) to validate.
#[derive(Default)]
pub struct StateGraph {
    nodes: Vec<Arc<dyn Node>>,
    edges: Vec<Edge>,
}

impl StateGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a node.
    pub fn node(self, node: impl Node + 'static) -> Self {
        self.node_arc(Arc::new(node))
    }

    /// Add a shared node.
    pub fn node_arc(mut self, node: Arc<dyn Node>) -> Self {
        self.nodes.push(node);
        self
    }

    /// Declare that `to` depends on `from`.
    pub fn edge(mut self, from: impl Into<String>, to: impl Into<String>) -> Self {
        self.edges.push(Edge::new(from, to));
        self
    }

    /// Validate the graph and produce an executable [`CompiledGraph`].
    ///
    /// # Errors
    ///
    /// Returns [`GraphError::InvalidGraph`] if:
    /// - a node uses a reserved name or a name twice
    /// - an edge references an unknown node, leaves [`END`] or enters [`START`]
    /// - an edge is declared twice
    /// - the graph has a cycle
    /// - a node is unreachable from [`START`] or cannot reach [`END`]
    pub fn compile(self) -> Result<CompiledGraph> {
        let mut nodes: HashMap<String, Arc<dyn Node>> = HashMap::new();
        let mut declared: Vec<String> = Vec::new();
        for node in self.nodes {
            let name = node.name().to_string();
            if is_reserved(&name) {
                return Err(GraphError::InvalidGraph(format!("node name '{name}' is reserved")));
            }
            if nodes.insert(name.clone(), node).is_some() {
                return Err(GraphError::InvalidGraph(format!("duplicate node '{name}'")));
            }
            declared.push(name);
        }

        let known = |name: &str| is_reserved(name) || nodes.contains_key(name);
        let mut seen = HashSet::new();
        let mut predecessors: HashMap<String, Vec<String>> = HashMap::new();
        let mut successors: HashMap<String, Vec<String>> = HashMap::new();
        for edge in &self.edges {
            for endpoint in [&edge.from, &edge.to] {
                if !known(endpoint) {
                    return Err(GraphError::InvalidGraph(format!(
                        "edge {} -> {} references unknown node '{endpoint}'",
                        edge.from, edge.to
                    )));
                }
            }
            if edge.from == END || edge.to == START {
                return Err(GraphError::InvalidGraph(format!(
                    "edge {} -> {} runs against the graph direction",
                    edge.from, edge.to
                )));
            }
            if !seen.insert(edge.clone()) {
                return Err(GraphError::InvalidGraph(format!(
                    "duplicate edge {} -> {}",
                    edge.from, edge.to
                )));
            }
            predecessors.entry(edge.to.clone()).or_default().push(edge.from.clone());
            successors.entry(edge.from.clone()).or_default().push(edge.to.clone());
        }

        if predecessors.get(END).is_none_or(Vec::is_empty) {
            return Err(GraphError::InvalidGraph("no edge leads to END".to_string()));
        }

        let order = topological_order(&declared, &predecessors, &successors)?;

        let from_start = reachable(START, &successors);
        let to_end = reachable(END, &predecessors);
        for name in &declared {
            if !from_start.contains(name.as_str()) {
                return Err(GraphError::InvalidGraph(format!(
                    "node '{name}' is unreachable from START"
                )));
            }
            if !to_end.contains(name.as_str()) {
                return Err(GraphError::InvalidGraph(format!("node '{name}' cannot reach END")));
            }
        }

        Ok(CompiledGraph {
            nodes: Arc::new(nodes),
            predecessors: Arc::new(predecessors),
            order: Arc::new(order),
        })
    }
}

/// Kahn's algorithm over declared nodes plus START/END. Ties keep declaration order.
fn topological_order(
    declared: &[String],
    predecessors: &HashMap<String, Vec<String>>,
    successors: &HashMap<String, Vec<String>>,
) -> Result<Vec<String>> {
    let all: Vec<&str> =
        std::iter::once(START).chain(declared.iter().map(String::as_str)).chain([END]).collect();
    let mut in_degree: HashMap<&str, usize> = all
        .iter()
        .map(|name| (*name, predecessors.get(*name).map_or(0, Vec::len)))
        .collect();

    let mut queue: VecDeque<&str> =
        all.iter().copied().filter(|name| in_degree[name] == 0).collect();
    let mut order = Vec::with_capacity(all.len());
    while let Some(name) = queue.pop_front() {
        order.push(name.to_string());
        for next in successors.get(name).into_iter().flatten() {
            if let Some(degree) = in_degree.get_mut(next.as_str()) {
                *degree -= 1;
                if *degree == 0 {
                    queue.push_back(next.as_str());
                }
            }
        }
    }

    if order.len() != all.len() {
        let stuck: Vec<&str> =
            all.iter().copied().filter(|name| in_degree[name] > 0).collect();
        return Err(GraphError::InvalidGraph(format!("cycle detected among {stuck:?}")));
    }

    // Only real nodes are scheduled.
    order.retain(|name| !is_reserved(name));
    Ok(order)
}

fn reachable<'a>(from: &'a str, adjacency: &'a HashMap<String, Vec<String>>) -> HashSet<&'a str> {
    let mut visited = HashSet::from([from]);
    let mut queue = VecDeque::from([from]);
    while let Some(name) = queue.pop_front() {
        for next in adjacency.get(name).into_iter().flatten() {
            if visited.insert(next.as_str()) {
                queue.push_back(next.as_str());
            }
        }
    }
    visited
}

/// A validated, executable graph. Cheap to clone.
#[derive(Clone)]
pub struct CompiledGraph {
    pub(crate) nodes: Arc<HashMap<String, Arc<dyn Node>>>,
    pub(crate) predecessors: Arc<HashMap<String, Vec<String>>>,
    /// Real nodes in a topological order.
    pub(crate) order: Arc<Vec<String>>,
}

impl CompiledGraph {
    /// Node names in the order the executor considers them.
    pub fn node_names(&self) -> impl Iterator<Item = &str> {
        self.order.iter().map(String::as_str)
    }

    /// Declared predecessors of `node` (including [`START`]), in edge order.
    pub fn predecessors(&self, node: &str) -> &[String] {
        self.predecessors.get(node).map_or(&[], Vec::as_slice)
    }
}

impl std::fmt::Debug for CompiledGraph {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CompiledGraph")
            .field("order", &self.order)
            .field("predecessors", &self.predecessors)
            .finish()
    }
}
