//! The all-predecessors scheduler.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use futures::StreamExt;
use futures::stream::FuturesUnordered;
use tracing::{debug, error, info};

use crate::edge::{END, START};
use crate::error::{GraphError, NodeError, Result};
use crate::graph::CompiledGraph;
use crate::node::{ExecutionContext, Node};
use crate::state::{State, merge};
use crate::stream::StreamEvent;

/// Lifecycle of a node within one invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeState {
    Pending,
    Ready,
    Running,
    Done,
    Failed,
    Cancelled,
}

type NodeOutcome = (String, Duration, std::result::Result<State, NodeError>);

impl CompiledGraph {
    /// Run the graph to completion.
    ///
    /// A node becomes ready once every predecessor is done; ready nodes run
    /// concurrently. The first node failure cancels every unfinished node and
    /// is returned as [`GraphError::NodeFailed`]. Cancellation of `ctx`
    /// returns [`GraphError::Cancelled`].
    pub async fn invoke(&self, input: State, ctx: &ExecutionContext) -> Result<State> {
        let mut states: HashMap<&str, NodeState> =
            self.order.iter().map(|name| (name.as_str(), NodeState::Pending)).collect();
        let mut outputs: HashMap<String, State> = HashMap::from([(START.to_string(), input)]);
        let mut running = FuturesUnordered::new();

        loop {
            if ctx.is_cancelled() {
                self.cancel_unfinished(&mut states);
                info!("graph invocation cancelled");
                return Err(GraphError::Cancelled);
            }

            for name in self.order.iter() {
                if states[name.as_str()] != NodeState::Pending {
                    continue;
                }
                let preds = self.predecessors(name);
                if !preds.iter().all(|p| outputs.contains_key(p.as_str())) {
                    continue;
                }
                transition(&mut states, name, NodeState::Ready);
                let node_input = merge(preds.iter().map(|p| &outputs[p.as_str()]));
                let node = Arc::clone(&self.nodes[name.as_str()]);
                running.push(run_node(node, node_input, ctx.clone()));
                transition(&mut states, name, NodeState::Running);
                ctx.emit(StreamEvent::NodeStart { node: name.clone() });
            }

            let end_preds = self.predecessors(END);
            if end_preds.iter().all(|p| outputs.contains_key(p.as_str())) {
                return Ok(merge(end_preds.iter().map(|p| &outputs[p.as_str()])));
            }

            if running.is_empty() {
                // Unreachable for graphs accepted by `compile`.
                return Err(GraphError::InvalidGraph("no runnable node left".to_string()));
            }

            let outcome = tokio::select! {
                biased;
                _ = ctx.cancelled() => continue,
                outcome = running.next() => outcome,
            };
            let Some((name, elapsed, result)) = outcome else { continue };
            let duration_ms = u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX);

            match result {
                Ok(output) => {
                    transition(&mut states, &name, NodeState::Done);
                    ctx.emit(StreamEvent::NodeEnd { node: name.clone(), duration_ms });
                    outputs.insert(name, output);
                }
                Err(NodeError::Cancelled) => {
                    self.cancel_unfinished(&mut states);
                    info!(node = %name, "graph invocation cancelled by node");
                    return Err(GraphError::Cancelled);
                }
                Err(source) => {
                    transition(&mut states, &name, NodeState::Failed);
                    let cancelled = self.cancel_unfinished(&mut states);
                    error!(node = %name, error = %source, ?cancelled, "graph node failed");
                    return Err(GraphError::NodeFailed { node: name, cancelled, source });
                }
            }
        }
    }

    /// Mark every node that has not finished as cancelled, returning their names.
    fn cancel_unfinished(&self, states: &mut HashMap<&str, NodeState>) -> Vec<String> {
        let mut cancelled = Vec::new();
        for name in self.order.iter() {
            if matches!(
                states[name.as_str()],
                NodeState::Pending | NodeState::Ready | NodeState::Running
            ) {
                transition(states, name, NodeState::Cancelled);
                cancelled.push(name.clone());
            }
        }
        cancelled
    }
}

async fn run_node(node: Arc<dyn Node>, input: State, ctx: ExecutionContext) -> NodeOutcome {
    let started = Instant::now();
    let result = node.execute(input, &ctx).await;
    (node.name().to_string(), started.elapsed(), result)
}

fn transition(states: &mut HashMap<&str, NodeState>, name: &str, to: NodeState) {
    if let Some(state) = states.get_mut(name) {
        debug!(node = name, from = ?*state, to = ?to, "node state");
        *state = to;
    }
}
