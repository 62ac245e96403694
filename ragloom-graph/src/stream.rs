//! Streamed graph invocation.

use futures::Stream;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::error::{GraphError, Result};
use crate::graph::CompiledGraph;
use crate::node::ExecutionContext;
use crate::state::State;

/// Progress reported while a graph runs.
#[derive(Debug, Clone, PartialEq)]
pub enum StreamEvent {
    /// A node's dependencies were satisfied and it started running.
    NodeStart { node: String },
    /// A node finished successfully.
    NodeEnd { node: String, duration_ms: u64 },
    /// A node produced an incremental text fragment.
    Message { node: String, content: String },
    /// The graph completed; `state` is the invocation result.
    Done { state: State },
}

impl CompiledGraph {
    /// Run the graph in a background task and stream its events.
    ///
    /// The stream ends with [`StreamEvent::Done`] on success or with the
    /// invocation error. Dropping the stream cancels the invocation.
    pub fn stream(
        &self,
        input: State,
        cancel: CancellationToken,
    ) -> impl Stream<Item = Result<StreamEvent>> + Send + 'static + use<> {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let ctx = ExecutionContext::new(cancel.clone()).with_events(tx);
        let graph = self.clone();
        let handle = tokio::spawn(async move { graph.invoke(input, &ctx).await });
        let guard = cancel.drop_guard();

        async_stream::stream! {
            // The channel closes once the invocation (and every node clone of
            // the context) is gone.
            while let Some(event) = rx.recv().await {
                yield Ok(event);
            }
            match handle.await {
                Ok(Ok(state)) => yield Ok(StreamEvent::Done { state }),
                Ok(Err(e)) => yield Err(e),
                Err(e) => yield Err(GraphError::Aborted(e.to_string())),
            }
            // Finished on its own; only an early drop should cancel.
            let _ = guard.disarm();
        }
    }
}
