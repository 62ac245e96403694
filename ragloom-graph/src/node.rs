//! The node capability and the per-invocation execution context.

use std::future::Future;

use async_trait::async_trait;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::error::NodeError;
use crate::state::State;
use crate::stream::StreamEvent;

/// Per-invocation context handed to every node.
///
/// Carries the cancellation signal and, for streamed invocations, the event
/// channel nodes use to publish incremental output.
#[derive(Debug, Clone, Default)]
pub struct ExecutionContext {
    cancel: CancellationToken,
    events: Option<mpsc::UnboundedSender<StreamEvent>>,
}

impl ExecutionContext {
    pub fn new(cancel: CancellationToken) -> Self {
        Self { cancel, events: None }
    }

    pub(crate) fn with_events(mut self, events: mpsc::UnboundedSender<StreamEvent>) -> Self {
        self.events = Some(events);
        self
    }

    pub fn cancellation_token(&self) -> &CancellationToken {
        &self.cancel
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Resolves once the invocation is cancelled.
    pub async fn cancelled(&self) {
        self.cancel.cancelled().await;
    }

    /// Return [`NodeError::Cancelled`] if the invocation has been cancelled.
    pub fn check_cancelled(&self) -> Result<(), NodeError> {
        if self.is_cancelled() { Err(NodeError::Cancelled) } else { Ok(()) }
    }

    /// Publish an event to the stream consumer, if there is one.
    pub fn emit(&self, event: StreamEvent) {
        if let Some(events) = &self.events {
            // A closed receiver means nobody is listening any more.
            let _ = events.send(event);
        }
    }

    /// Publish an incremental text fragment produced by `node`.
    pub fn emit_message(&self, node: &str, content: impl Into<String>) {
        self.emit(StreamEvent::Message { node: node.to_string(), content: content.into() });
    }
}

/// A unit of work in a graph: consume named inputs, produce named outputs.
///
/// The executor calls [`execute`](Node::execute) once, with the merged
/// outputs of every predecessor.
#[async_trait]
pub trait Node: Send + Sync {
    fn name(&self) -> &str;

    async fn execute(&self, input: State, ctx: &ExecutionContext) -> Result<State, NodeError>;
}

/// A [`Node`] backed by an async closure.
///
/// ```rust,ignore
/// let node = FunctionNode::new("echo", |state, _ctx| async move { Ok(state) });
/// ```
pub struct FunctionNode<F> {
    name: String,
    func: F,
}

impl<F, Fut> FunctionNode<F>
where
    F: Fn(State, ExecutionContext) -> Fut + Send + Sync,
    Fut: Future<Output = Result<State, NodeError>> + Send,
{
    pub fn new(name: impl Into<String>, func: F) -> Self {
        Self { name: name.into(), func }
    }
}

#[async_trait]
impl<F, Fut> Node for FunctionNode<F>
where
    F: Fn(State, ExecutionContext) -> Fut + Send + Sync,
    Fut: Future<Output = Result<State, NodeError>> + Send,
{
    fn name(&self) -> &str {
        &self.name
    }

    async fn execute(&self, input: State, ctx: &ExecutionContext) -> Result<State, NodeError> {
        (self.func)(input, ctx.clone()).await
    }
}
