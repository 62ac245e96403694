//! The retrieval-augmented query graph.
//!
//! ```text
//! START ─┬─► retriever ─┐
//!        └──────────────┴─► formatter ─► prompt_template ─► llm ─► END
//! ```
//!
//! The formatter is a fan-in: it runs only after both START and the
//! retriever have completed, and sees the query from START alongside the
//! retrieved documents. Earlier conversation turns, when given, travel from
//! START in the `history` slot and are only used by the prompt template.

use std::collections::HashMap;
use std::fmt::Write as _;
use std::sync::Arc;

use async_trait::async_trait;
use futures::{Stream, StreamExt};
use ragloom_graph::{
    CompiledGraph, END, ExecutionContext, GraphError, Node, NodeError, START, State, StateExt,
    StateGraph, StreamEvent,
};
use ragloom_model::{ChatModel, Message};
use serde_json::{Value, json};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::document::Document;
use crate::error::RagError;
use crate::prompt::ChatPrompt;
use crate::retriever::Retriever;

pub const RETRIEVER_NODE: &str = "retriever";
pub const FORMATTER_NODE: &str = "formatter";
pub const PROMPT_NODE: &str = "prompt_template";
pub const LLM_NODE: &str = "llm";

pub const QUERY_SLOT: &str = "query";
pub const DOCUMENTS_SLOT: &str = "documents";
pub const CONTEXT_SLOT: &str = "context_str";
pub const MESSAGES_SLOT: &str = "messages";
pub const ANSWER_SLOT: &str = "answer";
pub const HISTORY_SLOT: &str = "history";

/// Context text used when retrieval returns nothing.
pub const NO_CONTEXT: &str = "No relevant context found.";

const CONTEXT_HEADER: &str = "The following passages were retrieved for the question:\n\n";

fn slot(key: &str, value: impl Into<Value>) -> (String, Value) {
    (key.to_string(), value.into())
}

/// Reads `query`, writes `documents`.
pub struct RetrieverNode {
    retriever: Retriever,
}

impl RetrieverNode {
    pub fn new(retriever: Retriever) -> Self {
        Self { retriever }
    }
}

#[async_trait]
impl Node for RetrieverNode {
    fn name(&self) -> &str {
        RETRIEVER_NODE
    }

    async fn execute(&self, input: State, ctx: &ExecutionContext) -> Result<State, NodeError> {
        ctx.check_cancelled()?;
        let query = input.require_str(QUERY_SLOT)?;
        let documents = tokio::select! {
            biased;
            _ = ctx.cancelled() => return Err(NodeError::Cancelled),
            documents = self.retriever.retrieve(query) => documents?,
        };
        debug!(node = RETRIEVER_NODE, result_count = documents.len(), "retrieved");
        let documents = serde_json::to_value(&documents).map_err(RagError::from)?;
        Ok(State::from([slot(DOCUMENTS_SLOT, documents)]))
    }
}

/// Render retrieved documents as ranked context blocks.
pub fn format_context(documents: &[Document]) -> String {
    if documents.is_empty() {
        return NO_CONTEXT.to_string();
    }
    let mut context = String::from(CONTEXT_HEADER);
    for (rank, document) in documents.iter().enumerate() {
        let score = document.score().unwrap_or_default();
        let _ = write!(
            context,
            "--- Context {} (similarity: {score:.4}) ---\n{}\n\n",
            rank + 1,
            document.content
        );
    }
    context
}

/// Joins START and the retriever: reads `query` and `documents`, writes
/// `context_str` and passes `query` and any `history` through.
#[derive(Debug, Default)]
pub struct FormatterNode;

#[async_trait]
impl Node for FormatterNode {
    fn name(&self) -> &str {
        FORMATTER_NODE
    }

    async fn execute(&self, input: State, ctx: &ExecutionContext) -> Result<State, NodeError> {
        ctx.check_cancelled()?;
        let query = input.require_str(QUERY_SLOT)?;
        let documents: Vec<Document> = input.require_as(DOCUMENTS_SLOT)?;
        let mut output = State::from([
            slot(QUERY_SLOT, query),
            slot(CONTEXT_SLOT, format_context(&documents)),
        ]);
        if let Some(history) = input.get(HISTORY_SLOT) {
            output.insert(HISTORY_SLOT.to_string(), history.clone());
        }
        Ok(output)
    }
}

/// Reads `context_str`, `query` and an optional `history`, writes `messages`.
pub struct PromptTemplateNode {
    prompt: ChatPrompt,
}

impl PromptTemplateNode {
    pub fn new(prompt: ChatPrompt) -> Self {
        Self { prompt }
    }
}

#[async_trait]
impl Node for PromptTemplateNode {
    fn name(&self) -> &str {
        PROMPT_NODE
    }

    async fn execute(&self, input: State, ctx: &ExecutionContext) -> Result<State, NodeError> {
        ctx.check_cancelled()?;
        let vars = HashMap::from([
            (CONTEXT_SLOT, input.require_str(CONTEXT_SLOT)?),
            (QUERY_SLOT, input.require_str(QUERY_SLOT)?),
        ]);
        let history: Vec<Message> = input.optional_as(HISTORY_SLOT)?.unwrap_or_default();
        let messages = self.prompt.format_with_history(&vars, &history)?;
        let messages = serde_json::to_value(messages).map_err(RagError::from)?;
        Ok(State::from([slot(MESSAGES_SLOT, messages)]))
    }
}

/// Streams a generation for `messages`, forwarding each fragment as a
/// [`StreamEvent::Message`], and writes the full `answer`.
pub struct ChatModelNode {
    model: Arc<dyn ChatModel>,
}

impl ChatModelNode {
    pub fn new(model: Arc<dyn ChatModel>) -> Self {
        Self { model }
    }
}

#[async_trait]
impl Node for ChatModelNode {
    fn name(&self) -> &str {
        LLM_NODE
    }

    async fn execute(&self, input: State, ctx: &ExecutionContext) -> Result<State, NodeError> {
        ctx.check_cancelled()?;
        let messages: Vec<Message> = input.require_as(MESSAGES_SLOT)?;

        let mut fragments = tokio::select! {
            biased;
            _ = ctx.cancelled() => return Err(NodeError::Cancelled),
            stream = self.model.stream(messages) => stream.map_err(RagError::from)?,
        };

        let mut answer = String::new();
        let mut fragment_count = 0usize;
        loop {
            let next = tokio::select! {
                biased;
                _ = ctx.cancelled() => {
                    info!(node = LLM_NODE, model = self.model.name(), fragment_count, "generation cancelled");
                    return Err(NodeError::Cancelled);
                }
                next = fragments.next() => next,
            };
            match next {
                Some(Ok(fragment)) => {
                    ctx.emit_message(LLM_NODE, fragment.as_str());
                    answer.push_str(&fragment);
                    fragment_count += 1;
                }
                Some(Err(e)) => return Err(RagError::from(e).into()),
                None => break,
            }
        }

        debug!(node = LLM_NODE, model = self.model.name(), fragment_count, "generation finished");
        Ok(State::from([slot(ANSWER_SLOT, answer)]))
    }
}

/// Wire the retrieval nodes into a compiled graph.
pub fn build_retrieval_graph(
    retriever: Retriever,
    model: Arc<dyn ChatModel>,
    prompt: ChatPrompt,
) -> ragloom_graph::Result<CompiledGraph> {
    StateGraph::new()
        .node(RetrieverNode::new(retriever))
        .node(FormatterNode)
        .node(PromptTemplateNode::new(prompt))
        .node(ChatModelNode::new(model))
        .edge(START, RETRIEVER_NODE)
        .edge(START, FORMATTER_NODE)
        .edge(RETRIEVER_NODE, FORMATTER_NODE)
        .edge(FORMATTER_NODE, PROMPT_NODE)
        .edge(PROMPT_NODE, LLM_NODE)
        .edge(LLM_NODE, END)
        .compile()
}

/// A compiled retrieval graph with query-level entry points.
#[derive(Debug, Clone)]
pub struct RetrievalGraph {
    graph: CompiledGraph,
}

impl RetrievalGraph {
    pub fn new(
        retriever: Retriever,
        model: Arc<dyn ChatModel>,
        prompt: ChatPrompt,
    ) -> ragloom_graph::Result<Self> {
        Ok(Self { graph: build_retrieval_graph(retriever, model, prompt)? })
    }

    pub fn compiled(&self) -> &CompiledGraph {
        &self.graph
    }

    fn input(query: &str, history: &[Message]) -> State {
        let mut input = State::from([slot(QUERY_SLOT, json!(query))]);
        if !history.is_empty() {
            input.insert(HISTORY_SLOT.to_string(), json!(history));
        }
        input
    }

    /// Run the graph and return the final answer.
    pub async fn answer(
        &self,
        query: &str,
        cancel: CancellationToken,
    ) -> ragloom_graph::Result<String> {
        let output =
            self.graph.invoke(Self::input(query, &[]), &ExecutionContext::new(cancel)).await?;
        output
            .get(ANSWER_SLOT)
            .and_then(Value::as_str)
            .map(str::to_string)
            .ok_or_else(|| GraphError::InvalidGraph(format!("graph produced no '{ANSWER_SLOT}'")))
    }

    /// Run the graph and stream its events. Dropping the stream cancels it.
    pub fn stream(
        &self,
        query: &str,
        cancel: CancellationToken,
    ) -> impl Stream<Item = ragloom_graph::Result<StreamEvent>> + Send + 'static + use<> {
        self.stream_with_history(query, &[], cancel)
    }

    /// Like [`stream`](Self::stream), continuing a conversation whose prior
    /// turns are `history`.
    pub fn stream_with_history(
        &self,
        query: &str,
        history: &[Message],
        cancel: CancellationToken,
    ) -> impl Stream<Item = ragloom_graph::Result<StreamEvent>> + Send + 'static + use<> {
        self.graph.stream(Self::input(query, history), cancel)
    }

    /// Stream only the generated text fragments, in arrival order.
    pub fn fragments(
        &self,
        query: &str,
        cancel: CancellationToken,
    ) -> impl Stream<Item = ragloom_graph::Result<String>> + Send + 'static + use<> {
        self.fragments_with_history(query, &[], cancel)
    }

    pub fn fragments_with_history(
        &self,
        query: &str,
        history: &[Message],
        cancel: CancellationToken,
    ) -> impl Stream<Item = ragloom_graph::Result<String>> + Send + 'static + use<> {
        self.stream_with_history(query, history, cancel).filter_map(|event| async move {
            match event {
                Ok(StreamEvent::Message { content, .. }) => Some(Ok(content)),
                Ok(_) => None,
                Err(e) => Some(Err(e)),
            }
        })
    }
}
