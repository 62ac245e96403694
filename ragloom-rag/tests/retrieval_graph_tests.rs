//! Tests for the retrieval-augmented query graph.

mod common;

use std::sync::Arc;

use common::{FailingStore, letters};
use futures::StreamExt;
use ragloom_graph::{GraphError, StreamEvent};
use ragloom_model::{Message, MockChatModel, Role};
use ragloom_rag::graph::{FORMATTER_NODE, LLM_NODE, PROMPT_NODE, RETRIEVER_NODE};
use ragloom_rag::{
    ChatPrompt, DEFAULT_SYSTEM_PROMPT, Document, EmbeddingBatcher, InMemoryVectorStore,
    IngestionPipeline, NO_CONTEXT, RagConfig, RetrievalGraph, Retriever, Source, VectorStore,
};
use tokio_util::sync::CancellationToken;

fn graph_with(store: Arc<dyn VectorStore>, model: &MockChatModel) -> RetrievalGraph {
    let batcher = EmbeddingBatcher::new(letters(), 8).unwrap();
    let retriever = Retriever::new(batcher, store, "docs", 3).unwrap();
    RetrievalGraph::new(retriever, Arc::new(model.clone()), ChatPrompt::default()).unwrap()
}

async fn abc_store() -> Arc<InMemoryVectorStore> {
    let store = Arc::new(InMemoryVectorStore::new());
    let config =
        RagConfig::builder().chunk_size(4).chunk_overlap(0).separators(["."]).build().unwrap();
    let pipeline = IngestionPipeline::builder()
        .config(config)
        .embedding_provider(letters())
        .vector_store(store.clone())
        .collection("docs")
        .build()
        .unwrap();
    pipeline.setup().await.unwrap();
    pipeline.ingest(&Source::Text("A. B. C.".to_string())).await.unwrap();
    store
}

async fn empty_store() -> Arc<InMemoryVectorStore> {
    let store = Arc::new(InMemoryVectorStore::new());
    store.ensure_collection("docs", 26).await.unwrap();
    store
}

fn position(events: &[StreamEvent], wanted: impl Fn(&StreamEvent) -> bool) -> usize {
    events.iter().position(wanted).expect("event missing")
}

#[tokio::test]
async fn formatter_joins_query_and_retrieved_context() {
    let model = MockChatModel::new(["Hel", "lo"]);
    let graph = graph_with(abc_store().await, &model);

    let events: Vec<StreamEvent> = graph
        .stream("B", CancellationToken::new())
        .map(|event| event.unwrap())
        .collect()
        .await;

    let retriever_end = position(
        &events,
        |e| matches!(e, StreamEvent::NodeEnd { node, .. } if node == RETRIEVER_NODE),
    );
    let formatter_start = position(
        &events,
        |e| matches!(e, StreamEvent::NodeStart { node } if node == FORMATTER_NODE),
    );
    assert!(retriever_end < formatter_start);

    let fragments: Vec<&str> = events
        .iter()
        .filter_map(|e| match e {
            StreamEvent::Message { node, content } if node == LLM_NODE => Some(content.as_str()),
            _ => None,
        })
        .collect();
    assert_eq!(fragments, ["Hel", "lo"]);
    match events.last() {
        Some(StreamEvent::Done { state }) => assert_eq!(state["answer"], "Hello"),
        other => panic!("unexpected final event: {other:?}"),
    }

    let request = &model.requests()[0];
    assert_eq!(request[0].role, Role::System);
    assert_eq!(request[0].content, DEFAULT_SYSTEM_PROMPT);
    assert!(request[1].content.starts_with("Context:\n"));
    assert!(request[1].content.contains("--- Context 1 (similarity: 1.0000) ---\n B.\n"));
    assert!(request[1].content.ends_with("---\nQuestion: B"));
}

#[tokio::test]
async fn empty_retrieval_still_calls_the_model_with_the_sentinel() {
    let model = MockChatModel::new(["I don't know."]);
    let graph = graph_with(empty_store().await, &model);

    let answer = graph.answer("anything", CancellationToken::new()).await.unwrap();

    assert_eq!(answer, "I don't know.");
    let requests = model.requests();
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0][1].content, format!("Context:\n{NO_CONTEXT}\n---\nQuestion: anything"));
}

#[tokio::test]
async fn retriever_failure_cancels_everything_downstream() {
    let model = MockChatModel::new(["never"]);
    let graph = graph_with(Arc::new(FailingStore), &model);

    let err = graph.answer("query", CancellationToken::new()).await.unwrap_err();

    match &err {
        GraphError::NodeFailed { node, cancelled, source } => {
            assert_eq!(node, RETRIEVER_NODE);
            assert_eq!(cancelled, &[FORMATTER_NODE, PROMPT_NODE, LLM_NODE].map(String::from));
            assert!(source.to_string().contains("unreachable"));
        }
        other => panic!("unexpected error: {other:?}"),
    }
    assert!(model.requests().is_empty());
}

#[tokio::test]
async fn cancellation_mid_stream_is_reported_as_cancelled() {
    let model = MockChatModel::new(["first", "second"]).hang_after(1);
    let graph = graph_with(empty_store().await, &model);
    let token = CancellationToken::new();

    let mut stream = Box::pin(graph.fragments("query", token.clone()));
    assert_eq!(stream.next().await.unwrap().unwrap(), "first");
    token.cancel();

    let rest: Vec<_> = stream.collect().await;
    assert_eq!(rest.len(), 1);
    assert!(matches!(rest[0], Err(GraphError::Cancelled)));
}

#[tokio::test]
async fn generation_error_keeps_delivered_fragments() {
    let model = MockChatModel::new(["partial", "lost"]).fail_after(1, "rate limited");
    let graph = graph_with(empty_store().await, &model);

    let items: Vec<_> = graph.fragments("query", CancellationToken::new()).collect().await;

    assert_eq!(items.len(), 2);
    assert_eq!(items[0].as_ref().unwrap(), "partial");
    match &items[1] {
        Err(GraphError::NodeFailed { node, source, .. }) => {
            assert_eq!(node, LLM_NODE);
            assert!(source.to_string().contains("rate limited"));
        }
        other => panic!("unexpected item: {other:?}"),
    }
}

#[tokio::test]
async fn threshold_filters_low_scoring_documents() {
    let store = abc_store().await;
    let batcher = EmbeddingBatcher::new(letters(), 8).unwrap();
    let retriever =
        Retriever::new(batcher, store, "docs", 3).unwrap().with_similarity_threshold(0.5);

    let documents: Vec<Document> = retriever.retrieve("B").await.unwrap();

    assert_eq!(documents.len(), 1);
    assert_eq!(documents[0].content, " B.");
}

#[test]
fn context_lists_documents_by_rank() {
    let documents = vec![
        Document::new("first").with_metadata("score", 0.9),
        Document::new("second").with_metadata("score", 0.25),
    ];
    let context = ragloom_rag::format_context(&documents);
    assert!(context.contains("--- Context 1 (similarity: 0.9000) ---\nfirst\n\n"));
    assert!(context.contains("--- Context 2 (similarity: 0.2500) ---\nsecond\n\n"));
    assert_eq!(ragloom_rag::format_context(&[]), NO_CONTEXT);
}

#[tokio::test]
async fn fragment_stream_outlives_the_query_and_graph() {
    let model = MockChatModel::new(["owned", " stream"]);
    let fragments = {
        let graph = graph_with(empty_store().await, &model);
        let query = String::from("temporary question");
        graph.fragments(&query, CancellationToken::new())
    };

    let collected = tokio::spawn(fragments.collect::<Vec<_>>()).await.unwrap();

    let text: Vec<String> = collected.into_iter().map(Result::unwrap).collect();
    assert_eq!(text, ["owned", " stream"]);
    assert!(model.requests()[0][1].content.ends_with("Question: temporary question"));
}

#[tokio::test]
async fn earlier_turns_reach_the_model_between_system_and_question() {
    let model = MockChatModel::new(["again"]);
    let graph = graph_with(empty_store().await, &model);
    let history = [Message::user("Who are you?"), Message::assistant("A helper.")];

    let fragments: Vec<String> = graph
        .fragments_with_history("And now?", &history, CancellationToken::new())
        .map(|fragment| fragment.unwrap())
        .collect()
        .await;
    assert_eq!(fragments, ["again"]);

    let request = &model.requests()[0];
    let roles: Vec<Role> = request.iter().map(|m| m.role).collect();
    assert_eq!(roles, [Role::System, Role::User, Role::Assistant, Role::User]);
    assert_eq!(request[2].content, "A helper.");
    assert!(request[3].content.ends_with("Question: And now?"));
}
