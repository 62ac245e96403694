use futures::StreamExt;
use ragloom_model::{ChatModel, Message, MockChatModel, ModelError, collect_fragments};

#[tokio::test]
async fn generate_concatenates_fragments_in_order() {
    let model = MockChatModel::new(["Rust ", "is ", "fast."]);
    let answer = model.generate(vec![Message::user("Describe Rust")]).await.unwrap();
    assert_eq!(answer, "Rust is fast.");

    let requests = model.requests();
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0], vec![Message::user("Describe Rust")]);
}

#[tokio::test]
async fn mid_stream_error_keeps_delivered_fragments_but_fails() {
    let model = MockChatModel::new(["partial ", "answer"]).fail_after(1, "connection reset");
    let mut stream = model.stream(vec![Message::user("q")]).await.unwrap();

    assert_eq!(stream.next().await.unwrap().unwrap(), "partial ");
    let err = stream.next().await.unwrap().unwrap_err();
    assert!(matches!(err, ModelError::Generation { .. }));
    assert!(err.to_string().contains("connection reset"));
    assert!(stream.next().await.is_none());
}

#[tokio::test]
async fn collect_fragments_reports_failure_instead_of_partial_text() {
    let model = MockChatModel::new(["a", "b", "c"]).fail_after(2, "rate limited");
    let stream = model.stream(vec![]).await.unwrap();
    assert!(collect_fragments(stream).await.is_err());
}

#[tokio::test]
async fn start_failure_is_returned_before_streaming() {
    let model = MockChatModel::new(["never"]).fail_on_start("unauthorized");
    let result = model.stream(vec![Message::user("q")]).await;
    assert!(matches!(result, Err(ModelError::Generation { .. })));
    assert_eq!(model.requests().len(), 1);
}

#[tokio::test]
async fn empty_script_completes_with_empty_answer() {
    let model = MockChatModel::new(Vec::<String>::new());
    assert_eq!(model.generate(vec![]).await.unwrap(), "");
}

#[cfg(feature = "openai")]
#[test]
fn openai_model_rejects_empty_api_key() {
    use ragloom_model::{OpenAIChatModel, OpenAIConfig};

    let result = OpenAIChatModel::new(OpenAIConfig::new("  ", "gpt-4o-mini"));
    assert!(matches!(result, Err(ModelError::Config(_))));

    let model = OpenAIChatModel::new(OpenAIConfig::compatible(
        "sk-test",
        "http://localhost:9/v1",
        "Qwen/Qwen3-8B",
    ))
    .unwrap();
    assert_eq!(model.name(), "Qwen/Qwen3-8B");
}
