#![allow(dead_code)]

use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use ragloom_model::{ChatModel, MockChatModel};
use ragloom_rag::{EmbeddingProvider, InMemoryVectorStore};
use ragloom_server::{AppConfig, AppState, EmbedderFactory, ModelFactory, SharedContext};

/// Embeds text as a 26-dimensional letter-frequency vector.
#[derive(Debug, Default)]
pub struct LetterEmbedder;

#[async_trait]
impl EmbeddingProvider for LetterEmbedder {
    fn name(&self) -> &str {
        "letters"
    }

    async fn embed_batch(&self, texts: &[String]) -> ragloom_rag::Result<Vec<Vec<f32>>> {
        Ok(texts
            .iter()
            .map(|text| {
                let mut vector = vec![0.0; 26];
                for c in text.chars().filter(char::is_ascii_alphabetic) {
                    vector[(c.to_ascii_lowercase() as u8 - b'a') as usize] += 1.0;
                }
                vector
            })
            .collect())
    }

    fn dimensions(&self) -> usize {
        26
    }
}

pub fn test_config() -> AppConfig {
    AppConfig {
        api_key: "sk-test".to_string(),
        qdrant_url: None,
        collection: "test".to_string(),
        embedding_dimensions: 26,
        ..AppConfig::default()
    }
}

/// A factory handing out clones of `model`, counting how often it runs.
pub fn counting_factory(model: MockChatModel) -> (ModelFactory, Arc<AtomicUsize>) {
    let builds = Arc::new(AtomicUsize::new(0));
    let counter = builds.clone();
    let factory: ModelFactory = Arc::new(move |config: &AppConfig| {
        config.api_key()?;
        counter.fetch_add(1, Ordering::SeqCst);
        let model: Arc<dyn ChatModel> = Arc::new(model.clone());
        Ok(model)
    });
    (factory, builds)
}

pub fn letter_embedder() -> EmbedderFactory {
    Arc::new(|_: &AppConfig| {
        let provider: Arc<dyn EmbeddingProvider> = Arc::new(LetterEmbedder);
        Ok(provider)
    })
}

pub async fn test_state(dir: &Path, config: AppConfig, model: MockChatModel) -> AppState {
    let (factory, _) = counting_factory(model);
    let context = SharedContext::new(dir.join("ragloom.json"), config, factory);
    let state =
        AppState::new(Arc::new(context), Arc::new(InMemoryVectorStore::new()), letter_embedder());
    state.prepare().await.expect("prepare collection");
    state
}

pub async fn spawn_server(state: AppState) -> (String, tokio::task::JoinHandle<()>) {
    let app = ragloom_server::app_router(state);

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.expect("bind test listener");
    let addr = listener.local_addr().expect("listener addr");

    let handle = tokio::spawn(async move {
        axum::serve(listener, app).await.expect("server run");
    });

    (format!("http://{}", addr), handle)
}
