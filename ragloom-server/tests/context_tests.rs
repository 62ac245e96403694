//! Configuration persistence and the cached chat-model handle.

mod common;

use std::sync::Arc;
use std::sync::atomic::Ordering;

use common::{counting_factory, test_config};
use ragloom_model::MockChatModel;
use ragloom_server::config::PLACEHOLDER_API_KEY;
use ragloom_server::{AppConfig, ServerError, SharedContext};

#[tokio::test]
async fn get_reuses_the_model_until_invalidated() {
    let dir = tempfile::tempdir().unwrap();
    let (factory, builds) = counting_factory(MockChatModel::new(["hi"]));
    let context = SharedContext::new(dir.path().join("ragloom.json"), test_config(), factory);

    let first = context.get().await.unwrap();
    let second = context.get().await.unwrap();
    assert!(Arc::ptr_eq(&first, &second));
    assert_eq!(builds.load(Ordering::SeqCst), 1);

    context.invalidate().await;
    let third = context.get().await.unwrap();
    assert!(!Arc::ptr_eq(&first, &third));
    assert_eq!(builds.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn concurrent_gets_build_once() {
    let dir = tempfile::tempdir().unwrap();
    let (factory, builds) = counting_factory(MockChatModel::new(["hi"]));
    let context =
        Arc::new(SharedContext::new(dir.path().join("ragloom.json"), test_config(), factory));

    let tasks: Vec<_> = (0..8)
        .map(|_| {
            let context = context.clone();
            tokio::spawn(async move { context.get().await.map(|_| ()) })
        })
        .collect();
    for task in tasks {
        task.await.unwrap().unwrap();
    }

    assert_eq!(builds.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn update_persists_and_invalidates() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("ragloom.json");
    let (factory, builds) = counting_factory(MockChatModel::new(["hi"]));
    let context = SharedContext::new(&path, test_config(), factory);
    context.get().await.unwrap();

    context.update(|config| config.model_name = "deepseek-chat".to_string()).await.unwrap();

    assert_eq!(context.config().await.model_name, "deepseek-chat");
    let on_disk = AppConfig::load_or_create(&path).await.unwrap();
    assert_eq!(on_disk.model_name, "deepseek-chat");
    assert_eq!(on_disk.api_key, "sk-test");

    context.get().await.unwrap();
    assert_eq!(builds.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn failed_save_leaves_the_record_untouched() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("missing-dir").join("ragloom.json");
    let (factory, _) = counting_factory(MockChatModel::new(["hi"]));
    let context = SharedContext::new(&path, test_config(), factory);

    let err = context.update(|config| config.top_k = 9).await.unwrap_err();

    assert!(matches!(err, ServerError::Io(_)));
    assert_eq!(context.config().await.top_k, test_config().top_k);
}

#[tokio::test]
async fn placeholder_key_refuses_to_build_a_model() {
    let dir = tempfile::tempdir().unwrap();
    let (factory, builds) = counting_factory(MockChatModel::new(["hi"]));
    let context = SharedContext::new(dir.path().join("ragloom.json"), AppConfig::default(), factory);

    let err = context.get().await.err().expect("placeholder key accepted");

    assert!(matches!(err, ServerError::Config(_)));
    assert_eq!(err.status(), axum::http::StatusCode::BAD_REQUEST);
    assert_eq!(builds.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn missing_file_is_created_with_defaults() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("ragloom.json");

    let config = AppConfig::load_or_create(&path).await.unwrap();

    assert_eq!(config, AppConfig::default());
    let raw = std::fs::read_to_string(&path).unwrap();
    assert!(raw.contains(PLACEHOLDER_API_KEY));
    assert!(raw.contains("\n  \"base_url\""), "file should be pretty-printed");
}

#[tokio::test]
async fn process_only_key_is_never_persisted() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("ragloom.json");
    let config = AppConfig::load_or_create(&path).await.unwrap().with_api_key_override("sk-env-only");
    let (factory, builds) = counting_factory(MockChatModel::new(["hi"]));
    let context = SharedContext::new(&path, config, factory);

    context.get().await.unwrap();
    context.update(|config| config.system_prompt = "Be brief.".to_string()).await.unwrap();

    let raw = std::fs::read_to_string(&path).unwrap();
    assert!(raw.contains("Be brief."));
    assert!(!raw.contains("sk-env-only"));
    assert!(raw.contains(PLACEHOLDER_API_KEY));

    context.get().await.unwrap();
    assert_eq!(builds.load(Ordering::SeqCst), 2);
    assert_eq!(context.config().await.api_key().unwrap(), "sk-env-only");
}
