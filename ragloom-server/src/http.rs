//! HTTP adapter: query streaming over SSE, ingestion and configuration.

use std::convert::Infallible;
use std::future::Future;
use std::net::SocketAddr;

use anyhow::Context;
use async_stream::stream;
use axum::{
    Json, Router,
    extract::State,
    response::sse::{Event, KeepAlive, Sse},
    routing::{get, post},
};
use futures::{Stream, StreamExt};
use ragloom_rag::Source;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use tokio_util::sync::CancellationToken;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{error, info};

use crate::app::AppState;
use crate::config::PublicConfig;
use crate::error::{Result, ServerError};

#[derive(Clone, Debug)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self { host: "127.0.0.1".to_string(), port: 8080 }
    }
}

#[derive(Debug, Deserialize)]
pub struct QueryRequest {
    pub query: String,
}

#[derive(Debug, Deserialize)]
pub struct IngestRequest {
    pub path: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct IngestResponse {
    pub ids: Vec<String>,
}

/// Fields left out or empty keep their current value.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct UpdateConfigRequest {
    pub api_key: Option<String>,
    pub base_url: Option<String>,
    pub model_name: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct UpdatePromptRequest {
    pub prompt: String,
}

pub fn app_router(state: AppState) -> Router {
    let cors = CorsLayer::new().allow_origin(Any).allow_methods(Any).allow_headers(Any);

    Router::new()
        .route("/health", get(health))
        .route("/query", post(query))
        .route("/ingest", post(ingest))
        .route("/get-config", get(get_config))
        .route("/update-config", post(update_config))
        .route("/update-prompt", post(update_prompt))
        .route("/clear-history", post(clear_history))
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
}

/// Serve until `shutdown` resolves.
pub async fn run_server(
    state: AppState,
    config: ServerConfig,
    shutdown: impl Future<Output = ()> + Send + 'static,
) -> anyhow::Result<()> {
    let addr: SocketAddr = format!("{}:{}", config.host, config.port)
        .parse()
        .with_context(|| format!("invalid listen address {}:{}", config.host, config.port))?;

    state.prepare().await.context("failed to prepare the vector store collection")?;

    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!("ragloom listening on http://{}", addr);
    axum::serve(listener, app_router(state)).with_graceful_shutdown(shutdown).await?;
    Ok(())
}

/// SSE forbids bare carriage returns inside data lines.
pub fn normalize_newlines(text: &str) -> String {
    text.replace("\r\n", "\n").replace('\r', "\n")
}

async fn health() -> &'static str {
    "ok"
}

async fn query(
    State(state): State<AppState>,
    Json(request): Json<QueryRequest>,
) -> Result<Sse<impl Stream<Item = std::result::Result<Event, Infallible>>>> {
    let question = request.query.trim().to_string();
    if question.is_empty() {
        return Err(ServerError::BadRequest("query cannot be empty".to_string()));
    }

    let graph = state.retrieval_graph().await?;
    let history = state.history.snapshot().await;
    // Dropping the response body (client disconnect) drops the fragment
    // stream, which cancels the graph.
    let mut fragments =
        Box::pin(graph.fragments_with_history(&question, &history, CancellationToken::new()));

    let events = stream! {
        let mut answer = String::new();
        while let Some(item) = fragments.next().await {
            match item {
                Ok(fragment) => {
                    answer.push_str(&fragment);
                    yield Ok(Event::default().data(normalize_newlines(&fragment)));
                }
                Err(e) => {
                    error!(error = %e, "query failed mid-stream");
                    yield Ok(Event::default().event("error").data(normalize_newlines(&e.to_string())));
                    return;
                }
            }
        }
        state.history.append(question, answer).await;
    };

    Ok(Sse::new(events).keep_alive(KeepAlive::default()))
}

async fn ingest(
    State(state): State<AppState>,
    Json(request): Json<IngestRequest>,
) -> Result<Json<IngestResponse>> {
    let path = request.path.trim();
    if path.is_empty() {
        return Err(ServerError::BadRequest("path cannot be empty".to_string()));
    }
    let ids = state.ingest(&Source::path(path)).await?;
    Ok(Json(IngestResponse { ids }))
}

async fn get_config(State(state): State<AppState>) -> Json<PublicConfig> {
    Json(state.context.config().await.public_view())
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

async fn update_config(
    State(state): State<AppState>,
    Json(request): Json<UpdateConfigRequest>,
) -> Result<Json<Value>> {
    let api_key = non_empty(request.api_key);
    let base_url = non_empty(request.base_url);
    let model_name = non_empty(request.model_name);

    state
        .context
        .update(|config| {
            if let Some(key) = api_key {
                config.set_api_key(key);
            }
            if let Some(url) = base_url {
                config.base_url = url;
            }
            if let Some(model) = model_name {
                config.model_name = model;
            }
        })
        .await?;
    Ok(Json(json!({ "status": "ok" })))
}

async fn update_prompt(
    State(state): State<AppState>,
    Json(request): Json<UpdatePromptRequest>,
) -> Result<Json<Value>> {
    state.context.update(|config| config.system_prompt = request.prompt).await?;
    Ok(Json(json!({ "status": "ok" })))
}

async fn clear_history(State(state): State<AppState>) -> Json<Value> {
    state.history.clear().await;
    info!("chat history cleared");
    Json(json!({ "status": "ok" }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn carriage_returns_become_line_feeds() {
        assert_eq!(normalize_newlines("a\r\nb\rc\nd"), "a\nb\nc\nd");
        assert_eq!(normalize_newlines("\r\r\n"), "\n\n");
    }
}
