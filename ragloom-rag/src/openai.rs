//! Embedding provider for OpenAI-compatible `/embeddings` endpoints.
//!
//! This module is only available when the `openai` feature is enabled.

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, error};

use crate::embedding::EmbeddingProvider;
use crate::error::{RagError, Result};

/// The default embeddings service base URL.
pub const DEFAULT_BASE_URL: &str = "https://api.siliconflow.cn/v1";

/// The default embedding model.
pub const DEFAULT_MODEL: &str = "BAAI/bge-m3";

/// The dimensionality of [`DEFAULT_MODEL`].
pub const DEFAULT_DIMENSIONS: usize = 1024;

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);

const PROVIDER: &str = "openai";

/// An [`EmbeddingProvider`] backed by an OpenAI-compatible embeddings API.
///
/// # Example
///
/// ```rust,ignore
/// use ragloom_rag::openai::OpenAIEmbeddingProvider;
///
/// let provider = OpenAIEmbeddingProvider::new("sk-...")?
///     .with_base_url("https://api.openai.com/v1")
///     .with_model("text-embedding-3-small", 1536);
/// let embedding = provider.embed("hello world").await?;
/// ```
pub struct OpenAIEmbeddingProvider {
    client: reqwest::Client,
    api_key: String,
    base_url: String,
    model: String,
    dimensions: usize,
    timeout: Duration,
}

impl OpenAIEmbeddingProvider {
    /// Create a provider for the default service and model.
    pub fn new(api_key: impl Into<String>) -> Result<Self> {
        let api_key = api_key.into();
        if api_key.is_empty() {
            return Err(RagError::Config("embedding API key must not be empty".into()));
        }

        Ok(Self {
            client: build_client(DEFAULT_TIMEOUT)?,
            api_key,
            base_url: DEFAULT_BASE_URL.into(),
            model: DEFAULT_MODEL.into(),
            dimensions: DEFAULT_DIMENSIONS,
            timeout: DEFAULT_TIMEOUT,
        })
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Set the model and the dimensionality of its vectors.
    pub fn with_model(mut self, model: impl Into<String>, dimensions: usize) -> Self {
        self.model = model.into();
        self.dimensions = dimensions;
        self
    }

    /// Set the per-request timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Result<Self> {
        self.client = build_client(timeout)?;
        self.timeout = timeout;
        Ok(self)
    }

    fn endpoint(&self) -> String {
        format!("{}/embeddings", self.base_url.trim_end_matches('/'))
    }
}

fn build_client(timeout: Duration) -> Result<reqwest::Client> {
    reqwest::Client::builder()
        .timeout(timeout)
        .build()
        .map_err(|e| RagError::Config(format!("failed to build HTTP client: {e}")))
}

#[derive(Serialize)]
struct EmbeddingRequest<'a> {
    model: &'a str,
    input: &'a [String],
    encoding_format: &'a str,
}

#[derive(Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingData>,
}

#[derive(Deserialize)]
struct EmbeddingData {
    #[serde(default)]
    index: usize,
    embedding: Vec<f32>,
}

#[derive(Deserialize)]
struct ErrorResponse {
    error: ErrorDetail,
}

#[derive(Deserialize)]
struct ErrorDetail {
    message: String,
}

#[async_trait]
impl EmbeddingProvider for OpenAIEmbeddingProvider {
    fn name(&self) -> &str {
        PROVIDER
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        debug!(provider = PROVIDER, batch_size = texts.len(), model = %self.model, "embedding batch");

        let request_body =
            EmbeddingRequest { model: &self.model, input: texts, encoding_format: "float" };

        let response = self
            .client
            .post(self.endpoint())
            .bearer_auth(&self.api_key)
            .json(&request_body)
            .send()
            .await
            .map_err(|e| {
                let message = if e.is_timeout() {
                    format!("request timed out after {:?}", self.timeout)
                } else {
                    format!("request failed: {e}")
                };
                error!(provider = PROVIDER, error = %e, "request failed");
                RagError::embedding(PROVIDER, message)
            })?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            let detail =
                serde_json::from_str::<ErrorResponse>(&body).map(|e| e.error.message).unwrap_or(body);

            error!(provider = PROVIDER, %status, "API error");
            return Err(RagError::embedding(PROVIDER, format!("API returned {status}: {detail}")));
        }

        let mut embedding_response: EmbeddingResponse = response.json().await.map_err(|e| {
            error!(provider = PROVIDER, error = %e, "failed to parse response");
            RagError::embedding(PROVIDER, format!("failed to parse response: {e}"))
        })?;

        embedding_response.data.sort_by_key(|d| d.index);
        Ok(embedding_response.data.into_iter().map(|d| d.embedding).collect())
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_api_key_is_rejected() {
        assert!(matches!(OpenAIEmbeddingProvider::new(""), Err(RagError::Config(_))));
    }

    #[test]
    fn endpoint_joins_base_url() {
        let provider =
            OpenAIEmbeddingProvider::new("key").unwrap().with_base_url("http://localhost:8080/v1/");
        assert_eq!(provider.endpoint(), "http://localhost:8080/v1/embeddings");
        assert_eq!(provider.dimensions(), DEFAULT_DIMENSIONS);
    }
}
