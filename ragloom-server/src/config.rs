//! The persisted JSON configuration record.

use std::io::ErrorKind;
use std::path::Path;
use std::time::Duration;

use ragloom_rag::{RagConfig, prompt::DEFAULT_SYSTEM_PROMPT};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::{Result, ServerError};

pub const DEFAULT_CONFIG_FILE: &str = "ragloom.json";

/// Environment variable overriding the stored API key.
pub const API_KEY_ENV: &str = "RAGLOOM_API_KEY";

/// Written into freshly created config files; never accepted as a real key.
pub const PLACEHOLDER_API_KEY: &str = "your_api_key_here";

/// Service endpoints, credentials and pipeline knobs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub base_url: String,
    pub api_key: String,
    pub model_name: String,
    pub system_prompt: String,
    pub embedding_model: String,
    pub embedding_dimensions: usize,
    /// gRPC endpoint of a Qdrant server. Unset or empty uses an in-process store.
    pub qdrant_url: Option<String>,
    pub collection: String,
    pub chunk_size: usize,
    pub chunk_overlap: usize,
    pub top_k: usize,
    pub embedding_batch_size: usize,
    pub timeout_secs: u64,
    /// Key taken from [`API_KEY_ENV`]. Preferred over `api_key` and never saved.
    #[serde(skip)]
    pub api_key_override: Option<String>,
}

impl Default for AppConfig {
    fn default() -> Self {
        let rag = RagConfig::default();
        Self {
            base_url: "https://api.siliconflow.cn/v1".to_string(),
            api_key: PLACEHOLDER_API_KEY.to_string(),
            model_name: "Qwen/Qwen3-8B".to_string(),
            system_prompt: DEFAULT_SYSTEM_PROMPT.to_string(),
            embedding_model: "BAAI/bge-m3".to_string(),
            embedding_dimensions: 1024,
            qdrant_url: Some("http://localhost:6334".to_string()),
            collection: "ragloom_kb".to_string(),
            chunk_size: rag.chunk_size,
            chunk_overlap: rag.chunk_overlap,
            top_k: rag.top_k,
            embedding_batch_size: rag.embedding_batch_size,
            timeout_secs: 60,
            api_key_override: None,
        }
    }
}

/// The configuration as exposed over HTTP: everything but the API key.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PublicConfig {
    pub system_prompt: String,
    pub base_url: String,
    pub model_name: String,
    pub embedding_model: String,
    pub collection: String,
    pub top_k: usize,
}

impl AppConfig {
    /// Read `path`, creating it with defaults if it does not exist.
    pub async fn load_or_create(path: &Path) -> Result<Self> {
        match tokio::fs::read_to_string(path).await {
            Ok(raw) => Ok(serde_json::from_str(&raw)?),
            Err(e) if e.kind() == ErrorKind::NotFound => {
                let config = Self::default();
                config.save(path).await?;
                info!(path = %path.display(), "created default configuration");
                Ok(config)
            }
            Err(e) => Err(e.into()),
        }
    }

    pub async fn save(&self, path: &Path) -> Result<()> {
        let raw = serde_json::to_string_pretty(self)?;
        tokio::fs::write(path, raw).await?;
        Ok(())
    }

    /// Apply [`API_KEY_ENV`] if it is set and non-empty.
    pub fn with_env_overrides(self) -> Self {
        match std::env::var(API_KEY_ENV) {
            Ok(key) => self.with_api_key_override(key),
            Err(_) => self,
        }
    }

    /// Use `key` for this process without writing it to the file.
    pub fn with_api_key_override(mut self, key: impl Into<String>) -> Self {
        let key = key.into();
        if !key.trim().is_empty() {
            self.api_key_override = Some(key);
        }
        self
    }

    /// Store a new key; it also replaces any process-only override.
    pub fn set_api_key(&mut self, key: impl Into<String>) {
        self.api_key = key.into();
        self.api_key_override = None;
    }

    /// The API key, rejecting empty and placeholder values.
    pub fn api_key(&self) -> Result<&str> {
        let key = self.api_key_override.as_deref().unwrap_or(&self.api_key).trim();
        if key.is_empty() || key == PLACEHOLDER_API_KEY {
            return Err(ServerError::Config(format!(
                "no API key configured; set api_key in the config file or {API_KEY_ENV}"
            )));
        }
        Ok(key)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn qdrant_url(&self) -> Option<&str> {
        self.qdrant_url.as_deref().map(str::trim).filter(|url| !url.is_empty())
    }

    pub fn rag_config(&self) -> Result<RagConfig> {
        Ok(RagConfig::builder()
            .chunk_size(self.chunk_size)
            .chunk_overlap(self.chunk_overlap)
            .top_k(self.top_k)
            .embedding_batch_size(self.embedding_batch_size)
            .build()?)
    }

    pub fn public_view(&self) -> PublicConfig {
        PublicConfig {
            system_prompt: self.system_prompt.clone(),
            base_url: self.base_url.clone(),
            model_name: self.model_name.clone(),
            embedding_model: self.embedding_model.clone(),
            collection: self.collection.clone(),
            top_k: self.top_k,
        }
    }
}
