//! Process-wide configuration plus the cached chat-model handle.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use ragloom_model::{ChatModel, OpenAIChatModel, OpenAIConfig};
use tokio::sync::RwLock;
use tracing::{debug, info};

use crate::config::AppConfig;
use crate::error::Result;

/// Builds a chat model from the current configuration.
pub type ModelFactory = Arc<dyn Fn(&AppConfig) -> Result<Arc<dyn ChatModel>> + Send + Sync>;

/// The default factory: an OpenAI-compatible client.
pub fn openai_factory() -> ModelFactory {
    Arc::new(|config: &AppConfig| {
        let openai = OpenAIConfig::compatible(
            config.api_key()?,
            config.base_url.clone(),
            config.model_name.clone(),
        )
        .with_timeout(config.timeout());
        let model: Arc<dyn ChatModel> = Arc::new(OpenAIChatModel::new(openai)?);
        Ok(model)
    })
}

struct Inner {
    config: AppConfig,
    model: Option<Arc<dyn ChatModel>>,
}

/// Holds the configuration record and a lazily built model handle.
///
/// Both live behind one lock so a reader never observes a model built
/// from a configuration that has since been replaced.
pub struct SharedContext {
    path: PathBuf,
    factory: ModelFactory,
    inner: RwLock<Inner>,
}

impl std::fmt::Debug for SharedContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SharedContext").field("path", &self.path).finish_non_exhaustive()
    }
}

impl SharedContext {
    pub fn new(path: impl Into<PathBuf>, config: AppConfig, factory: ModelFactory) -> Self {
        Self { path: path.into(), factory, inner: RwLock::new(Inner { config, model: None }) }
    }

    /// Load (or create) the file at `path` and apply environment overrides.
    pub async fn load(path: impl Into<PathBuf>, factory: ModelFactory) -> Result<Self> {
        let path = path.into();
        let config = AppConfig::load_or_create(&path).await?.with_env_overrides();
        Ok(Self::new(path, config, factory))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// A snapshot of the current configuration.
    pub async fn config(&self) -> AppConfig {
        self.inner.read().await.config.clone()
    }

    /// The cached model, building it from the current configuration if needed.
    pub async fn get(&self) -> Result<Arc<dyn ChatModel>> {
        if let Some(model) = &self.inner.read().await.model {
            return Ok(model.clone());
        }

        let mut inner = self.inner.write().await;
        // Another task may have built it while we waited for the write lock.
        if let Some(model) = &inner.model {
            return Ok(model.clone());
        }
        let model = (self.factory)(&inner.config)?;
        info!(model = model.name(), "chat model initialized");
        inner.model = Some(model.clone());
        Ok(model)
    }

    /// Drop the cached model; the next [`get`](Self::get) rebuilds it.
    pub async fn invalidate(&self) {
        self.inner.write().await.model = None;
        debug!("chat model invalidated");
    }

    /// Edit the configuration, persist it, then drop the cached model.
    ///
    /// Nothing changes in memory if the file cannot be written.
    pub async fn update<F>(&self, edit: F) -> Result<AppConfig>
    where
        F: FnOnce(&mut AppConfig),
    {
        let mut inner = self.inner.write().await;
        let mut config = inner.config.clone();
        edit(&mut config);
        config.save(&self.path).await?;
        inner.config = config.clone();
        inner.model = None;
        info!(path = %self.path.display(), "configuration updated");
        Ok(config)
    }
}
