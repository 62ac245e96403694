//! Configuration for OpenAI-compatible chat models.

use std::time::Duration;

/// Default per-request timeout for chat calls.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);

/// Connection settings for an OpenAI-compatible chat endpoint.
#[derive(Debug, Clone)]
pub struct OpenAIConfig {
    pub api_key: String,
    pub model: String,
    /// Overrides `https://api.openai.com/v1` when set.
    pub base_url: Option<String>,
    pub organization_id: Option<String>,
    /// Applied to every HTTP call, never to the graph as a whole.
    pub timeout: Duration,
}

impl OpenAIConfig {
    /// Settings for the official OpenAI API.
    pub fn new(api_key: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            model: model.into(),
            base_url: None,
            organization_id: None,
            timeout: DEFAULT_TIMEOUT,
        }
    }

    /// Settings for an OpenAI-compatible API at `base_url`.
    pub fn compatible(
        api_key: impl Into<String>,
        base_url: impl Into<String>,
        model: impl Into<String>,
    ) -> Self {
        Self { base_url: Some(base_url.into()), ..Self::new(api_key, model) }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_organization(mut self, org_id: impl Into<String>) -> Self {
        self.organization_id = Some(org_id.into());
        self
    }
}
