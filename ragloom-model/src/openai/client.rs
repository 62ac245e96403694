//! OpenAI client implementation.

use async_openai::{
    Client,
    config::OpenAIConfig as AsyncOpenAIConfig,
    error::OpenAIError,
    types::{
        ChatCompletionRequestAssistantMessageArgs, ChatCompletionRequestMessage,
        ChatCompletionRequestSystemMessageArgs, ChatCompletionRequestUserMessageArgs,
        CreateChatCompletionRequestArgs,
    },
};
use async_stream::try_stream;
use async_trait::async_trait;
use futures::StreamExt;
use tracing::{debug, error};

use super::config::OpenAIConfig;
use crate::error::{ModelError, Result};
use crate::message::{Message, Role};
use crate::model::{ChatModel, FragmentStream};

/// Chat model for the OpenAI API and OpenAI-compatible APIs.
pub struct OpenAIChatModel {
    client: Client<AsyncOpenAIConfig>,
    model: String,
}

impl OpenAIChatModel {
    /// Create a new client.
    ///
    /// # Errors
    ///
    /// Returns [`ModelError::Config`] if the API key is empty or the HTTP
    /// client cannot be built.
    pub fn new(config: OpenAIConfig) -> Result<Self> {
        if config.api_key.trim().is_empty() {
            return Err(ModelError::Config("API key must not be empty".into()));
        }

        let mut openai_config = AsyncOpenAIConfig::new().with_api_key(&config.api_key);

        if let Some(org_id) = &config.organization_id {
            openai_config = openai_config.with_org_id(org_id);
        }

        if let Some(base_url) = &config.base_url {
            openai_config = openai_config.with_api_base(base_url);
        }

        let http = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| ModelError::Config(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            client: Client::with_config(openai_config).with_http_client(http),
            model: config.model,
        })
    }
}

fn to_request_message(
    message: &Message,
) -> std::result::Result<ChatCompletionRequestMessage, OpenAIError> {
    let content = message.content.as_str();
    Ok(match message.role {
        Role::System => ChatCompletionRequestSystemMessageArgs::default()
            .content(content)
            .build()?
            .into(),
        Role::User => {
            ChatCompletionRequestUserMessageArgs::default().content(content).build()?.into()
        }
        Role::Assistant => ChatCompletionRequestAssistantMessageArgs::default()
            .content(content)
            .build()?
            .into(),
    })
}

#[async_trait]
impl ChatModel for OpenAIChatModel {
    fn name(&self) -> &str {
        &self.model
    }

    async fn stream(&self, messages: Vec<Message>) -> Result<FragmentStream> {
        let model = self.model.clone();

        let request_messages = messages
            .iter()
            .map(to_request_message)
            .collect::<std::result::Result<Vec<_>, _>>()
            .map_err(|e| ModelError::generation(&model, format!("invalid message: {e}")))?;

        let request = CreateChatCompletionRequestArgs::default()
            .model(&model)
            .messages(request_messages)
            .build()
            .map_err(|e| ModelError::generation(&model, format!("failed to build request: {e}")))?;

        debug!(model = %model, message_count = messages.len(), "starting chat stream");

        let mut upstream = self.client.chat().create_stream(request).await.map_err(|e| {
            error!(model = %model, error = %e, "chat request failed");
            ModelError::generation(&model, format!("OpenAI API error: {e}"))
        })?;

        let stream = try_stream! {
            while let Some(result) = upstream.next().await {
                let chunk = result.map_err(|e| {
                    error!(model = %model, error = %e, "chat stream failed");
                    ModelError::generation(&model, format!("stream error: {e}"))
                })?;
                for choice in chunk.choices {
                    if let Some(content) = choice.delta.content {
                        if !content.is_empty() {
                            yield content;
                        }
                    }
                }
            }
        };

        Ok(Box::pin(stream))
    }
}
