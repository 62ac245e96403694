//! The chat model trait and fragment streams.

use std::pin::Pin;

use async_trait::async_trait;
use futures::{Stream, StreamExt};

use crate::error::Result;
use crate::message::Message;

/// An incremental sequence of generated text fragments.
///
/// The stream owns the underlying connection; dropping it at any point
/// (completion, error, cancellation) releases that connection.
pub type FragmentStream = Pin<Box<dyn Stream<Item = Result<String>> + Send>>;

/// A generative chat backend.
///
/// Implementations only need to provide [`stream`](ChatModel::stream);
/// [`generate`](ChatModel::generate) drains it.
#[async_trait]
pub trait ChatModel: Send + Sync {
    /// The model name, used in logs and errors.
    fn name(&self) -> &str;

    /// Start a streaming generation for the given messages.
    ///
    /// An error returned here means the request never started. Errors
    /// yielded by the stream end it abnormally; fragments already yielded
    /// are not retracted.
    async fn stream(&self, messages: Vec<Message>) -> Result<FragmentStream>;

    /// Generate a complete answer by draining [`stream`](ChatModel::stream).
    async fn generate(&self, messages: Vec<Message>) -> Result<String> {
        let stream = self.stream(messages).await?;
        collect_fragments(stream).await
    }
}

/// Drain a fragment stream, concatenating fragments in arrival order.
///
/// Only end-of-stream counts as success; the first error is returned and the
/// partial text is discarded.
pub async fn collect_fragments(mut stream: FragmentStream) -> Result<String> {
    let mut answer = String::new();
    while let Some(fragment) = stream.next().await {
        answer.push_str(&fragment?);
    }
    Ok(answer)
}
