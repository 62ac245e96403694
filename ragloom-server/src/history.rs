//! Conversation turns kept between questions.

use ragloom_model::Message;
use tokio::sync::RwLock;
use tracing::debug;

/// Completed question/answer pairs, oldest first.
///
/// A turn is only recorded once its answer streamed to the end, so a
/// failed or cancelled question leaves no trace.
#[derive(Debug, Default)]
pub struct ChatHistory {
    messages: RwLock<Vec<Message>>,
}

impl ChatHistory {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn snapshot(&self) -> Vec<Message> {
        self.messages.read().await.clone()
    }

    pub async fn append(&self, question: impl Into<String>, answer: impl Into<String>) {
        let mut messages = self.messages.write().await;
        messages.push(Message::user(question));
        messages.push(Message::assistant(answer));
        debug!(turns = messages.len() / 2, "history appended");
    }

    pub async fn clear(&self) {
        self.messages.write().await.clear();
        debug!("history cleared");
    }

    pub async fn is_empty(&self) -> bool {
        self.messages.read().await.is_empty()
    }
}
