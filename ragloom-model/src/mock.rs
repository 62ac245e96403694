//! Scripted chat model for tests.

use std::sync::{Arc, Mutex};

use async_stream::try_stream;
use async_trait::async_trait;

use crate::error::{ModelError, Result};
use crate::message::Message;
use crate::model::{ChatModel, FragmentStream};

#[derive(Debug, Clone)]
enum Ending {
    Complete,
    Fail(String),
    Hang,
}

/// A [`ChatModel`] that replays a fixed list of fragments.
///
/// Every request is recorded so tests can inspect the rendered prompt.
///
/// ```rust,ignore
/// let model = MockChatModel::new(["Hello", ", world"]).fail_after(1, "rate limited");
/// ```
#[derive(Debug, Clone)]
pub struct MockChatModel {
    name: String,
    fragments: Vec<String>,
    emit: usize,
    ending: Ending,
    start_error: Option<String>,
    requests: Arc<Mutex<Vec<Vec<Message>>>>,
}

impl MockChatModel {
    pub fn new<I, S>(fragments: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let fragments: Vec<String> = fragments.into_iter().map(Into::into).collect();
        Self {
            name: "mock".to_string(),
            emit: fragments.len(),
            fragments,
            ending: Ending::Complete,
            start_error: None,
            requests: Arc::default(),
        }
    }

    /// Yield `count` fragments, then end the stream with an error.
    pub fn fail_after(mut self, count: usize, message: impl Into<String>) -> Self {
        self.emit = count.min(self.fragments.len());
        self.ending = Ending::Fail(message.into());
        self
    }

    /// Yield `count` fragments, then never produce another item.
    pub fn hang_after(mut self, count: usize) -> Self {
        self.emit = count.min(self.fragments.len());
        self.ending = Ending::Hang;
        self
    }

    /// Refuse the request before any fragment is produced.
    pub fn fail_on_start(mut self, message: impl Into<String>) -> Self {
        self.start_error = Some(message.into());
        self
    }

    /// All message sequences received so far, oldest first.
    pub fn requests(&self) -> Vec<Vec<Message>> {
        self.requests.lock().map(|r| r.clone()).unwrap_or_default()
    }
}

#[async_trait]
impl ChatModel for MockChatModel {
    fn name(&self) -> &str {
        &self.name
    }

    async fn stream(&self, messages: Vec<Message>) -> Result<FragmentStream> {
        if let Ok(mut requests) = self.requests.lock() {
            requests.push(messages);
        }
        if let Some(message) = &self.start_error {
            return Err(ModelError::generation(&self.name, message.clone()));
        }

        let name = self.name.clone();
        let fragments: Vec<String> = self.fragments.iter().take(self.emit).cloned().collect();
        let ending = self.ending.clone();

        let stream = try_stream! {
            for fragment in fragments {
                yield fragment;
            }
            match ending {
                Ending::Complete => {}
                Ending::Fail(message) => Err(ModelError::generation(name, message))?,
                Ending::Hang => futures::future::pending::<()>().await,
            }
        };

        Ok(Box::pin(stream))
    }
}
