//! Error types for the `ragloom-model` crate.

use thiserror::Error;

/// Errors produced by chat model backends.
#[derive(Debug, Error)]
pub enum ModelError {
    /// The model could not be constructed from its configuration.
    #[error("Configuration error: {0}")]
    Config(String),

    /// The chat service failed, either before the first fragment or mid-stream.
    #[error("Generation error ({model}): {message}")]
    Generation {
        /// The model that produced the error.
        model: String,
        /// A description of the failure.
        message: String,
    },
}

impl ModelError {
    pub(crate) fn generation(model: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Generation { model: model.into(), message: message.into() }
    }
}

/// A convenience result type for model operations.
pub type Result<T> = std::result::Result<T, ModelError>;
