//! Error type for the server and CLI front ends.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use ragloom_graph::GraphError;
use ragloom_model::ModelError;
use ragloom_rag::{IngestStage, RagError};
use serde_json::json;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ServerError {
    /// Missing or placeholder credentials, unusable settings.
    #[error("Configuration error: {0}")]
    Config(String),

    /// A request body or argument was rejected.
    #[error("Invalid request: {0}")]
    BadRequest(String),

    #[error(transparent)]
    Rag(#[from] RagError),

    #[error(transparent)]
    Graph(#[from] GraphError),

    #[error(transparent)]
    Model(#[from] ModelError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl ServerError {
    pub fn status(&self) -> StatusCode {
        match self {
            Self::Config(_)
            | Self::BadRequest(_)
            | Self::Rag(RagError::Config(_))
            | Self::Model(ModelError::Config(_)) => StatusCode::BAD_REQUEST,
            Self::Rag(RagError::Ingestion { stage: IngestStage::Load, .. }) => {
                StatusCode::NOT_FOUND
            }
            Self::Graph(GraphError::InvalidGraph(_)) | Self::Io(_) | Self::Serialization(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
            Self::Rag(_) | Self::Graph(_) | Self::Model(_) => StatusCode::BAD_GATEWAY,
        }
    }
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        tracing::error!(error = %self, "request failed");
        (self.status(), Json(json!({ "error": self.to_string() }))).into_response()
    }
}

pub type Result<T> = std::result::Result<T, ServerError>;
