//! # ragloom-server
//!
//! HTTP and command-line front ends for Ragloom.
//!
//! Both adapters share one [`AppState`]: a [`SharedContext`] holding the
//! persisted [`AppConfig`] and the cached chat model, the vector store, the
//! [`ChatHistory`] of completed turns, and a factory for embedding providers. The adapters own no retrieval logic;
//! every query runs the `ragloom-rag` retrieval graph.
//!
//! - [`http`] - axum router: `POST /query` (SSE), `POST /ingest`,
//!   `GET /get-config`, `POST /update-config`, `POST /update-prompt`,
//!   `POST /clear-history`
//! - [`cli`] - the `ragloom` binary: `serve`, `ingest`, `ask`, `chat`

pub mod app;
pub mod cli;
pub mod config;
pub mod context;
pub mod error;
pub mod history;
pub mod http;

pub use app::{AppState, EmbedderFactory};
pub use config::{AppConfig, PublicConfig};
pub use context::{ModelFactory, SharedContext};
pub use error::{Result, ServerError};
pub use history::ChatHistory;
pub use http::{ServerConfig, app_router, run_server};
