//! OpenAI and OpenAI-compatible chat models.
//!
//! Any endpoint that speaks the `/chat/completions` streaming protocol works,
//! including SiliconFlow, vLLM and Ollama.
//!
//! # Example
//!
//! ```rust,ignore
//! use ragloom_model::openai::{OpenAIChatModel, OpenAIConfig};
//!
//! let model = OpenAIChatModel::new(
//!     OpenAIConfig::compatible("sk-...", "https://api.siliconflow.cn/v1", "Qwen/Qwen3-8B")
//!         .with_timeout(std::time::Duration::from_secs(60)),
//! )?;
//! ```

mod client;
mod config;

pub use client::OpenAIChatModel;
pub use config::OpenAIConfig;
