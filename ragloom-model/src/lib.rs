//! # ragloom-model
//!
//! Chat model integrations for Ragloom.
//!
//! ## Overview
//!
//! Generation is modelled as a stream of text fragments. A [`ChatModel`]
//! turns a rendered message sequence into a [`FragmentStream`]; callers that
//! need the final string drain it with [`collect_fragments`], treating
//! end-of-stream as the only success signal.
//!
//! - [`OpenAIChatModel`] - OpenAI and OpenAI-compatible APIs (SiliconFlow, vLLM, Ollama, ...)
//! - [`MockChatModel`] - scripted model for tests
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use ragloom_model::openai::{OpenAIChatModel, OpenAIConfig};
//! use ragloom_model::{ChatModel, Message};
//!
//! let model = OpenAIChatModel::new(OpenAIConfig::compatible(
//!     std::env::var("RAGLOOM_API_KEY")?,
//!     "https://api.siliconflow.cn/v1",
//!     "Qwen/Qwen3-8B",
//! ))?;
//! let answer = model.generate(vec![Message::user("Hello")]).await?;
//! ```

pub mod error;
pub mod message;
pub mod mock;
pub mod model;
#[cfg(feature = "openai")]
pub mod openai;

pub use error::{ModelError, Result};
pub use message::{Message, Role};
pub use mock::MockChatModel;
pub use model::{ChatModel, FragmentStream, collect_fragments};
#[cfg(feature = "openai")]
pub use openai::{OpenAIChatModel, OpenAIConfig};
