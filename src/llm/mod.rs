//! # LLM Module
//!
//! Wire types for the OpenAI-compatible Chat Completions protocol, the
//! `LLMClient` trait the engine depends on, and the LM Studio HTTP client.

pub mod base_client;
pub mod lmstudio_client;

pub use base_client::{LLMClient, LLMError, LLMMessage, MessageRole, ToolChoice};
pub use lmstudio_client::LmStudioClient;
