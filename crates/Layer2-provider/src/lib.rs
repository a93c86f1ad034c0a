//! # semiform-provider
//!
//! LLM provider abstraction layer for Semiform.
//!
//! ## Call shapes
//! - Tool calling: Anthropic Messages (`create_full_project`)
//! - Structured output: OpenAI / Groq / DeepSeek chat completions, Ollama (`create_files`)
//! - Stateful run: OpenAI Assistants threads/runs (`createFile`)
//!
//! 세 형태 모두 `Provider::invoke` → `ModelResponse` 하나로 정규화됩니다.

mod http;
#[cfg(test)]
mod stub_server;

pub mod client;
pub mod error;
pub mod message;
pub mod providers;
pub mod retry;
pub mod run;
pub mod tool_def;
pub mod r#trait;

// Core traits and types
pub use client::ProviderClient;
pub use message::{ContentPart, Conversation, Message, MessageRole, ToolCall, ToolResult};
pub use r#trait::{ModelResponse, Provider, ProviderMetadata};
pub use run::RunStatus;
pub use tool_def::{ToolDef, CREATE_FILE, CREATE_FILES, CREATE_FULL_PROJECT};

// Error and retry
pub use error::ProviderError;
pub use retry::RetryConfig;

// Provider implementations
pub use providers::anthropic::AnthropicProvider;
pub use providers::assistant::AssistantProvider;
pub use providers::ollama::OllamaProvider;
pub use providers::openai::{OpenAiProvider, ResponseFormatMode};
