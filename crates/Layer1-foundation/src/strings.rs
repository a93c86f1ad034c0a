//! Shared string constants
//!
//! Provider id, 환경변수 이름, 파일명 등 여러 레이어에서 쓰는 상수 모음

// ============================================================================
// Provider Constants
// ============================================================================

/// Anthropic provider ID
pub const PROVIDER_ANTHROPIC: &str = "anthropic";
/// OpenAI (chat completions, structured output) provider ID
pub const PROVIDER_OPENAI: &str = "openai";
/// OpenAI Assistants (threads/runs) provider ID
pub const PROVIDER_OPENAI_ASSISTANT: &str = "openai-assistant";
/// Ollama provider ID
pub const PROVIDER_OLLAMA: &str = "ollama";
/// Groq provider ID
pub const PROVIDER_GROQ: &str = "groq";
/// DeepSeek provider ID
pub const PROVIDER_DEEPSEEK: &str = "deepseek";

// ============================================================================
// Environment Constants
// ============================================================================

pub const ENV_ANTHROPIC_API_KEY: &str = "ANTHROPIC_API_KEY";
pub const ENV_OPENAI_API_KEY: &str = "OPENAI_API_KEY";
pub const ENV_GROQ_API_KEY: &str = "GROQ_API_KEY";
pub const ENV_DEEPSEEK_API_KEY: &str = "DEEPSEEK_API_KEY";

/// Reuse an existing OpenAI assistant instead of creating one per run
pub const ENV_ASSISTANT_ID: &str = "SEMIFORM_ASSISTANT_ID";

// ============================================================================
// File Constants
// ============================================================================

/// Notes artifact written by the backend phase and read by the frontend phase.
/// Always lives directly under the project root.
pub const NOTES_FILE: &str = "NOTES.md";

/// Run log written inside the generated project
pub const LOG_FILE: &str = "combined.log";
