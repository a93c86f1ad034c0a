//! LLM Provider implementations

pub mod anthropic;
pub mod assistant;
pub mod ollama;
pub mod openai;
mod structured;
