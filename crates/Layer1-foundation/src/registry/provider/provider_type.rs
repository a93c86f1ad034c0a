use crate::strings::{
    ENV_ANTHROPIC_API_KEY, ENV_DEEPSEEK_API_KEY, ENV_GROQ_API_KEY, ENV_OPENAI_API_KEY,
    PROVIDER_ANTHROPIC, PROVIDER_DEEPSEEK, PROVIDER_GROQ, PROVIDER_OLLAMA, PROVIDER_OPENAI,
    PROVIDER_OPENAI_ASSISTANT,
};
use crate::Error;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// How a provider exchanges files with the generation loop
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallShape {
    /// Stateless request/response with native tool calls (client replays the log)
    ToolCalling,
    /// Stateless call constrained to a JSON schema; returns the file list directly
    Structured,
    /// Server-side thread/run that must be polled and fed tool outputs
    StatefulRun,
}

/// 프로바이더 종류
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum ProviderType {
    Anthropic,
    Openai,
    OpenaiAssistant,
    Ollama,
    Groq,
    Deepseek,
}

impl ProviderType {
    pub const ALL: [ProviderType; 6] = [
        Self::Anthropic,
        Self::Openai,
        Self::OpenaiAssistant,
        Self::Ollama,
        Self::Groq,
        Self::Deepseek,
    ];

    /// CLI/설정 파일에서 쓰는 id
    pub fn id(&self) -> &'static str {
        match self {
            Self::Anthropic => PROVIDER_ANTHROPIC,
            Self::Openai => PROVIDER_OPENAI,
            Self::OpenaiAssistant => PROVIDER_OPENAI_ASSISTANT,
            Self::Ollama => PROVIDER_OLLAMA,
            Self::Groq => PROVIDER_GROQ,
            Self::Deepseek => PROVIDER_DEEPSEEK,
        }
    }

    /// 표시 이름
    pub fn name(&self) -> &'static str {
        match self {
            Self::Anthropic => "Anthropic",
            Self::Openai => "OpenAI",
            Self::OpenaiAssistant => "OpenAI Assistant",
            Self::Ollama => "Ollama",
            Self::Groq => "Groq",
            Self::Deepseek => "DeepSeek",
        }
    }

    pub fn call_shape(&self) -> CallShape {
        match self {
            Self::Anthropic => CallShape::ToolCalling,
            Self::OpenaiAssistant => CallShape::StatefulRun,
            Self::Openai | Self::Ollama | Self::Groq | Self::Deepseek => CallShape::Structured,
        }
    }

    /// API Key를 읽을 환경변수 (Ollama는 없음)
    pub fn api_key_env(&self) -> Option<&'static str> {
        match self {
            Self::Anthropic => Some(ENV_ANTHROPIC_API_KEY),
            Self::Openai | Self::OpenaiAssistant => Some(ENV_OPENAI_API_KEY),
            Self::Groq => Some(ENV_GROQ_API_KEY),
            Self::Deepseek => Some(ENV_DEEPSEEK_API_KEY),
            Self::Ollama => None,
        }
    }


    /// 기본 Base URL
    pub fn default_base_url(&self) -> &'static str {
        match self {
            Self::Anthropic => "https://api.anthropic.com/v1",
            Self::Openai | Self::OpenaiAssistant => "https://api.openai.com/v1",
            Self::Ollama => "http://localhost:11434",
            Self::Groq => "https://api.groq.com/openai/v1",
            Self::Deepseek => "https://api.deepseek.com/v1",
        }
    }

    /// 기본 모델
    pub fn default_model(&self) -> &'static str {
        match self {
            Self::Anthropic => "claude-3-7-sonnet-20250219",
            Self::Openai | Self::OpenaiAssistant => "gpt-4o",
            Self::Ollama => "llama3.1",
            Self::Groq => "llama-3.3-70b-versatile",
            Self::Deepseek => "deepseek-chat",
        }
    }

    /// 기본 max_tokens
    pub fn default_max_tokens(&self) -> u32 {
        match self {
            Self::Openai | Self::Ollama | Self::Groq | Self::Deepseek => 4096,
            Self::Anthropic | Self::OpenaiAssistant => 8192,
        }
    }

    /// 모델별로 알려진 max_tokens (없으면 None)
    pub fn known_max_tokens(&self, model: &str) -> Option<u32> {
        match (self, model) {
            (Self::Openai | Self::OpenaiAssistant, "gpt-4o") => Some(8192),
            (Self::Openai | Self::OpenaiAssistant, "gpt-4o-mini") => Some(4096),
            (Self::Anthropic, "claude-3-7-sonnet-20250219") => Some(64000),
            (Self::Anthropic, "claude-3-5-sonnet-20241022") => Some(8192),
            _ => None,
        }
    }

    /// 기본 타임아웃 (초)
    pub fn default_timeout(&self) -> u64 {
        match self {
            Self::Anthropic | Self::Ollama => 600,
            Self::Groq => 60,
            _ => 300,
        }
    }
}

impl std::fmt::Display for ProviderType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.id())
    }
}

impl Default for ProviderType {
    fn default() -> Self {
        Self::Anthropic
    }
}

impl FromStr for ProviderType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let needle = s.trim().to_lowercase();
        Self::ALL
            .iter()
            .copied()
            .find(|p| p.id() == needle)
            .ok_or_else(|| Error::UnknownProvider(s.to_string()))
    }
}
