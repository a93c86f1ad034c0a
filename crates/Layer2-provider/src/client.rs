//! ProviderClient - provider 종류에 대한 닫힌 union
//!
//! 새 provider는 variant 하나와 `from_settings`의 match arm 하나로 추가합니다.

use crate::{
    error::ProviderError,
    providers::{
        anthropic::AnthropicProvider, assistant::AssistantProvider, ollama::OllamaProvider,
        openai::OpenAiProvider,
    },
    r#trait::{ModelResponse, Provider, ProviderMetadata},
    Conversation, ToolDef,
};
use async_trait::async_trait;
use semiform_foundation::{ProviderSettings, ProviderType};
use tracing::{info, warn};

/// 설정에서 만들어지는 구체 provider
pub enum ProviderClient {
    /// Anthropic Messages (tool calling)
    Anthropic(AnthropicProvider),
    /// OpenAI chat completions + OpenAI 호환 endpoint (structured output)
    OpenAi(OpenAiProvider),
    /// Ollama `/api/chat` (structured output)
    Ollama(OllamaProvider),
    /// OpenAI Assistants (stateful run)
    Assistant(AssistantProvider),
}

impl ProviderClient {
    /// Create the client for the given settings
    ///
    /// 자격 증명이 없어도 만들어지고, 실제 호출 시점에 실패합니다.
    pub fn from_settings(settings: &ProviderSettings) -> Result<Self, ProviderError> {
        settings
            .validate()
            .map_err(ProviderError::InvalidRequest)?;

        let client = match settings.provider_type {
            ProviderType::Anthropic => Self::Anthropic(AnthropicProvider::new(settings)),
            ProviderType::Openai | ProviderType::Groq | ProviderType::Deepseek => {
                Self::OpenAi(OpenAiProvider::new(settings))
            }
            ProviderType::Ollama => Self::Ollama(OllamaProvider::new(settings)),
            ProviderType::OpenaiAssistant => Self::Assistant(AssistantProvider::new(settings)),
        };

        let meta = client.metadata();
        info!(
            "Using provider {} (model {}, max tokens {})",
            meta.display_name(),
            meta.model,
            meta.max_tokens
        );
        if !client.is_available() {
            warn!(
                "No API key found for {}; set {} before generating",
                meta.display_name(),
                settings.provider_type.api_key_env().unwrap_or("an API key")
            );
        }

        Ok(client)
    }

    fn inner(&self) -> &dyn Provider {
        match self {
            Self::Anthropic(p) => p,
            Self::OpenAi(p) => p,
            Self::Ollama(p) => p,
            Self::Assistant(p) => p,
        }
    }
}

#[async_trait]
impl Provider for ProviderClient {
    fn metadata(&self) -> &ProviderMetadata {
        self.inner().metadata()
    }

    fn create_files_tool(&self) -> &ToolDef {
        self.inner().create_files_tool()
    }

    fn is_available(&self) -> bool {
        self.inner().is_available()
    }

    async fn invoke(
        &self,
        instructions: &str,
        conversation: &Conversation,
    ) -> Result<ModelResponse, ProviderError> {
        match self {
            Self::Anthropic(p) => p.invoke(instructions, conversation).await,
            Self::OpenAi(p) => p.invoke(instructions, conversation).await,
            Self::Ollama(p) => p.invoke(instructions, conversation).await,
            Self::Assistant(p) => p.invoke(instructions, conversation).await,
        }
    }
}
