//! OpenAI chat completions provider (structured output)
//!
//! OpenAI는 `json_schema` response format을, Groq/DeepSeek 같은 호환 endpoint는
//! `json_object` 모드를 사용합니다.

use super::structured::{already_answered, flatten, synthesize_tool_request};
use crate::{
    error::ProviderError,
    http::{build_client, ensure_success, read_json},
    r#trait::{ModelResponse, Provider, ProviderMetadata},
    retry::{with_retry, RetryConfig},
    Conversation, ToolDef,
};
use async_trait::async_trait;
use reqwest::Client;
use semiform_foundation::{ProviderSettings, ProviderType};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::debug;

/// json_object 모드에서 출력 형태를 알려주는 system 메시지
const JSON_OBJECT_HINT: &str = "Respond only with a JSON object of the form \
{\"files\": [{\"filepath\": \"<path with filename>\", \"content\": \"<file content>\"}]}.";

/// Response format 종류
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseFormatMode {
    /// `{"type": "json_schema"}` (OpenAI)
    JsonSchema,
    /// `{"type": "json_object"}` (OpenAI 호환 endpoint)
    JsonObject,
}

impl ResponseFormatMode {
    fn for_provider(provider_type: ProviderType) -> Self {
        match provider_type {
            ProviderType::Openai => Self::JsonSchema,
            _ => Self::JsonObject,
        }
    }
}

/// OpenAI (and compatible) structured-output provider
pub struct OpenAiProvider {
    client: Client,
    api_key: Option<String>,
    metadata: ProviderMetadata,
    tool: ToolDef,
    mode: ResponseFormatMode,
    retry_config: RetryConfig,
}

impl OpenAiProvider {
    pub fn new(settings: &ProviderSettings) -> Self {
        Self {
            client: build_client(settings.effective_timeout()),
            api_key: settings.effective_api_key(),
            metadata: ProviderMetadata {
                provider_type: settings.provider_type,
                model: settings.effective_model().to_string(),
                max_tokens: settings.effective_max_tokens(),
                base_url: settings.effective_base_url().trim_end_matches('/').to_string(),
            },
            tool: ToolDef::create_files(),
            mode: ResponseFormatMode::for_provider(settings.provider_type),
            retry_config: RetryConfig::default(),
        }
    }

    pub fn with_retry_config(mut self, config: RetryConfig) -> Self {
        self.retry_config = config;
        self
    }

    pub fn mode(&self) -> ResponseFormatMode {
        self.mode
    }

    fn chat_url(&self) -> String {
        format!("{}/chat/completions", self.metadata.base_url)
    }

    fn build_request(&self, instructions: &str, conversation: &Conversation) -> ChatRequest {
        let mut messages: Vec<ChatMessage> = flatten(instructions, conversation)
            .into_iter()
            .map(|(role, content)| ChatMessage {
                role: role.to_string(),
                content,
            })
            .collect();

        let response_format = match self.mode {
            ResponseFormatMode::JsonSchema => json!({
                "type": "json_schema",
                "json_schema": {
                    "name": self.tool.name,
                    "description": self.tool.description,
                    "schema": self.tool.to_json_schema(),
                    "strict": false
                }
            }),
            ResponseFormatMode::JsonObject => {
                messages.insert(
                    0,
                    ChatMessage {
                        role: "system".to_string(),
                        content: JSON_OBJECT_HINT.to_string(),
                    },
                );
                json!({ "type": "json_object" })
            }
        };

        ChatRequest {
            model: self.metadata.model.clone(),
            messages,
            max_tokens: self.metadata.max_tokens,
            response_format,
        }
    }

    async fn make_request(
        &self,
        api_key: &str,
        request: &ChatRequest,
    ) -> Result<ChatResponse, ProviderError> {
        let response = self
            .client
            .post(self.chat_url())
            .bearer_auth(api_key)
            .json(request)
            .send()
            .await
            .map_err(ProviderError::from_reqwest)?;

        let response = ensure_success(response, parse_error_response).await?;
        read_json(response).await
    }

    fn map_response(&self, response: ChatResponse) -> ModelResponse {
        let Some(choice) = response.choices.into_iter().next() else {
            return ModelResponse::Failed("response carried no choices".to_string());
        };

        match choice.finish_reason.as_deref() {
            Some("length") => return ModelResponse::TruncatedByTokenLimit,
            Some("content_filter") => {
                return ModelResponse::Failed("output blocked by content filter".to_string())
            }
            _ => {}
        }

        match choice.message.content {
            Some(content) if !content.trim().is_empty() => {
                synthesize_tool_request(&self.tool.name, content)
            }
            _ => ModelResponse::Failed(
                choice
                    .message
                    .refusal
                    .unwrap_or_else(|| "model returned no content".to_string()),
            ),
        }
    }
}

#[async_trait]
impl Provider for OpenAiProvider {
    fn metadata(&self) -> &ProviderMetadata {
        &self.metadata
    }

    fn create_files_tool(&self) -> &ToolDef {
        &self.tool
    }

    fn is_available(&self) -> bool {
        self.api_key.is_some()
    }

    async fn invoke(
        &self,
        instructions: &str,
        conversation: &Conversation,
    ) -> Result<ModelResponse, ProviderError> {
        if let Some(done) = already_answered(conversation) {
            return Ok(done);
        }

        let api_key = self.api_key.as_deref().ok_or_else(|| {
            ProviderError::NotConfigured(format!(
                "{} is not set",
                self.metadata
                    .provider_type
                    .api_key_env()
                    .unwrap_or("API key")
            ))
        })?;

        let request = self.build_request(instructions, conversation);
        debug!(
            "{} request: model={}, messages={}",
            self.metadata.id(),
            request.model,
            request.messages.len()
        );

        let response = with_retry(&self.retry_config, "openai_invoke", || {
            self.make_request(api_key, &request)
        })
        .await?;

        Ok(self.map_response(response))
    }
}

/// OpenAI 형식의 error body를 해석 (assistant provider와 공유)
pub(crate) fn parse_error_response(status: u16, body: &str) -> ProviderError {
    if let Ok(error_response) = serde_json::from_str::<OpenAiErrorResponse>(body) {
        let error = error_response.error;
        let message = error.message;

        return match error.code.as_deref() {
            Some("rate_limit_exceeded") => ProviderError::RateLimited {
                retry_after_ms: None,
            },
            Some("context_length_exceeded") => ProviderError::ContextLengthExceeded(message),
            Some("invalid_api_key") => ProviderError::Authentication(message),
            Some("insufficient_quota") => ProviderError::QuotaExceeded(message),
            Some("model_not_found") => ProviderError::ModelNotAvailable(message),
            _ => ProviderError::from_http_status(status, &message),
        };
    }

    ProviderError::from_http_status(status, body)
}

// ============================================================================
// OpenAI API Types
// ============================================================================

#[derive(Debug, Serialize)]
struct ChatRequest {
    model: String,
    messages: Vec<ChatMessage>,
    max_tokens: u32,
    response_format: Value,
}

#[derive(Debug, Serialize)]
struct ChatMessage {
    role: String,
    content: String,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatResponseMessage,
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ChatResponseMessage {
    content: Option<String>,
    #[serde(default)]
    refusal: Option<String>,
}

#[derive(Debug, Deserialize)]
struct OpenAiErrorResponse {
    error: OpenAiError,
}

#[derive(Debug, Deserialize)]
struct OpenAiError {
    message: String,
    code: Option<String>,
}
