//! Ollama provider (self-hosted, structured output via `format` schema)

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
use semiform_foundation::ProviderSettings;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Ollama provider for local models
///
/// API 키가 필요 없고, `--host`로 endpoint를 바꿀 수 있습니다.
pub struct OllamaProvider {
    client: Client,
    metadata: ProviderMetadata,
    tool: ToolDef,
    retry_config: RetryConfig,
}

impl OllamaProvider {
    pub fn new(settings: &ProviderSettings) -> Self {
        Self {
            client: build_client(settings.effective_timeout()),
            metadata: ProviderMetadata {
                provider_type: settings.provider_type,
                model: settings.effective_model().to_string(),
                max_tokens: settings.effective_max_tokens(),
                base_url: settings.effective_base_url().trim_end_matches('/').to_string(),
            },
            tool: ToolDef::create_files(),
            retry_config: RetryConfig::default(),
        }
    }

    pub fn with_retry_config(mut self, config: RetryConfig) -> Self {
        self.retry_config = config;
        self
    }

    fn chat_url(&self) -> String {
        format!("{}/api/chat", self.metadata.base_url)
    }

    fn build_request(&self, instructions: &str, conversation: &Conversation) -> OllamaRequest {
        OllamaRequest {
            model: self.metadata.model.clone(),
            messages: flatten(instructions, conversation)
                .into_iter()
                .map(|(role, content)| OllamaMessage {
                    role: role.to_string(),
                    content,
                })
                .collect(),
            format: self.tool.to_json_schema(),
            stream: false,
            options: OllamaOptions {
                num_predict: self.metadata.max_tokens,
            },
        }
    }

    async fn make_request(&self, request: &OllamaRequest) -> Result<OllamaResponse, ProviderError> {
        let response = self
            .client
            .post(self.chat_url())
            .json(request)
            .send()
            .await
            .map_err(ProviderError::from_reqwest)?;

        let response = ensure_success(response, ProviderError::from_http_status).await?;
        read_json(response).await
    }

    fn map_response(&self, response: OllamaResponse) -> ModelResponse {
        if response.done_reason.as_deref() == Some("length") {
            return ModelResponse::TruncatedByTokenLimit;
        }
        let content = response.message.content;
        if content.trim().is_empty() {
            return ModelResponse::Failed("model returned no content".to_string());
        }
        synthesize_tool_request(&self.tool.name, content)
    }
}

#[async_trait]
impl Provider for OllamaProvider {
    fn metadata(&self) -> &ProviderMetadata {
        &self.metadata
    }

    fn create_files_tool(&self) -> &ToolDef {
        &self.tool
    }

    fn is_available(&self) -> bool {
        true
    }

    async fn invoke(
        &self,
        instructions: &str,
        conversation: &Conversation,
    ) -> Result<ModelResponse, ProviderError> {
        if let Some(done) = already_answered(conversation) {
            return Ok(done);
        }

        let request = self.build_request(instructions, conversation);
        debug!(
            "ollama request: {} model={}, messages={}",
            self.chat_url(),
            request.model,
            request.messages.len()
        );

        let response = with_retry(&self.retry_config, "ollama_invoke", || {
            self.make_request(&request)
        })
        .await?;

        Ok(self.map_response(response))
    }
}

// ============================================================================
// Ollama API Types
// ============================================================================

#[derive(Debug, Serialize)]
struct OllamaRequest {
    model: String,
    messages: Vec<OllamaMessage>,
    format: serde_json::Value,
    stream: bool,
    options: OllamaOptions,
}

#[derive(Debug, Serialize)]
struct OllamaOptions {
    num_predict: u32,
}

#[derive(Debug, Serialize, Deserialize)]
struct OllamaMessage {
    role: String,
    #[serde(default)]
    content: String,
}

#[derive(Debug, Deserialize)]
struct OllamaResponse {
    message: OllamaMessage,
    #[serde(default)]
    done_reason: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Message;
    use semiform_foundation::{Phase, ProviderType};
    use serde_json::json;

    fn provider(host: &str) -> OllamaProvider {
        OllamaProvider::new(
            &ProviderSettings::new(ProviderType::Ollama)
                .base_url(host)
                .model("qwen2.5-coder"),
        )
    }

    #[test]
    fn test_chat_url_uses_host_override() {
        let provider = provider("http://gpu-box:11434/");
        assert_eq!(provider.chat_url(), "http://gpu-box:11434/api/chat");
        assert!(provider.is_available());
    }

    #[test]
    fn test_build_request_shape() {
        let provider = provider("http://localhost:11434");
        let conv = Conversation::with_messages(Phase::Backend, vec![Message::user("{}")]);
        let value = serde_json::to_value(provider.build_request("instructions", &conv)).unwrap();

        assert_eq!(value["model"], "qwen2.5-coder");
        assert_eq!(value["stream"], false);
        assert_eq!(value["options"]["num_predict"], 4096);
        assert_eq!(value["format"]["required"], json!(["files"]));
        assert_eq!(value["messages"][0]["role"], "system");
    }

    #[test]
    fn test_map_response() {
        let provider = provider("http://localhost:11434");
        let ok: OllamaResponse = serde_json::from_value(json!({
            "message": {"role": "assistant", "content": "{\"files\": []}"},
            "done": true,
            "done_reason": "stop"
        }))
        .unwrap();
        assert!(matches!(
            provider.map_response(ok),
            ModelResponse::ToolRequest { .. }
        ));

        let cut: OllamaResponse = serde_json::from_value(json!({
            "message": {"role": "assistant", "content": "{\"fi"},
            "done": true,
            "done_reason": "length"
        }))
        .unwrap();
        assert_eq!(provider.map_response(cut), ModelResponse::TruncatedByTokenLimit);
    }
}
