//! Anthropic Messages provider (native tool calling)
//!
//! 매 호출마다 전체 대화 로그를 다시 보냅니다. 서버 측 상태는 없습니다.

use crate::{
    error::ProviderError,
    http::{build_client, ensure_success, read_json},
    r#trait::{ModelResponse, Provider, ProviderMetadata},
    retry::{with_retry, RetryConfig},
    ContentPart, Conversation, Message, MessageRole, ToolCall, ToolDef,
};
use async_trait::async_trait;
use reqwest::Client;
use semiform_foundation::ProviderSettings;
use serde::{Deserialize, Serialize};
use tracing::debug;

const ANTHROPIC_VERSION: &str = "2023-06-01";

/// Anthropic Claude provider
pub struct AnthropicProvider {
    client: Client,
    api_key: Option<String>,
    metadata: ProviderMetadata,
    tool: ToolDef,
    retry_config: RetryConfig,
}

impl AnthropicProvider {
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
            tool: ToolDef::create_full_project(),
            retry_config: RetryConfig::default(),
        }
    }

    pub fn with_retry_config(mut self, config: RetryConfig) -> Self {
        self.retry_config = config;
        self
    }

    fn messages_url(&self) -> String {
        format!("{}/messages", self.metadata.base_url)
    }

    /// Build request for Anthropic API
    ///
    /// 연속된 같은 role의 메시지는 하나로 합칩니다 (tool_result 여러 개 → user 메시지 하나).
    fn build_request(&self, instructions: &str, conversation: &Conversation) -> AnthropicRequest {
        let mut messages: Vec<AnthropicMessage> = Vec::new();

        for msg in conversation.messages() {
            if msg.role == MessageRole::System {
                continue;
            }
            let role = msg.role.as_str();
            let blocks = to_blocks(msg);
            match messages.last_mut() {
                Some(last) if last.role == role => last.content.extend(blocks),
                _ => messages.push(AnthropicMessage {
                    role: role.to_string(),
                    content: blocks,
                }),
            }
        }

        AnthropicRequest {
            model: self.metadata.model.clone(),
            max_tokens: self.metadata.max_tokens,
            system: (!instructions.is_empty()).then(|| instructions.to_string()),
            messages,
            tools: vec![AnthropicTool::from(&self.tool)],
        }
    }

    async fn make_request(
        &self,
        api_key: &str,
        request: &AnthropicRequest,
    ) -> Result<AnthropicResponse, ProviderError> {
        let response = self
            .client
            .post(self.messages_url())
            .header("x-api-key", api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .header("content-type", "application/json")
            .json(request)
            .send()
            .await
            .map_err(ProviderError::from_reqwest)?;

        let response = ensure_success(response, ProviderError::from_http_status).await?;
        read_json(response).await
    }
}

#[async_trait]
impl Provider for AnthropicProvider {
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
        let api_key = self.api_key.as_deref().ok_or_else(|| {
            ProviderError::NotConfigured("ANTHROPIC_API_KEY is not set".to_string())
        })?;

        let request = self.build_request(instructions, conversation);
        debug!(
            "anthropic request: model={}, messages={}",
            request.model,
            request.messages.len()
        );

        let response = with_retry(&self.retry_config, "anthropic_invoke", || {
            self.make_request(api_key, &request)
        })
        .await?;

        Ok(map_response(response))
    }
}

/// stop_reason → ModelResponse
fn map_response(response: AnthropicResponse) -> ModelResponse {
    let mut text = String::new();
    let mut calls = Vec::new();

    for block in response.content {
        match block {
            ContentBlock::Text { text: t } => text.push_str(&t),
            ContentBlock::ToolUse { id, name, input } => calls.push(ToolCall::new(id, name, input)),
            ContentBlock::ToolResult { .. } | ContentBlock::Other => {}
        }
    }

    match response.stop_reason.as_deref() {
        Some("tool_use") => ModelResponse::ToolRequest { calls, text },
        Some("end_turn") | Some("stop_sequence") => ModelResponse::Completed(text),
        Some("max_tokens") => ModelResponse::TruncatedByTokenLimit,
        Some(other) => ModelResponse::Failed(format!("unexpected stop_reason: {}", other)),
        None => ModelResponse::Failed("response carried no stop_reason".to_string()),
    }
}

fn to_blocks(msg: &Message) -> Vec<ContentBlock> {
    msg.content
        .iter()
        .map(|part| match part {
            ContentPart::Text { text } => ContentBlock::Text { text: text.clone() },
            ContentPart::ToolUse { id, name, input } => ContentBlock::ToolUse {
                id: id.clone(),
                name: name.clone(),
                input: input.clone(),
            },
            ContentPart::ToolResult {
                tool_use_id,
                content,
                is_error,
            } => ContentBlock::ToolResult {
                tool_use_id: tool_use_id.clone(),
                content: content.clone(),
                is_error: is_error.then_some(true),
            },
        })
        .collect()
}

// ============================================================================
// Anthropic API Types
// ============================================================================

#[derive(Debug, Serialize)]
struct AnthropicRequest {
    model: String,
    max_tokens: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    system: Option<String>,
    messages: Vec<AnthropicMessage>,
    tools: Vec<AnthropicTool>,
}

#[derive(Debug, Serialize)]
struct AnthropicMessage {
    role: String,
    content: Vec<ContentBlock>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(tag = "type")]
enum ContentBlock {
    #[serde(rename = "text")]
    Text { text: String },
    #[serde(rename = "tool_use")]
    ToolUse {
        id: String,
        name: String,
        input: serde_json::Value,
    },
    #[serde(rename = "tool_result")]
    ToolResult {
        tool_use_id: String,
        content: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        is_error: Option<bool>,
    },
    /// thinking 등 이 provider가 쓰지 않는 block
    #[serde(other, skip_serializing)]
    Other,
}

#[derive(Debug, Serialize)]
struct AnthropicTool {
    name: String,
    description: String,
    input_schema: serde_json::Value,
}

impl From<&ToolDef> for AnthropicTool {
    fn from(tool: &ToolDef) -> Self {
        AnthropicTool {
            name: tool.name.clone(),
            description: tool.description.clone(),
            input_schema: tool.to_json_schema(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct AnthropicResponse {
    content: Vec<ContentBlock>,
    stop_reason: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use semiform_foundation::{Phase, ProviderType};
    use serde_json::json;

    fn provider() -> AnthropicProvider {
        AnthropicProvider::new(
            &ProviderSettings::new(ProviderType::Anthropic)
                .api_key("test")
                .model("claude-3-5-sonnet-20241022"),
        )
    }

    fn parse(value: serde_json::Value) -> ModelResponse {
        map_response(serde_json::from_value(value).unwrap())
    }

    #[test]
    fn test_build_request_merges_tool_results() {
        let provider = provider();
        let call = ToolCall::new("toolu_1", "create_full_project", json!({"files": []}));
        let call2 = ToolCall::new("toolu_2", "create_full_project", json!({"files": []}));
        let conv = Conversation::with_messages(
            Phase::Backend,
            vec![
                Message::user("Generate the backend service"),
                Message::assistant("I will first generate the backend service for you."),
                Message::user("{}"),
                Message::assistant_with_tools("", &[call, call2]),
                Message::tool_result("toolu_1", "ok", false),
                Message::tool_result("toolu_2", "bad", true),
            ],
        );

        let request = provider.build_request("be helpful", &conv);
        let value = serde_json::to_value(&request).unwrap();

        assert_eq!(value["system"], "be helpful");
        assert_eq!(value["max_tokens"], 8192);
        assert_eq!(value["tools"][0]["name"], "create_full_project");

        let messages = value["messages"].as_array().unwrap();
        assert_eq!(messages.len(), 5);
        let last = &messages[4];
        assert_eq!(last["role"], "user");
        assert_eq!(last["content"].as_array().unwrap().len(), 2);
        assert_eq!(last["content"][1]["is_error"], true);
        assert!(last["content"][0].get("is_error").is_none());
    }

    #[test]
    fn test_map_tool_use() {
        let response = parse(json!({
            "content": [
                {"type": "text", "text": "Creating files"},
                {"type": "tool_use", "id": "toolu_1", "name": "create_full_project",
                 "input": {"files": [{"folder": "backend", "filename": "a.ts", "content": "x"}]}}
            ],
            "stop_reason": "tool_use"
        }));

        match response {
            ModelResponse::ToolRequest { calls, text } => {
                assert_eq!(text, "Creating files");
                assert_eq!(calls.len(), 1);
                assert_eq!(calls[0].id, "toolu_1");
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_map_stop_reasons() {
        assert_eq!(
            parse(json!({"content": [{"type": "text", "text": "done"}], "stop_reason": "end_turn"})),
            ModelResponse::Completed("done".to_string())
        );
        assert_eq!(
            parse(json!({"content": [], "stop_reason": "max_tokens"})),
            ModelResponse::TruncatedByTokenLimit
        );
        assert!(matches!(
            parse(json!({"content": [{"type": "thinking", "thinking": "hmm"}], "stop_reason": "refusal"})),
            ModelResponse::Failed(_)
        ));
    }

    #[tokio::test]
    async fn test_missing_key_fails_call() {
        let provider = AnthropicProvider {
            api_key: None,
            ..provider()
        };
        assert!(!provider.is_available());
        let conv = Conversation::with_messages(Phase::Backend, vec![Message::user("{}")]);
        let result = provider.invoke("", &conv).await;
        assert!(matches!(result, Err(ProviderError::NotConfigured(_))));
    }
}
