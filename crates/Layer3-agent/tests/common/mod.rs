//! Scripted provider - 미리 정한 응답을 순서대로 돌려주는 테스트용 provider

#![allow(dead_code)]

use async_trait::async_trait;
use semiform_foundation::{Phase, ProviderType};
use semiform_provider::{
    Conversation, Message, ModelResponse, Provider, ProviderError, ProviderMetadata, ToolCall,
    ToolDef,
};
use serde_json::{json, Value};
use std::collections::VecDeque;
use std::sync::Mutex;

/// provider가 받은 호출 하나
#[derive(Debug, Clone)]
pub struct Invocation {
    pub instructions: String,
    pub phase: Phase,
    pub messages: Vec<Message>,
}

pub struct ScriptedProvider {
    metadata: ProviderMetadata,
    tool: ToolDef,
    script: Mutex<VecDeque<Result<ModelResponse, ProviderError>>>,
    calls: Mutex<Vec<Invocation>>,
}

impl ScriptedProvider {
    pub fn new(script: impl IntoIterator<Item = ModelResponse>) -> Self {
        Self::with_results(script.into_iter().map(Ok))
    }

    pub fn with_results(
        script: impl IntoIterator<Item = Result<ModelResponse, ProviderError>>,
    ) -> Self {
        Self {
            metadata: ProviderMetadata {
                provider_type: ProviderType::Anthropic,
                model: "scripted".to_string(),
                max_tokens: 1024,
                base_url: "http://localhost".to_string(),
            },
            tool: ToolDef::create_full_project(),
            script: Mutex::new(script.into_iter().collect()),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn invocations(&self) -> Vec<Invocation> {
        self.calls.lock().unwrap().clone()
    }

    pub fn tool_name(&self) -> String {
        self.tool.name.clone()
    }
}

#[async_trait]
impl Provider for ScriptedProvider {
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
        self.calls.lock().unwrap().push(Invocation {
            instructions: instructions.to_string(),
            phase: conversation.phase(),
            messages: conversation.messages().to_vec(),
        });
        self.script
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Ok(ModelResponse::Failed("script exhausted".to_string())))
    }
}

/// `createFullProject` 형식의 files payload
pub fn files(entries: &[(&str, &str)]) -> Value {
    let files: Vec<Value> = entries
        .iter()
        .map(|(path, content)| json!({"filepath": path, "content": content}))
        .collect();
    json!({ "files": files })
}

pub fn tool_request(id: &str, name: &str, input: Value) -> ModelResponse {
    ModelResponse::ToolRequest {
        calls: vec![ToolCall::new(id, name, input)],
        text: String::new(),
    }
}

/// 올바른 tool 이름으로 파일 생성 요청
pub fn create(id: &str, entries: &[(&str, &str)]) -> ModelResponse {
    tool_request(id, semiform_provider::CREATE_FULL_PROJECT, files(entries))
}

pub fn completed() -> ModelResponse {
    ModelResponse::Completed("done".to_string())
}
