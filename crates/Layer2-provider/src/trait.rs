//! Provider trait and common types
//!
//! 모든 provider는 `invoke(instructions, conversation)` 하나로 호출됩니다.
//! call shape(tool calling / structured / stateful run) 차이는 구현 안에서 흡수합니다.

use crate::error::ProviderError;
use crate::{Conversation, ToolCall, ToolDef};
use async_trait::async_trait;
use semiform_foundation::{CallShape, ProviderType};

/// Provider 한 번 호출의 결과
#[derive(Debug, Clone, PartialEq)]
pub enum ModelResponse {
    /// 모델이 tool 실행을 요청함 (text는 함께 온 설명문)
    ToolRequest { calls: Vec<ToolCall>, text: String },

    /// 정상 종료 (마지막 모델 텍스트)
    Completed(String),

    /// 출력 토큰 한도로 중단
    TruncatedByTokenLimit,

    /// Provider가 실패를 보고함
    Failed(String),
}

impl ModelResponse {
    pub fn kind(&self) -> &'static str {
        match self {
            ModelResponse::ToolRequest { .. } => "tool_request",
            ModelResponse::Completed(_) => "completed",
            ModelResponse::TruncatedByTokenLimit => "truncated",
            ModelResponse::Failed(_) => "failed",
        }
    }
}

/// Provider metadata
#[derive(Debug, Clone)]
pub struct ProviderMetadata {
    pub provider_type: ProviderType,

    /// 실제 요청에 쓰는 모델 ID
    pub model: String,

    pub max_tokens: u32,

    pub base_url: String,
}

impl ProviderMetadata {
    pub fn id(&self) -> &'static str {
        self.provider_type.id()
    }

    pub fn display_name(&self) -> &'static str {
        self.provider_type.name()
    }

    pub fn call_shape(&self) -> CallShape {
        self.provider_type.call_shape()
    }
}

/// LLM Provider trait
///
/// 구현체는 대화 로그를 수정하지 않습니다. 로그는 tool loop가 소유합니다.
#[async_trait]
pub trait Provider: Send + Sync {
    fn metadata(&self) -> &ProviderMetadata;

    /// 이 provider가 인식하는 유일한 "create files" tool
    fn create_files_tool(&self) -> &ToolDef;

    /// API 키 등 호출에 필요한 설정이 갖춰졌는지
    fn is_available(&self) -> bool;

    async fn invoke(
        &self,
        instructions: &str,
        conversation: &Conversation,
    ) -> Result<ModelResponse, ProviderError>;
}
