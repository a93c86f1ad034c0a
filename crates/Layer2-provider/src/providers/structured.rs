//! Structured-output call shape 공용 로직
//!
//! 한 번의 호출이 파일 목록 전체를 돌려주므로, 그 원문을 합성 tool call 하나로 감싸
//! tool loop에 넘깁니다. 다음 호출(로그가 그 tool result로 끝남)은 네트워크 없이 완료됩니다.

use crate::r#trait::ModelResponse;
use crate::{Conversation, MessageRole, ToolCall};
use serde_json::Value;
use uuid::Uuid;

/// 합성 tool call id prefix
const SYNTHETIC_ID_PREFIX: &str = "structured_";

/// 이미 합성 call이 처리된 대화라면 즉시 완료 응답
pub(crate) fn already_answered(conversation: &Conversation) -> Option<ModelResponse> {
    if !conversation.ends_with_tool_results() {
        return None;
    }
    let summary = conversation
        .trailing_tool_results()
        .iter()
        .map(|r| r.content)
        .collect::<Vec<_>>()
        .join("\n");
    Some(ModelResponse::Completed(summary))
}

/// 모델 원문을 `tool_name` 호출 하나로 감쌈
pub(crate) fn synthesize_tool_request(tool_name: &str, raw: String) -> ModelResponse {
    ModelResponse::ToolRequest {
        calls: vec![ToolCall::new(
            format!("{}{}", SYNTHETIC_ID_PREFIX, Uuid::new_v4()),
            tool_name,
            Value::String(raw),
        )],
        text: String::new(),
    }
}

/// (role, text) 목록: system 지시문이 맨 앞, 그 뒤로 text part만
pub(crate) fn flatten(instructions: &str, conversation: &Conversation) -> Vec<(&'static str, String)> {
    let mut out = Vec::with_capacity(conversation.len() + 1);
    if !instructions.is_empty() {
        out.push((MessageRole::System.as_str(), instructions.to_string()));
    }
    for msg in conversation.messages() {
        let text = msg.text();
        if text.is_empty() {
            continue;
        }
        out.push((msg.role.as_str(), text));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Message;
    use semiform_foundation::Phase;

    #[test]
    fn test_synthesized_call_carries_raw_text() {
        let response = synthesize_tool_request("create_files", "{\"files\":[]}".to_string());
        match response {
            ModelResponse::ToolRequest { calls, .. } => {
                assert_eq!(calls.len(), 1);
                assert!(calls[0].id.starts_with("structured_"));
                assert_eq!(calls[0].input, Value::String("{\"files\":[]}".to_string()));
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_already_answered_only_after_tool_results() {
        let mut conv = Conversation::with_messages(Phase::Frontend, vec![Message::user("{}")]);
        assert!(already_answered(&conv).is_none());

        let call = ToolCall::new("structured_1", "create_files", Value::Null);
        conv.push(Message::assistant_with_tools("", &[call]));
        conv.push(Message::tool_result("structured_1", "Created 2 files", false));
        assert_eq!(
            already_answered(&conv),
            Some(ModelResponse::Completed("Created 2 files".to_string()))
        );
    }

    #[test]
    fn test_flatten_puts_instructions_first() {
        let conv = Conversation::with_messages(
            Phase::Backend,
            vec![Message::user("Generate the backend service"), Message::user("{}")],
        );
        let flat = flatten("system text", &conv);
        assert_eq!(flat.len(), 3);
        assert_eq!(flat[0], ("system", "system text".to_string()));
        assert_eq!(flat[2].0, "user");
    }
}
