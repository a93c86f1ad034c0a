//! Message types for LLM communication
//!
//! `Conversation`은 한 phase 동안의 append-only 메시지 로그입니다.
//! phase가 바뀌면 새 값을 만들고, phase 간 정보는 명시적으로 넘깁니다.

use semiform_foundation::Phase;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

/// Role of a message in the conversation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    System,
    User,
    Assistant,
}

impl MessageRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            MessageRole::System => "system",
            MessageRole::User => "user",
            MessageRole::Assistant => "assistant",
        }
    }
}

/// 메시지를 구성하는 part (순서가 의미를 가짐)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ContentPart {
    Text {
        text: String,
    },
    ToolUse {
        id: String,
        name: String,
        input: Value,
    },
    ToolResult {
        tool_use_id: String,
        content: String,
        is_error: bool,
    },
}

/// A message in the conversation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    pub id: Uuid,
    pub role: MessageRole,
    pub content: Vec<ContentPart>,
}

impl Message {
    fn with_parts(role: MessageRole, content: Vec<ContentPart>) -> Self {
        Self {
            id: Uuid::new_v4(),
            role,
            content,
        }
    }

    pub fn system(text: impl Into<String>) -> Self {
        Self::with_parts(MessageRole::System, vec![ContentPart::Text { text: text.into() }])
    }

    pub fn user(text: impl Into<String>) -> Self {
        Self::with_parts(MessageRole::User, vec![ContentPart::Text { text: text.into() }])
    }

    pub fn assistant(text: impl Into<String>) -> Self {
        Self::with_parts(
            MessageRole::Assistant,
            vec![ContentPart::Text { text: text.into() }],
        )
    }

    /// Assistant message carrying tool calls; empty text is omitted
    pub fn assistant_with_tools(text: impl Into<String>, calls: &[ToolCall]) -> Self {
        let text = text.into();
        let mut parts = Vec::with_capacity(calls.len() + 1);
        if !text.is_empty() {
            parts.push(ContentPart::Text { text });
        }
        parts.extend(calls.iter().map(|c| ContentPart::ToolUse {
            id: c.id.clone(),
            name: c.name.clone(),
            input: c.input.clone(),
        }));
        Self::with_parts(MessageRole::Assistant, parts)
    }

    /// Tool result는 user role로 전달 (Anthropic 규약)
    pub fn tool_result(
        tool_use_id: impl Into<String>,
        content: impl Into<String>,
        is_error: bool,
    ) -> Self {
        Self::with_parts(
            MessageRole::User,
            vec![ContentPart::ToolResult {
                tool_use_id: tool_use_id.into(),
                content: content.into(),
                is_error,
            }],
        )
    }

    /// Text parts joined with newlines
    pub fn text(&self) -> String {
        self.content
            .iter()
            .filter_map(|p| match p {
                ContentPart::Text { text } => Some(text.as_str()),
                _ => None,
            })
            .collect::<Vec<_>>()
            .join("\n")
    }

    pub fn tool_calls(&self) -> impl Iterator<Item = ToolCall> + '_ {
        self.content.iter().filter_map(|p| match p {
            ContentPart::ToolUse { id, name, input } => Some(ToolCall::new(id, name, input.clone())),
            _ => None,
        })
    }

    pub fn tool_results(&self) -> impl Iterator<Item = ToolResult<'_>> {
        self.content.iter().filter_map(|p| match p {
            ContentPart::ToolResult {
                tool_use_id,
                content,
                is_error,
            } => Some(ToolResult {
                tool_use_id,
                content,
                is_error: *is_error,
            }),
            _ => None,
        })
    }

    pub fn has_tool_results(&self) -> bool {
        self.tool_results().next().is_some()
    }
}

/// A tool call requested by the model
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolCall {
    pub id: String,
    pub name: String,
    pub input: Value,
}

impl ToolCall {
    pub fn new(id: impl Into<String>, name: impl Into<String>, input: Value) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            input,
        }
    }
}

/// Borrowed view of a tool_result part
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ToolResult<'a> {
    pub tool_use_id: &'a str,
    pub content: &'a str,
    pub is_error: bool,
}

/// 한 phase의 대화 로그
#[derive(Debug, Clone)]
pub struct Conversation {
    phase: Phase,
    messages: Vec<Message>,
}

impl Conversation {
    pub fn new(phase: Phase) -> Self {
        Self {
            phase,
            messages: Vec::new(),
        }
    }

    pub fn with_messages(phase: Phase, messages: impl IntoIterator<Item = Message>) -> Self {
        Self {
            phase,
            messages: messages.into_iter().collect(),
        }
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn push(&mut self, message: Message) {
        self.messages.push(message);
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    pub fn last(&self) -> Option<&Message> {
        self.messages.last()
    }

    /// 마지막 메시지가 tool result를 담고 있는지
    pub fn ends_with_tool_results(&self) -> bool {
        self.last().is_some_and(Message::has_tool_results)
    }

    /// 마지막 assistant 메시지 이후의 tool result들 (순서 유지)
    pub fn trailing_tool_results(&self) -> Vec<ToolResult<'_>> {
        let start = self
            .messages
            .iter()
            .rposition(|m| m.role == MessageRole::Assistant)
            .map(|i| i + 1)
            .unwrap_or(0);
        self.messages[start..]
            .iter()
            .flat_map(Message::tool_results)
            .collect()
    }

    /// 마지막 assistant 메시지의 tool call 중 아직 result가 없는 것
    pub fn unanswered_tool_calls(&self) -> Vec<ToolCall> {
        let Some(idx) = self
            .messages
            .iter()
            .rposition(|m| m.role == MessageRole::Assistant)
        else {
            return Vec::new();
        };
        let answered: Vec<&str> = self.messages[idx + 1..]
            .iter()
            .flat_map(Message::tool_results)
            .map(|r| r.tool_use_id)
            .collect();
        self.messages[idx]
            .tool_calls()
            .filter(|c| !answered.contains(&c.id.as_str()))
            .collect()
    }
}
