//! OpenAI Assistants provider (stateful thread/run)
//!
//! phase의 첫 호출에서 thread와 run을 만들고, 이후 호출은 대화 끝의 tool result를
//! 대기 중인 run에 제출한 뒤 다시 polling합니다.

use crate::{
    error::ProviderError,
    http::{build_client, ensure_success, read_json},
    providers::openai::parse_error_response,
    r#trait::{ModelResponse, Provider, ProviderMetadata},
    retry::{with_retry, RetryConfig},
    run::{poll_until_settled, RunStatus},
    Conversation, MessageRole, ToolCall, ToolDef,
};
use async_trait::async_trait;
use reqwest::{Client, RequestBuilder};
use semiform_foundation::{Phase, ProviderSettings, ENV_ASSISTANT_ID};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::time::Duration;
use tokio::sync::{Mutex, OnceCell};
use tracing::{debug, info, warn};

const ASSISTANT_NAME: &str = "Semiform Assistant";
const ASSISTANT_INSTRUCTIONS: &str = "You are a code generator. You generate complete, runnable \
source code from a well structured project schema and write every file with the createFile function.";

/// 진행 중인 thread/run
#[derive(Debug, Clone)]
struct AssistantSession {
    thread_id: String,
    run_id: String,
    phase: Phase,
}

/// OpenAI Assistants provider
pub struct AssistantProvider {
    client: Client,
    api_key: Option<String>,
    metadata: ProviderMetadata,
    tool: ToolDef,
    poll_interval: Duration,
    retry_config: RetryConfig,
    /// SEMIFORM_ASSISTANT_ID
    configured_assistant: Option<String>,
    assistant_id: OnceCell<String>,
    session: Mutex<Option<AssistantSession>>,
}

impl AssistantProvider {
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
            tool: ToolDef::create_file(),
            poll_interval: Duration::from_millis(settings.effective_poll_interval_ms()),
            retry_config: RetryConfig::default(),
            configured_assistant: std::env::var(ENV_ASSISTANT_ID)
                .ok()
                .filter(|id| !id.is_empty()),
            assistant_id: OnceCell::new(),
            session: Mutex::new(None),
        }
    }

    pub fn with_assistant_id(mut self, id: impl Into<String>) -> Self {
        self.configured_assistant = Some(id.into());
        self
    }

    pub fn with_retry_config(mut self, config: RetryConfig) -> Self {
        self.retry_config = config;
        self
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.metadata.base_url, path)
    }

    fn authed(&self, builder: RequestBuilder, api_key: &str) -> RequestBuilder {
        builder
            .bearer_auth(api_key)
            .header("OpenAI-Beta", "assistants=v2")
    }

    async fn send<T: for<'de> Deserialize<'de>>(
        &self,
        operation: &str,
        make: impl Fn() -> RequestBuilder,
    ) -> Result<T, ProviderError> {
        with_retry(&self.retry_config, operation, || async {
            let response = make().send().await.map_err(ProviderError::from_reqwest)?;
            let response = ensure_success(response, parse_error_response).await?;
            read_json::<T>(response).await
        })
        .await
    }

    /// 환경변수의 assistant를 쓰거나, 한 번만 새로 만듦
    async fn assistant_id(&self, api_key: &str) -> Result<&str, ProviderError> {
        let id = self
            .assistant_id
            .get_or_try_init(|| async {
                if let Some(id) = &self.configured_assistant {
                    debug!("reusing assistant {}", id);
                    return Ok(id.clone());
                }
                let body = json!({
                    "name": ASSISTANT_NAME,
                    "model": self.metadata.model,
                    "instructions": ASSISTANT_INSTRUCTIONS,
                    "tools": [function_tool(&self.tool)],
                });
                let created: IdObject = self
                    .send("assistant_create", || {
                        self.authed(self.client.post(self.url("assistants")), api_key)
                            .json(&body)
                    })
                    .await?;
                info!("Created assistant {}", created.id);
                Ok::<_, ProviderError>(created.id)
            })
            .await?;
        Ok(id.as_str())
    }

    async fn start_run(
        &self,
        api_key: &str,
        instructions: &str,
        conversation: &Conversation,
    ) -> Result<AssistantSession, ProviderError> {
        let assistant_id = self.assistant_id(api_key).await?.to_string();

        let body = json!({ "messages": thread_messages(conversation) });
        let thread: IdObject = self
            .send("thread_create", || {
                self.authed(self.client.post(self.url("threads")), api_key)
                    .json(&body)
            })
            .await?;

        let body = json!({
            "assistant_id": assistant_id,
            "model": self.metadata.model,
            "instructions": instructions,
            "max_completion_tokens": self.metadata.max_tokens,
        });
        let run: RunObject = self
            .send("run_create", || {
                self.authed(
                    self.client
                        .post(self.url(&format!("threads/{}/runs", thread.id))),
                    api_key,
                )
                .json(&body)
            })
            .await?;

        debug!("started run {} on thread {}", run.id, thread.id);
        Ok(AssistantSession {
            thread_id: thread.id,
            run_id: run.id,
            phase: conversation.phase(),
        })
    }

    async fn submit_tool_outputs(
        &self,
        api_key: &str,
        session: &AssistantSession,
        conversation: &Conversation,
    ) -> Result<(), ProviderError> {
        let outputs: Vec<ToolOutput> = conversation
            .trailing_tool_results()
            .into_iter()
            .map(|r| ToolOutput {
                tool_call_id: r.tool_use_id.to_string(),
                output: r.content.to_string(),
            })
            .collect();

        debug!("submitting {} tool outputs to run {}", outputs.len(), session.run_id);
        let body = json!({ "tool_outputs": outputs });
        let _: RunObject = self
            .send("run_submit_tool_outputs", || {
                self.authed(
                    self.client.post(self.url(&format!(
                        "threads/{}/runs/{}/submit_tool_outputs",
                        session.thread_id, session.run_id
                    ))),
                    api_key,
                )
                .json(&body)
            })
            .await?;
        Ok(())
    }

    async fn wait_for_run(
        &self,
        api_key: &str,
        session: &AssistantSession,
    ) -> Result<RunObject, ProviderError> {
        let url = self.url(&format!(
            "threads/{}/runs/{}",
            session.thread_id, session.run_id
        ));
        poll_until_settled(
            self.poll_interval,
            || self.retrieve_run(api_key, &url),
            |run| &run.status,
        )
        .await
    }

    async fn retrieve_run(&self, api_key: &str, url: &str) -> Result<RunObject, ProviderError> {
        self.send("run_retrieve", || self.authed(self.client.get(url), api_key))
            .await
    }

    async fn latest_reply(&self, api_key: &str, thread_id: &str) -> Result<String, ProviderError> {
        let list: MessageList = self
            .send("thread_messages", || {
                self.authed(
                    self.client
                        .get(self.url(&format!("threads/{}/messages", thread_id)))
                        .query(&[("order", "desc"), ("limit", "20")]),
                    api_key,
                )
            })
            .await?;
        Ok(list.latest_assistant_text().unwrap_or_default())
    }
}

#[async_trait]
impl Provider for AssistantProvider {
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
            ProviderError::NotConfigured("OPENAI_API_KEY is not set".to_string())
        })?;

        let mut guard = self.session.lock().await;

        let session = match guard.take() {
            Some(session)
                if session.phase == conversation.phase()
                    && conversation.ends_with_tool_results() =>
            {
                self.submit_tool_outputs(api_key, &session, conversation)
                    .await?;
                session
            }
            stale => {
                if conversation.ends_with_tool_results() {
                    return Err(ProviderError::Protocol(
                        "tool results submitted without a pending run".to_string(),
                    ));
                }
                if let Some(old) = stale {
                    warn!("abandoning run {} from the {} phase", old.run_id, old.phase);
                }
                self.start_run(api_key, instructions, conversation).await?
            }
        };

        let run = self.wait_for_run(api_key, &session).await?;
        let response = map_settled(run);

        match response {
            ModelResponse::ToolRequest { .. } => {
                *guard = Some(session);
                Ok(response)
            }
            ModelResponse::Completed(_) => {
                // 마지막 텍스트는 로그용이므로 조회 실패가 완료 상태를 바꾸지 않음
                let reply = self
                    .latest_reply(api_key, &session.thread_id)
                    .await
                    .unwrap_or_else(|e| {
                        warn!("run {} completed but its reply could not be read: {}", session.run_id, e);
                        String::new()
                    });
                Ok(ModelResponse::Completed(reply))
            }
            other => Ok(other),
        }
    }
}

/// settle된 run → ModelResponse (Completed의 text는 호출자가 채움)
fn map_settled(run: RunObject) -> ModelResponse {
    match run.status {
        RunStatus::RequiresAction => {
            let calls: Vec<ToolCall> = run
                .required_action
                .map(|a| a.submit_tool_outputs.tool_calls)
                .unwrap_or_default()
                .into_iter()
                .map(|c| {
                    let input = serde_json::from_str(&c.function.arguments)
                        .unwrap_or(Value::String(c.function.arguments));
                    ToolCall::new(c.id, c.function.name, input)
                })
                .collect();
            if calls.is_empty() {
                ModelResponse::Failed("run requires action but carries no tool calls".to_string())
            } else {
                ModelResponse::ToolRequest {
                    calls,
                    text: String::new(),
                }
            }
        }
        RunStatus::Completed => ModelResponse::Completed(String::new()),
        RunStatus::Incomplete => ModelResponse::TruncatedByTokenLimit,
        status => {
            let detail = run
                .last_error
                .map(|e| format!(": {}", e.message))
                .unwrap_or_default();
            ModelResponse::Failed(format!("run ended with status {}{}", status, detail))
        }
    }
}

fn thread_messages(conversation: &Conversation) -> Vec<Value> {
    conversation
        .messages()
        .iter()
        .filter(|m| m.role != MessageRole::System)
        .filter_map(|m| {
            let text = m.text();
            (!text.is_empty()).then(|| json!({ "role": m.role.as_str(), "content": text }))
        })
        .collect()
}

fn function_tool(tool: &ToolDef) -> Value {
    json!({
        "type": "function",
        "function": {
            "name": tool.name,
            "description": tool.description,
            "parameters": tool.to_json_schema(),
        }
    })
}

// ============================================================================
// Assistants API Types
// ============================================================================

#[derive(Debug, Deserialize)]
struct IdObject {
    id: String,
}

#[derive(Debug, Deserialize)]
struct RunObject {
    id: String,
    status: RunStatus,
    #[serde(default)]
    required_action: Option<RequiredAction>,
    #[serde(default)]
    last_error: Option<RunError>,
}

#[derive(Debug, Deserialize)]
struct RequiredAction {
    submit_tool_outputs: SubmitToolOutputs,
}

#[derive(Debug, Deserialize)]
struct SubmitToolOutputs {
    tool_calls: Vec<RunToolCall>,
}

#[derive(Debug, Deserialize)]
struct RunToolCall {
    id: String,
    function: RunFunction,
}

#[derive(Debug, Deserialize)]
struct RunFunction {
    name: String,
    arguments: String,
}

#[derive(Debug, Deserialize)]
struct RunError {
    message: String,
}

#[derive(Debug, Serialize)]
struct ToolOutput {
    tool_call_id: String,
    output: String,
}

#[derive(Debug, Deserialize)]
struct MessageList {
    data: Vec<ThreadMessage>,
}

impl MessageList {
    /// order=desc이므로 첫 assistant 메시지가 최신
    fn latest_assistant_text(&self) -> Option<String> {
        let message = self.data.iter().find(|m| m.role == "assistant")?;
        let text = message
            .content
            .iter()
            .filter_map(|c| c.text.as_ref().map(|t| t.value.as_str()))
            .collect::<Vec<_>>()
            .join("\n");
        Some(text)
    }
}

#[derive(Debug, Deserialize)]
struct ThreadMessage {
    role: String,
    #[serde(default)]
    content: Vec<MessageContent>,
}

#[derive(Debug, Deserialize)]
struct MessageContent {
    #[serde(default)]
    text: Option<TextValue>,
}

#[derive(Debug, Deserialize)]
struct TextValue {
    value: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stub_server::{StubRequest, StubServer};
    use crate::Message;
    use semiform_foundation::ProviderType;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use std::sync::Arc;

    fn stub_provider(server: &StubServer) -> AssistantProvider {
        AssistantProvider::new(
            &ProviderSettings::new(ProviderType::OpenaiAssistant)
                .api_key("sk-test")
                .base_url(server.base_url())
                .poll_interval(5),
        )
        .with_assistant_id("asst_123")
        .with_retry_config(RetryConfig::no_retry())
    }

    fn backend_seed() -> Conversation {
        Conversation::with_messages(Phase::Backend, vec![Message::user("{}")])
    }

    fn requires_action(run_id: &str, call_id: &str) -> Value {
        json!({
            "id": run_id,
            "status": "requires_action",
            "required_action": {"submit_tool_outputs": {"tool_calls": [{
                "id": call_id,
                "function": {
                    "name": "createFile",
                    "arguments": "{\"folder\":\"backend\",\"filename\":\"index.ts\",\"content\":\"x\"}"
                }
            }]}}
        })
    }

    fn reply(text: &str) -> Value {
        json!({"data": [{"role": "assistant", "content": [{"type": "text", "text": {"value": text}}]}]})
    }

    fn run(value: Value) -> RunObject {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn test_requires_action_maps_to_tool_request() {
        let response = map_settled(run(json!({
            "id": "run_1",
            "status": "requires_action",
            "required_action": {
                "type": "submit_tool_outputs",
                "submit_tool_outputs": {
                    "tool_calls": [{
                        "id": "call_1",
                        "type": "function",
                        "function": {
                            "name": "createFile",
                            "arguments": "{\"folder\":\"backend\",\"filename\":\"index.ts\",\"content\":\"x\"}"
                        }
                    }]
                }
            }
        })));

        match response {
            ModelResponse::ToolRequest { calls, .. } => {
                assert_eq!(calls.len(), 1);
                assert_eq!(calls[0].id, "call_1");
                assert_eq!(calls[0].input["filename"], "index.ts");
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_terminal_statuses() {
        assert_eq!(
            map_settled(run(json!({"id": "r", "status": "incomplete"}))),
            ModelResponse::TruncatedByTokenLimit
        );
        assert_eq!(
            map_settled(run(json!({"id": "r", "status": "completed"}))),
            ModelResponse::Completed(String::new())
        );
        match map_settled(run(json!({
            "id": "r",
            "status": "failed",
            "last_error": {"code": "server_error", "message": "boom"}
        }))) {
            ModelResponse::Failed(reason) => assert!(reason.contains("boom")),
            other => panic!("unexpected {:?}", other),
        }
        assert!(matches!(
            map_settled(run(json!({"id": "r", "status": "paused"}))),
            ModelResponse::Failed(_)
        ));
    }

    #[test]
    fn test_unparseable_arguments_kept_as_text() {
        let response = map_settled(run(json!({
            "id": "run_1",
            "status": "requires_action",
            "required_action": {"submit_tool_outputs": {"tool_calls": [
                {"id": "call_1", "function": {"name": "createFile", "arguments": "not json"}}
            ]}}
        })));
        match response {
            ModelResponse::ToolRequest { calls, .. } => {
                assert_eq!(calls[0].input, Value::String("not json".to_string()))
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_latest_assistant_text() {
        let list: MessageList = serde_json::from_value(json!({
            "data": [
                {"role": "assistant", "content": [{"type": "text", "text": {"value": "All files created."}}]},
                {"role": "user", "content": [{"type": "text", "text": {"value": "schema"}}]}
            ]
        }))
        .unwrap();
        assert_eq!(list.latest_assistant_text().as_deref(), Some("All files created."));
    }

    #[test]
    fn test_thread_messages_skip_empty() {
        let conv = Conversation::with_messages(
            Phase::Backend,
            vec![
                Message::user("Generate the backend service"),
                Message::assistant("I will first generate the backend service for you."),
                Message::user("{}"),
            ],
        );
        let messages = thread_messages(&conv);
        assert_eq!(messages.len(), 3);
        assert_eq!(messages[1]["role"], "assistant");
    }

    #[tokio::test]
    async fn test_tool_results_without_run_is_protocol_error() {
        let provider = AssistantProvider::new(
            &ProviderSettings::new(ProviderType::OpenaiAssistant).api_key("sk-test"),
        )
        .with_assistant_id("asst_123");

        let call = ToolCall::new("call_1", "createFile", Value::Null);
        let conv = Conversation::with_messages(
            Phase::Backend,
            vec![
                Message::user("{}"),
                Message::assistant_with_tools("", &[call]),
                Message::tool_result("call_1", "Created backend/index.ts", false),
            ],
        );

        let result = provider.invoke("instructions", &conv).await;
        assert!(matches!(result, Err(ProviderError::Protocol(_))));
    }

    #[tokio::test]
    async fn test_tool_outputs_submitted_to_pending_run() {
        let submitted = Arc::new(AtomicBool::new(false));
        let flag = submitted.clone();
        let server = StubServer::start(move |req: &StubRequest| {
            match (req.method.as_str(), req.path.as_str()) {
                ("POST", "/threads") => (200, json!({"id": "t1"})),
                ("POST", "/threads/t1/runs") => (200, json!({"id": "r1", "status": "queued"})),
                ("POST", "/threads/t1/runs/r1/submit_tool_outputs") => {
                    flag.store(true, Ordering::SeqCst);
                    (200, json!({"id": "r1", "status": "queued"}))
                }
                ("GET", "/threads/t1/runs/r1") if flag.load(Ordering::SeqCst) => {
                    (200, json!({"id": "r1", "status": "completed"}))
                }
                ("GET", "/threads/t1/runs/r1") => (200, requires_action("r1", "call_1")),
                ("GET", "/threads/t1/messages") => (200, reply("All files created.")),
                _ => (404, json!({"error": {"message": "not found"}})),
            }
        })
        .await;
        let provider = stub_provider(&server);

        let mut conv = backend_seed();
        let first = provider.invoke("instructions", &conv).await.unwrap();
        let calls = match first {
            ModelResponse::ToolRequest { calls, .. } => calls,
            other => panic!("unexpected {:?}", other),
        };
        assert_eq!(calls[0].id, "call_1");

        conv.push(Message::assistant_with_tools("", &calls));
        conv.push(Message::tool_result("call_1", "Created backend/index.ts", false));
        let second = provider.invoke("instructions", &conv).await.unwrap();
        assert_eq!(
            second,
            ModelResponse::Completed("All files created.".to_string())
        );

        // 두 번째 호출은 새 thread 없이 같은 run에 제출
        assert_eq!(server.requests_to("POST", "/threads").len(), 1);
        let submits = server.requests_to("POST", "/threads/t1/runs/r1/submit_tool_outputs");
        assert_eq!(submits.len(), 1);
        let outputs = submits[0].body["tool_outputs"].as_array().unwrap();
        assert_eq!(outputs.len(), 1);
        assert_eq!(outputs[0]["tool_call_id"], "call_1");
        assert_eq!(outputs[0]["output"], "Created backend/index.ts");
    }

    #[tokio::test]
    async fn test_phase_change_starts_new_thread() {
        let threads = Arc::new(AtomicUsize::new(0));
        let counter = threads.clone();
        let server = StubServer::start(move |req: &StubRequest| {
            match (req.method.as_str(), req.path.as_str()) {
                ("POST", "/threads") => {
                    let n = counter.fetch_add(1, Ordering::SeqCst) + 1;
                    (200, json!({"id": format!("t{}", n)}))
                }
                ("POST", "/threads/t1/runs") => (200, json!({"id": "r1", "status": "queued"})),
                ("POST", "/threads/t2/runs") => (200, json!({"id": "r2", "status": "queued"})),
                ("GET", "/threads/t1/runs/r1") => (200, requires_action("r1", "call_1")),
                ("GET", "/threads/t2/runs/r2") => (200, json!({"id": "r2", "status": "completed"})),
                ("GET", "/threads/t2/messages") => (200, reply("Frontend done.")),
                _ => (404, json!({"error": {"message": "not found"}})),
            }
        })
        .await;
        let provider = stub_provider(&server);

        let backend = provider.invoke("backend", &backend_seed()).await.unwrap();
        assert!(matches!(backend, ModelResponse::ToolRequest { .. }));

        // backend run이 대기 중이어도 frontend 대화는 새 thread/run으로 시작
        let frontend = Conversation::with_messages(Phase::Frontend, vec![Message::user("{}")]);
        let response = provider.invoke("frontend", &frontend).await.unwrap();
        assert_eq!(response, ModelResponse::Completed("Frontend done.".to_string()));

        assert_eq!(threads.load(Ordering::SeqCst), 2);
        assert!(server
            .requests()
            .iter()
            .all(|r| !r.path.ends_with("submit_tool_outputs")));
        let run_create = server.requests_to("POST", "/threads/t2/runs");
        assert_eq!(run_create[0].body["instructions"], "frontend");
    }

    #[tokio::test]
    async fn test_completed_run_survives_reply_fetch_failure() {
        let server = StubServer::start(|req: &StubRequest| {
            match (req.method.as_str(), req.path.as_str()) {
                ("POST", "/threads") => (200, json!({"id": "t1"})),
                ("POST", "/threads/t1/runs") => (200, json!({"id": "r1", "status": "queued"})),
                ("GET", "/threads/t1/runs/r1") => (200, json!({"id": "r1", "status": "completed"})),
                ("GET", "/threads/t1/messages") => (
                    500,
                    json!({"error": {"message": "messages listing unavailable"}}),
                ),
                _ => (404, json!({"error": {"message": "not found"}})),
            }
        })
        .await;
        let provider = stub_provider(&server);

        let response = provider.invoke("instructions", &backend_seed()).await.unwrap();
        assert_eq!(response, ModelResponse::Completed(String::new()));
        assert_eq!(server.requests_to("GET", "/threads/t1/messages").len(), 1);
    }
}
