//! Tool loop 동작 테스트

mod common;

use common::{completed, create, files, tool_request, ScriptedProvider};
use semiform_agent::{Termination, ToolLoop};
use semiform_foundation::Phase;
use semiform_provider::{Conversation, Message, ModelResponse, ProviderError, ToolCall};
use semiform_tool::Materializer;
use serde_json::json;

fn seeded() -> Conversation {
    Conversation::with_messages(Phase::Backend, [Message::user("schema")])
}

#[tokio::test]
async fn test_two_rounds_then_completed() {
    let dir = tempfile::tempdir().unwrap();
    let materializer = Materializer::new(dir.path(), "app");
    let provider = ScriptedProvider::new([
        create("call_1", &[("backend/index.ts", "a"), ("backend/db.ts", "b")]),
        create("call_2", &[("NOTES.md", "routes")]),
        completed(),
    ]);

    let outcome = ToolLoop::new(&provider, &materializer)
        .run("build it", seeded())
        .await;

    assert_eq!(outcome.termination, Termination::Completed);
    assert_eq!(outcome.rounds, 2);
    assert_eq!(
        outcome.files,
        vec!["backend/index.ts", "backend/db.ts", "NOTES.md"]
    );
    assert!(dir.path().join("app/backend/db.ts").exists());

    // 같은 지시문으로 세 번 호출됨
    let invocations = provider.invocations();
    assert_eq!(invocations.len(), 3);
    assert!(invocations.iter().all(|i| i.instructions == "build it"));
    // seed 1 + (assistant + result) * 2
    assert_eq!(outcome.conversation.len(), 5);
}

#[tokio::test]
async fn test_every_tool_call_gets_a_result() {
    let dir = tempfile::tempdir().unwrap();
    let materializer = Materializer::new(dir.path(), "app");
    let provider = ScriptedProvider::new([
        ModelResponse::ToolRequest {
            calls: vec![
                ToolCall::new("a", provider_tool(), files(&[("x.txt", "1")])),
                ToolCall::new("b", provider_tool(), files(&[("y.txt", "2")])),
            ],
            text: "writing two batches".to_string(),
        },
        completed(),
    ]);

    let outcome = ToolLoop::new(&provider, &materializer)
        .run("go", seeded())
        .await;

    assert_eq!(outcome.termination, Termination::Completed);
    assert!(outcome.conversation.unanswered_tool_calls().is_empty());

    // 두 번째 호출 시점의 로그는 tool result로 끝나야 함
    let second = &provider.invocations()[1];
    let results: Vec<_> = second
        .messages
        .iter()
        .flat_map(|m| m.tool_results().map(|r| r.tool_use_id.to_string()).collect::<Vec<_>>())
        .collect();
    assert_eq!(results, vec!["a", "b"]);
    assert!(second.messages.last().unwrap().has_tool_results());
}

fn provider_tool() -> &'static str {
    semiform_provider::CREATE_FULL_PROJECT
}

#[tokio::test]
async fn test_tool_request_then_failure() {
    let dir = tempfile::tempdir().unwrap();
    let materializer = Materializer::new(dir.path(), "app");
    let provider = ScriptedProvider::new([
        create("call_1", &[("backend/index.ts", "a")]),
        ModelResponse::Failed("server overloaded".to_string()),
    ]);

    let outcome = ToolLoop::new(&provider, &materializer)
        .run("go", seeded())
        .await;

    assert_eq!(
        outcome.termination,
        Termination::Failed("server overloaded".to_string())
    );
    // 실패 전에 쓴 파일은 남음
    assert_eq!(outcome.files, vec!["backend/index.ts"]);
    assert!(dir.path().join("app/backend/index.ts").exists());
}

#[tokio::test]
async fn test_provider_error_fails_phase() {
    let dir = tempfile::tempdir().unwrap();
    let materializer = Materializer::new(dir.path(), "app");
    let provider = ScriptedProvider::with_results([Err(ProviderError::Authentication(
        "bad key".to_string(),
    ))]);

    let outcome = ToolLoop::new(&provider, &materializer)
        .run("go", seeded())
        .await;

    assert!(outcome.termination.is_failure());
    assert_eq!(outcome.rounds, 0);
    assert!(outcome.files.is_empty());
}

#[tokio::test]
async fn test_truncation_is_soft_stop() {
    let dir = tempfile::tempdir().unwrap();
    let materializer = Materializer::new(dir.path(), "app");
    let provider = ScriptedProvider::new([
        create("call_1", &[("a.txt", "a")]),
        ModelResponse::TruncatedByTokenLimit,
    ]);

    let outcome = ToolLoop::new(&provider, &materializer)
        .run("go", seeded())
        .await;

    assert_eq!(outcome.termination, Termination::Truncated);
    assert!(!outcome.termination.is_failure());
    assert_eq!(outcome.files, vec!["a.txt"]);
}

#[tokio::test]
async fn test_all_invalid_tool_calls_fail_phase() {
    let dir = tempfile::tempdir().unwrap();
    let materializer = Materializer::new(dir.path(), "app");
    let provider = ScriptedProvider::new([
        tool_request("call_1", "delete_everything", files(&[("a.txt", "a")])),
        completed(),
    ]);

    let outcome = ToolLoop::new(&provider, &materializer)
        .run("go", seeded())
        .await;

    assert!(outcome.termination.is_failure());
    assert!(outcome.files.is_empty());
    assert!(!dir.path().join("app/a.txt").exists());
    // 거부된 call에도 error result가 붙음
    let last = outcome.conversation.last().unwrap();
    let result = last.tool_results().next().unwrap();
    assert_eq!(result.tool_use_id, "call_1");
    assert!(result.is_error);
    assert_eq!(provider.invocations().len(), 1);
}

#[tokio::test]
async fn test_mixed_calls_keep_going() {
    let dir = tempfile::tempdir().unwrap();
    let materializer = Materializer::new(dir.path(), "app");
    let provider = ScriptedProvider::new([
        ModelResponse::ToolRequest {
            calls: vec![
                ToolCall::new("bad", "unknown_tool", json!({})),
                ToolCall::new("good", provider_tool(), files(&[("ok.txt", "fine")])),
                ToolCall::new("broken", provider_tool(), json!(42)),
            ],
            text: String::new(),
        },
        completed(),
    ]);

    let outcome = ToolLoop::new(&provider, &materializer)
        .run("go", seeded())
        .await;

    assert_eq!(outcome.termination, Termination::Completed);
    assert_eq!(outcome.files, vec!["ok.txt"]);

    let errors: Vec<(String, bool)> = outcome
        .conversation
        .messages()
        .iter()
        .flat_map(|m| {
            m.tool_results()
                .map(|r| (r.tool_use_id.to_string(), r.is_error))
                .collect::<Vec<_>>()
        })
        .collect();
    assert_eq!(
        errors,
        vec![
            ("bad".to_string(), true),
            ("good".to_string(), false),
            ("broken".to_string(), true)
        ]
    );
}

#[tokio::test]
async fn test_empty_file_list_is_not_fatal() {
    let dir = tempfile::tempdir().unwrap();
    let materializer = Materializer::new(dir.path(), "app");
    let provider = ScriptedProvider::new([create("call_1", &[]), completed()]);

    let outcome = ToolLoop::new(&provider, &materializer)
        .run("go", seeded())
        .await;

    assert_eq!(outcome.termination, Termination::Completed);
    assert_eq!(outcome.rounds, 1);
    assert!(outcome.files.is_empty());
}

#[tokio::test]
async fn test_unsafe_path_is_skipped() {
    let dir = tempfile::tempdir().unwrap();
    let materializer = Materializer::new(dir.path(), "app");
    let provider = ScriptedProvider::new([
        create("call_1", &[("../escape.txt", "x"), ("safe.txt", "y")]),
        completed(),
    ]);

    let outcome = ToolLoop::new(&provider, &materializer)
        .run("go", seeded())
        .await;

    assert_eq!(outcome.termination, Termination::Completed);
    assert_eq!(outcome.files, vec!["safe.txt"]);
    assert!(!dir.path().join("escape.txt").exists());
}

#[tokio::test]
async fn test_round_ceiling() {
    let dir = tempfile::tempdir().unwrap();
    let materializer = Materializer::new(dir.path(), "app");
    let provider = ScriptedProvider::new(
        (0..5).map(|i| create(&format!("call_{}", i), &[("loop.txt", "again")])),
    );

    let outcome = ToolLoop::new(&provider, &materializer)
        .with_max_rounds(3)
        .run("go", seeded())
        .await;

    assert!(outcome.termination.is_failure());
    assert_eq!(outcome.rounds, 3);
    assert_eq!(provider.invocations().len(), 4);
}
