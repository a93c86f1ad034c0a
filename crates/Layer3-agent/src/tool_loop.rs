//! Tool-call execution loop
//!
//! AWAITING_MODEL → EXECUTING_TOOLS → AWAITING_MODEL → … → TERMINAL
//!
//! 모델이 요청한 tool call을 순서대로 실행하고, 각 call마다 tool result 하나를 로그에 붙인 뒤
//! 같은 지시문으로 다시 호출합니다. 완료/토큰 한도/실패에서만 끝납니다.

use crate::event::{EventSink, GenerationEvent};
use semiform_foundation::Phase;
use semiform_provider::{Conversation, Message, ModelResponse, Provider, ToolCall};
use semiform_tool::{parse_file_list, Materializer};
use std::fmt;
use tracing::{debug, error, info, warn};

/// 기본 round 상한
pub const DEFAULT_MAX_ROUNDS: usize = 64;

/// Phase 종료 상태
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Termination {
    Completed,
    /// 출력 토큰 한도 (soft stop)
    Truncated,
    Failed(String),
}

impl Termination {
    pub fn is_failure(&self) -> bool {
        matches!(self, Termination::Failed(_))
    }
}

impl fmt::Display for Termination {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Termination::Completed => write!(f, "completed"),
            Termination::Truncated => write!(f, "truncated by token limit"),
            Termination::Failed(reason) => write!(f, "failed: {}", reason),
        }
    }
}

/// Loop 결과
#[derive(Debug)]
pub struct LoopOutcome {
    /// 기록된 상대 경로 (round 순서)
    pub files: Vec<String>,
    pub termination: Termination,
    /// 실행한 tool round 수
    pub rounds: usize,
    /// 최종 대화 로그
    pub conversation: Conversation,
}

/// call 하나를 처리한 결과
struct CallOutcome {
    written: Vec<String>,
    skipped: usize,
}

impl CallOutcome {
    fn summary(&self) -> String {
        let mut text = if self.written.is_empty() {
            "No files were created".to_string()
        } else {
            format!(
                "Created {} file(s): {}",
                self.written.len(),
                self.written.join(", ")
            )
        };
        if self.skipped > 0 {
            text.push_str(&format!("; {} file(s) could not be written", self.skipped));
        }
        text
    }
}

/// 한 phase의 tool loop
pub struct ToolLoop<'a> {
    provider: &'a dyn Provider,
    materializer: &'a Materializer,
    max_rounds: usize,
    events: EventSink,
}

impl<'a> ToolLoop<'a> {
    pub fn new(provider: &'a dyn Provider, materializer: &'a Materializer) -> Self {
        Self {
            provider,
            materializer,
            max_rounds: DEFAULT_MAX_ROUNDS,
            events: EventSink::default(),
        }
    }

    pub fn with_max_rounds(mut self, max_rounds: usize) -> Self {
        self.max_rounds = max_rounds;
        self
    }

    pub(crate) fn with_events(mut self, events: EventSink) -> Self {
        self.events = events;
        self
    }

    /// 대화 로그를 소유하고 terminal 상태까지 진행
    pub async fn run(&self, instructions: &str, mut conversation: Conversation) -> LoopOutcome {
        let phase = conversation.phase();
        let mut files = Vec::new();
        let mut rounds = 0;

        let termination = loop {
            let response = match self.provider.invoke(instructions, &conversation).await {
                Ok(response) => response,
                Err(e) => {
                    error!("{} phase: provider call failed: {}", phase, e);
                    break Termination::Failed(e.to_string());
                }
            };
            debug!("{} phase: model responded with {}", phase, response.kind());

            let (calls, text) = match response {
                ModelResponse::ToolRequest { calls, text } => (calls, text),
                ModelResponse::Completed(text) => {
                    self.log_text(phase, &text).await;
                    break Termination::Completed;
                }
                ModelResponse::TruncatedByTokenLimit => {
                    warn!("{} phase stopped at the output token limit", phase);
                    break Termination::Truncated;
                }
                ModelResponse::Failed(reason) => {
                    error!("{} phase: provider reported failure: {}", phase, reason);
                    break Termination::Failed(reason);
                }
            };

            if rounds >= self.max_rounds {
                error!("{} phase: exceeded {} tool rounds", phase, self.max_rounds);
                break Termination::Failed(format!(
                    "exceeded the limit of {} tool rounds",
                    self.max_rounds
                ));
            }
            rounds += 1;

            self.log_text(phase, &text).await;
            conversation.push(Message::assistant_with_tools(text, &calls));

            if calls.is_empty() {
                break Termination::Failed("tool request carried no tool calls".to_string());
            }

            let mut valid = 0;
            for call in &calls {
                let (content, is_error) = match self.execute(phase, call).await {
                    Ok(outcome) => {
                        valid += 1;
                        let summary = outcome.summary();
                        files.extend(outcome.written);
                        (summary, false)
                    }
                    Err(reason) => {
                        error!("{} phase: rejected tool call {}: {}", phase, call.id, reason);
                        self.events
                            .emit(GenerationEvent::ToolCallRejected {
                                phase,
                                tool_call_id: call.id.clone(),
                                reason: reason.clone(),
                            })
                            .await;
                        (reason, true)
                    }
                };
                conversation.push(Message::tool_result(&call.id, content, is_error));
            }

            if valid == 0 {
                break Termination::Failed(format!(
                    "every tool call in round {} was invalid",
                    rounds
                ));
            }
        };

        LoopOutcome {
            files,
            termination,
            rounds,
            conversation,
        }
    }

    /// 이름 검증 → payload 파싱 → 파일 기록
    async fn execute(&self, phase: Phase, call: &ToolCall) -> Result<CallOutcome, String> {
        let expected = &self.provider.create_files_tool().name;
        if &call.name != expected {
            return Err(format!(
                "unknown tool '{}', expected '{}'",
                call.name, expected
            ));
        }

        let files = parse_file_list(call.input.clone()).map_err(|e| e.to_string())?;
        if files.is_empty() {
            warn!("{} phase: tool call {} contained no files", phase, call.id);
        }

        let mut outcome = CallOutcome {
            written: Vec::with_capacity(files.len()),
            skipped: 0,
        };
        for file in &files {
            match self.materializer.write(file).await {
                Ok(path) => {
                    self.events
                        .emit(GenerationEvent::FileWritten {
                            phase,
                            path: path.clone(),
                        })
                        .await;
                    outcome.written.push(path);
                }
                Err(e) => {
                    error!("Failed to write {}: {}", file.relative_path(), e);
                    self.events
                        .emit(GenerationEvent::FileSkipped {
                            phase,
                            path: file.relative_path(),
                            reason: e.to_string(),
                        })
                        .await;
                    outcome.skipped += 1;
                }
            }
        }
        Ok(outcome)
    }

    async fn log_text(&self, phase: Phase, text: &str) {
        if text.trim().is_empty() {
            return;
        }
        info!("{} phase model: {}", phase, text);
        self.events
            .emit(GenerationEvent::ModelText {
                phase,
                text: text.to_string(),
            })
            .await;
    }
}
