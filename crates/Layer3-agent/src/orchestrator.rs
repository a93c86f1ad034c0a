//! Phase orchestrator - backend → notes handoff → frontend

use crate::event::{EventSink, GenerationEvent};
use crate::prompts::{manifest_message, PhasePrompts, GENERATE_BACKEND, GENERATE_FRONTEND};
use crate::tool_loop::{Termination, ToolLoop, DEFAULT_MAX_ROUNDS};
use semiform_foundation::{Error, Phase, Result, NOTES_FILE};
use semiform_provider::{Conversation, Message, Provider};
use semiform_tool::Materializer;
use std::path::{Component, Path, PathBuf};
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{info, warn};

/// 생성 대상 위치
#[derive(Debug, Clone)]
pub struct GenerationContext {
    destination: PathBuf,
    project_name: String,
}

impl GenerationContext {
    /// project_name은 경로 구성요소 하나여야 함
    pub fn new(destination: impl Into<PathBuf>, project_name: impl Into<String>) -> Result<Self> {
        let project_name = project_name.into();
        let mut components = Path::new(&project_name).components();
        let single_normal = matches!(
            (components.next(), components.next()),
            (Some(Component::Normal(_)), None)
        );
        if !single_normal {
            return Err(Error::InvalidInput(format!(
                "project name must be a single directory name, got '{}'",
                project_name
            )));
        }
        Ok(Self {
            destination: destination.into(),
            project_name,
        })
    }

    pub fn destination(&self) -> &Path {
        &self.destination
    }

    pub fn project_name(&self) -> &str {
        &self.project_name
    }

    /// `<destination>/<project>`
    pub fn project_root(&self) -> PathBuf {
        self.destination.join(&self.project_name)
    }
}

/// Phase 하나의 결과
#[derive(Debug, Clone)]
pub struct PhaseReport {
    pub phase: Phase,
    pub files: Vec<String>,
    pub termination: Termination,
    pub rounds: usize,
}

/// 전체 생성 결과
#[derive(Debug, Clone)]
pub struct GenerationReport {
    pub backend: PhaseReport,
    /// backend가 실패하면 None
    pub frontend: Option<PhaseReport>,
    pub notes_found: bool,
}

impl GenerationReport {
    /// backend 다음 frontend 순서로 이어붙인 목록
    pub fn files_created(&self) -> Vec<String> {
        self.phases()
            .flat_map(|p| p.files.iter().cloned())
            .collect()
    }

    pub fn phases(&self) -> impl Iterator<Item = &PhaseReport> {
        std::iter::once(&self.backend).chain(self.frontend.as_ref())
    }

    /// 두 phase가 모두 실행되었고 실패가 없음
    pub fn is_success(&self) -> bool {
        self.frontend.is_some() && self.phases().all(|p| !p.termination.is_failure())
    }

    pub fn failure(&self) -> Option<(Phase, &str)> {
        self.phases().find_map(|p| match &p.termination {
            Termination::Failed(reason) => Some((p.phase, reason.as_str())),
            _ => None,
        })
    }
}

/// Backend/frontend 두 phase를 순서대로 실행
pub struct Orchestrator {
    provider: Arc<dyn Provider>,
    prompts: PhasePrompts,
    max_rounds: usize,
    events: EventSink,
}

impl Orchestrator {
    pub fn new(provider: Arc<dyn Provider>) -> Self {
        Self {
            provider,
            prompts: PhasePrompts::default(),
            max_rounds: DEFAULT_MAX_ROUNDS,
            events: EventSink::default(),
        }
    }

    pub fn with_prompts(mut self, prompts: PhasePrompts) -> Self {
        self.prompts = prompts;
        self
    }

    pub fn with_max_rounds(mut self, max_rounds: usize) -> Self {
        self.max_rounds = max_rounds;
        self
    }

    pub fn with_events(mut self, tx: mpsc::Sender<GenerationEvent>) -> Self {
        self.events = EventSink::new(Some(tx));
        self
    }

    pub fn backend_conversation(&self, schema: &str) -> Conversation {
        Conversation::with_messages(
            Phase::Backend,
            [
                Message::user(GENERATE_BACKEND),
                Message::assistant(&self.prompts.backend_ack),
                Message::user(schema),
            ],
        )
    }

    pub fn frontend_conversation(&self, backend_files: &[String], schema: &str) -> Conversation {
        Conversation::with_messages(
            Phase::Frontend,
            [
                Message::user(manifest_message(backend_files)),
                Message::user(GENERATE_FRONTEND),
                Message::assistant(&self.prompts.frontend_ack),
                Message::user(schema),
            ],
        )
    }

    /// 전체 생성 실행. 실패는 report에 담기며 에러로 반환되지 않음
    pub async fn generate(&self, ctx: &GenerationContext, schema: &str) -> GenerationReport {
        let materializer = Materializer::at(ctx.project_root());
        info!(
            "Generating {} into {}",
            ctx.project_name(),
            materializer.root().display()
        );

        let backend = self
            .run_phase(
                &materializer,
                &self.prompts.backend_instructions,
                self.backend_conversation(schema),
            )
            .await;

        if backend.termination.is_failure() {
            warn!("Skipping the frontend phase because the backend phase failed");
            return GenerationReport {
                backend,
                frontend: None,
                notes_found: false,
            };
        }

        // 이전 실행이 남긴 NOTES.md는 무시하고, 이번 backend가 쓴 경우에만 읽음
        let notes = if backend.files.iter().any(|f| f == NOTES_FILE) {
            materializer.read_notes().await
        } else {
            None
        };
        match &notes {
            Some(text) => {
                info!("Found backend notes ({} bytes)", text.len());
                self.events
                    .emit(GenerationEvent::NotesFound { bytes: text.len() })
                    .await;
            }
            None => {
                warn!(
                    "No notes found at {}, continuing without them",
                    materializer.notes_path().display()
                );
                self.events.emit(GenerationEvent::NotesMissing).await;
            }
        }

        let instructions = self.prompts.frontend_instructions_with(notes.as_deref());
        let frontend = self
            .run_phase(
                &materializer,
                &instructions,
                self.frontend_conversation(&backend.files, schema),
            )
            .await;

        GenerationReport {
            backend,
            frontend: Some(frontend),
            notes_found: notes.is_some(),
        }
    }

    async fn run_phase(
        &self,
        materializer: &Materializer,
        instructions: &str,
        conversation: Conversation,
    ) -> PhaseReport {
        let phase = conversation.phase();
        info!("Starting {} phase", phase);
        self.events
            .emit(GenerationEvent::PhaseStarted { phase })
            .await;

        let outcome = ToolLoop::new(self.provider.as_ref(), materializer)
            .with_max_rounds(self.max_rounds)
            .with_events(self.events.clone())
            .run(instructions, conversation)
            .await;

        match &outcome.termination {
            Termination::Completed => info!(
                "{} phase completed: {} files in {} rounds",
                phase,
                outcome.files.len(),
                outcome.rounds
            ),
            Termination::Truncated => warn!(
                "{} phase truncated by the token limit after {} files",
                phase,
                outcome.files.len()
            ),
            Termination::Failed(reason) => warn!(
                "{} phase failed after {} files: {}",
                phase,
                outcome.files.len(),
                reason
            ),
        }

        self.events
            .emit(GenerationEvent::PhaseFinished {
                phase,
                termination: outcome.termination.clone(),
                files: outcome.files.len(),
                rounds: outcome.rounds,
            })
            .await;

        PhaseReport {
            phase,
            files: outcome.files,
            termination: outcome.termination,
            rounds: outcome.rounds,
        }
    }
}
