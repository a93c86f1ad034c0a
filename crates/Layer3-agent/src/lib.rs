//! # semiform-agent
//!
//! Semiform 생성 엔진. 모델 응답을 tool loop로 처리하고, backend → frontend 두 phase를
//! 순서대로 실행합니다.
//!
//! ## 흐름
//!
//! 1. backend phase: schema를 보내고 tool call마다 파일을 기록
//! 2. backend가 남긴 `NOTES.md`를 읽어 frontend 지시문에 붙임
//! 3. frontend phase: backend 파일 목록 manifest와 함께 같은 loop 실행
//!
//! ## 사용 예
//!
//! ```ignore
//! use semiform_agent::{GenerationContext, Orchestrator};
//! use semiform_provider::ProviderClient;
//!
//! let provider = ProviderClient::from_settings(&settings)?;
//! let ctx = GenerationContext::new("./generated", "shop")?;
//! let report = Orchestrator::new(Arc::new(provider))
//!     .generate(&ctx, &schema)
//!     .await;
//! println!("{} files", report.files_created().len());
//! ```

pub mod event;
pub mod orchestrator;
pub mod prompts;
pub mod tool_loop;

pub use event::GenerationEvent;
pub use orchestrator::{GenerationContext, GenerationReport, Orchestrator, PhaseReport};
pub use prompts::{manifest_message, PhasePrompts};
pub use tool_loop::{LoopOutcome, Termination, ToolLoop, DEFAULT_MAX_ROUNDS};
