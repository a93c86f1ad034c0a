//! Generation events - CLI 등 외부에서 진행 상황을 보기 위한 이벤트

use crate::tool_loop::Termination;
use semiform_foundation::Phase;
use tokio::sync::mpsc;

/// 생성 중 발생하는 이벤트
#[derive(Debug, Clone, PartialEq)]
pub enum GenerationEvent {
    PhaseStarted {
        phase: Phase,
    },

    /// tool call과 함께 온 모델 텍스트 또는 최종 텍스트
    ModelText {
        phase: Phase,
        text: String,
    },

    FileWritten {
        phase: Phase,
        path: String,
    },

    FileSkipped {
        phase: Phase,
        path: String,
        reason: String,
    },

    ToolCallRejected {
        phase: Phase,
        tool_call_id: String,
        reason: String,
    },

    NotesFound {
        bytes: usize,
    },

    NotesMissing,

    PhaseFinished {
        phase: Phase,
        termination: Termination,
        files: usize,
        rounds: usize,
    },
}

/// 선택적 이벤트 채널 (receiver가 없어도 생성은 계속됨)
#[derive(Debug, Clone, Default)]
pub(crate) struct EventSink {
    tx: Option<mpsc::Sender<GenerationEvent>>,
}

impl EventSink {
    pub(crate) fn new(tx: Option<mpsc::Sender<GenerationEvent>>) -> Self {
        Self { tx }
    }

    pub(crate) async fn emit(&self, event: GenerationEvent) {
        if let Some(tx) = &self.tx {
            let _ = tx.send(event).await;
        }
    }
}
