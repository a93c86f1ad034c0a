//! Prompt command - 생성 실행과 진행 상황 출력

use crate::display::render_files;
use crate::schema::load_schema;
use crate::PromptArgs;
use anyhow::bail;
use semiform_agent::{
    GenerationContext, GenerationEvent, GenerationReport, Orchestrator, PhaseReport, Termination,
};
use semiform_foundation::ProviderSettings;
use semiform_provider::{Provider, ProviderClient};
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::warn;

/// Run both phases for one schema file
pub async fn run_prompt(
    ctx: &GenerationContext,
    settings: ProviderSettings,
    args: &PromptArgs,
) -> anyhow::Result<()> {
    let schema = load_schema(&args.file, args.text).await?;

    let provider = ProviderClient::from_settings(&settings)?;
    if !provider.is_available() {
        bail!(
            "{} requires an API key (set {} or pass --api-key)",
            provider.metadata().display_name(),
            settings
                .provider_type
                .api_key_env()
                .unwrap_or("the provider's key variable")
        );
    }

    println!(
        "Semiform - generating {} into {}\n",
        ctx.project_name(),
        ctx.project_root().display()
    );

    // Event channel
    let (tx, mut rx) = mpsc::channel(100);
    let event_handle = tokio::spawn(async move {
        while let Some(event) = rx.recv().await {
            render_event(&event);
        }
    });

    let report = Orchestrator::new(Arc::new(provider))
        .with_max_rounds(args.max_rounds)
        .with_events(tx)
        .generate(ctx, &schema)
        .await;

    // Orchestrator가 drop되면서 sender가 닫힘
    join_renderer(event_handle).await;

    print_report(&report);

    match report.failure() {
        Some((phase, reason)) => bail!("{} phase failed: {}", phase, reason),
        None => Ok(()),
    }
}

/// renderer task가 panic해도 생성 결과 출력은 계속함
async fn join_renderer(handle: JoinHandle<()>) -> bool {
    match handle.await {
        Ok(()) => true,
        Err(e) => {
            warn!("Event renderer stopped unexpectedly: {}", e);
            false
        }
    }
}

fn render_event(event: &GenerationEvent) {
    match event {
        GenerationEvent::PhaseStarted { phase } => {
            println!("▶ Generating {}...", phase);
        }
        GenerationEvent::FileWritten { path, .. } => {
            println!("  ✓ {}", path);
        }
        GenerationEvent::FileSkipped { path, reason, .. } => {
            println!("  ✗ {} ({})", path, reason);
        }
        GenerationEvent::ToolCallRejected {
            tool_call_id,
            reason,
            ..
        } => {
            println!("  ✗ tool call {} rejected: {}", tool_call_id, reason);
        }
        GenerationEvent::NotesFound { bytes } => {
            println!("  ✓ backend notes found ({} bytes)", bytes);
        }
        GenerationEvent::NotesMissing => {
            println!("  ! no backend notes, continuing without them");
        }
        GenerationEvent::PhaseFinished {
            phase,
            termination,
            files,
            rounds,
        } => {
            let status = match termination {
                Termination::Completed => "✓",
                Termination::Truncated => "!",
                Termination::Failed(_) => "✗",
            };
            println!(
                "{} {} {} ({} files, {} rounds)\n",
                status, phase, termination, files, rounds
            );
        }
        // 모델 텍스트는 로그로만 남김
        GenerationEvent::ModelText { .. } => {}
    }
}

fn print_report(report: &GenerationReport) {
    for phase in report.phases() {
        if let Some(table) = render_files(&category(phase), &phase.files) {
            println!("{}", table);
        }
    }

    let total = report.files_created().len();
    if report.is_success() {
        println!("✓ Generation finished: {} files", total);
    } else {
        println!("✗ Generation stopped: {} files written", total);
    }
}

fn category(phase: &PhaseReport) -> String {
    let name = phase.phase.name();
    let mut chars = name.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}
