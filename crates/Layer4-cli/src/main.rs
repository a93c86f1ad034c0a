//! Semiform CLI - Main entry point

mod cli;
mod display;
mod schema;

use clap::{Parser, Subcommand};
use semiform_agent::{GenerationContext, DEFAULT_MAX_ROUNDS};
use semiform_foundation::strings::LOG_FILE;
use semiform_foundation::{ProviderSettings, ProviderType, SettingsFile};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, Layer};

/// Semiform - generate a runnable backend and frontend from a project schema
#[derive(Parser, Debug)]
#[command(name = "semiform")]
#[command(author, version, about, long_about = None)]
struct Args {
    #[command(subcommand)]
    command: Command,

    /// Enable debug logging
    #[arg(long, global = true)]
    debug: bool,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Generate backend and frontend code from a schema file
    Prompt(PromptArgs),

    /// List supported providers and their defaults
    Providers,
}

#[derive(clap::Args, Debug)]
pub struct PromptArgs {
    /// Schema file (JSON unless --text is given)
    file: PathBuf,

    /// Name of the project
    #[arg(short, long, default_value = "semiform-app")]
    name: String,

    /// Root destination directory
    #[arg(short, long, default_value = "./generated")]
    destination: PathBuf,

    /// Provider to use (anthropic, openai, openai-assistant, ollama, groq, deepseek)
    #[arg(short, long, visible_alias = "llm-model")]
    provider: Option<String>,

    /// Model to use
    #[arg(short, long)]
    model: Option<String>,

    /// Maximum output tokens per model call
    #[arg(short = 't', long)]
    max_tokens: Option<u32>,

    /// Base URL of a self-hosted endpoint (e.g. http://localhost:11434 for ollama)
    #[arg(long)]
    host: Option<String>,

    /// API key for the provider (overrides env and config)
    #[arg(long)]
    api_key: Option<String>,

    /// Send the schema file as plain text instead of JSON
    #[arg(long)]
    text: bool,

    /// Maximum tool rounds per phase
    #[arg(long, default_value_t = DEFAULT_MAX_ROUNDS)]
    max_rounds: usize,

    /// Do not write combined.log into the project directory
    #[arg(long)]
    no_log_file: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    match args.command {
        Command::Providers => {
            init_logging(args.debug, None)?;
            list_providers();
            Ok(())
        }
        Command::Prompt(prompt) => {
            let ctx = GenerationContext::new(&prompt.destination, &prompt.name)?;

            let log_file = if prompt.no_log_file {
                None
            } else {
                Some(ctx.project_root().join(LOG_FILE))
            };
            init_logging(args.debug, log_file.as_deref())?;

            let settings = resolve_settings(&prompt)?;
            cli::run_prompt(&ctx, settings, &prompt).await
        }
    }
}

/// Console layer + 선택적 combined.log layer
fn init_logging(debug: bool, log_file: Option<&Path>) -> anyhow::Result<()> {
    let log_level = if debug { "debug" } else { "info" };

    let file_layer = match log_file {
        Some(path) => {
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent)?;
            }
            let file = std::fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)?;
            Some(
                tracing_subscriber::fmt::layer()
                    .with_ansi(false)
                    .with_writer(Arc::new(file))
                    .boxed(),
            )
        }
        None => None,
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(log_level)),
        )
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .with(file_layer)
        .init();

    Ok(())
}

/// providers.json → CLI 플래그 순서로 덮어씀
fn resolve_settings(args: &PromptArgs) -> anyhow::Result<ProviderSettings> {
    let file = SettingsFile::load().unwrap_or_else(|e| {
        tracing::warn!("Failed to load provider settings: {}", e);
        SettingsFile::new()
    });

    let provider_type = match &args.provider {
        Some(name) => name.parse::<ProviderType>()?,
        None => file.default.unwrap_or_default(),
    };

    let mut settings = file.settings_for(provider_type);
    if let Some(model) = &args.model {
        settings = settings.model(model.clone());
    }
    if let Some(max_tokens) = args.max_tokens {
        settings = settings.max_tokens(max_tokens);
    }
    if let Some(host) = &args.host {
        settings = settings.base_url(host.clone());
    }
    if let Some(api_key) = &args.api_key {
        settings = settings.api_key(api_key.clone());
    }

    tracing::debug!(
        "Resolved provider: {} ({})",
        provider_type.name(),
        settings.effective_model()
    );
    Ok(settings)
}

fn list_providers() {
    println!("{:<18} {:<28} {}", "PROVIDER", "DEFAULT MODEL", "API KEY");
    for provider_type in ProviderType::ALL {
        let key = match provider_type.api_key_env() {
            Some(env) if std::env::var(env).is_ok() => format!("{} ✓", env),
            Some(env) => format!("{} (not set)", env),
            None => "-".to_string(),
        };
        println!(
            "{:<18} {:<28} {}",
            provider_type.id(),
            provider_type.default_model(),
            key
        );
    }
}
