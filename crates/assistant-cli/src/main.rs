//! tool-assistant CLI
//!
//! Wires the loop together: environment settings, the OpenAI-compatible
//! provider, the fixed tool set and the console renderer, then runs a single
//! conversation to completion, budget exhaustion or ctrl-c.

mod config;
mod console;
mod tools;

use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;
use owo_colors::OwoColorize;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use assistant_core::reasoning::AgentBuilder;
use assistant_core::tool::{CoolMathTool, FinishTool, SecretEncodeTool};
use assistant_runtime::openai::OpenAiProvider;
use assistant_runtime::search::ContextSearchTool;

use crate::config::Settings;
use crate::console::ConsoleUi;
use crate::tools::WriteFileTool;

#[derive(Parser, Debug)]
#[command(name = "assistant", version, about = "AI tool assistant that works in a loop")]
struct Cli {
    /// Initial prompt to send to the assistant; read interactively if absent
    #[arg(short, long)]
    prompt: Option<String>,
}

#[tokio::main]
async fn main() -> ExitCode {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    let settings = match Settings::from_env() {
        Ok(settings) => settings,
        Err(e) => {
            eprintln!("{}", format!("Error: {e}").red());
            return ExitCode::from(1);
        }
    };

    init_tracing(&settings);

    match run(cli, settings).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            // One-line message, never a backtrace
            eprintln!("{}", format!("Error: {e}").red());
            ExitCode::from(1)
        }
    }
}

fn init_tracing(settings: &Settings) {
    let default_filter = if settings.debug { "debug" } else { "info" };
    tracing_subscriber::registry()
        .with(EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| default_filter.into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();
}

async fn run(cli: Cli, settings: Settings) -> anyhow::Result<()> {
    let ui = Arc::new(ConsoleUi::new());
    let provider = Arc::new(OpenAiProvider::new(settings.provider_config())?);

    let agent = AgentBuilder::new()
        .provider(provider)
        .tool(CoolMathTool)
        .tool(SecretEncodeTool)
        .tool(FinishTool)
        .tool(ContextSearchTool)
        .tool(WriteFileTool)
        .max_iterations(settings.max_loops)
        .observer(ui.clone())
        .build()?;

    ui.banner(&settings, agent.tools());

    let prompt = match cli.prompt {
        Some(prompt) => {
            ui.echo_prompt(&prompt);
            prompt
        }
        None => console::prompt_for_input()?,
    };

    tokio::select! {
        outcome = agent.ask(&prompt) => {
            ui.outcome(&outcome?);
        }
        _ = tokio::signal::ctrl_c() => {
            ui.interrupted();
        }
    }

    Ok(())
}
