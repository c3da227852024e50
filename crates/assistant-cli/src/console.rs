//! Console Rendering
//!
//! Renders loop progress to the terminal. Everything here is presentation:
//! the loop itself reports through the `LoopObserver` seam and never touches
//! stdout directly.

use std::io::{self, BufRead, Write};
use std::sync::Mutex;
use std::time::Duration;

use assistant_core::reasoning::{LoopObserver, RunOutcome};
use assistant_core::tool::{ToolCall, ToolRegistry, ToolResult};
use assistant_core::AgentError;
use indicatif::{ProgressBar, ProgressStyle};
use owo_colors::OwoColorize;

use crate::config::Settings;

/// Terminal renderer; implements the loop's observer seam
pub struct ConsoleUi {
    spinner: Mutex<Option<ProgressBar>>,
}

impl Default for ConsoleUi {
    fn default() -> Self {
        Self::new()
    }
}

impl ConsoleUi {
    pub fn new() -> Self {
        Self {
            spinner: Mutex::new(None),
        }
    }

    /// Startup banner: model, key preview, registered tools
    pub fn banner(&self, settings: &Settings, tools: &ToolRegistry) {
        println!("{}", "🤖 AI Tool Assistant".bold().bright_blue());
        println!(
            "Using model: {} from {}",
            settings.model.bright_white(),
            settings.base_url.bright_white()
        );
        if let Some(key) = &settings.api_key {
            let preview: String = key.chars().take(10).collect();
            println!("Using API key: {preview}... (truncated for security)");
        }

        println!("{}", "Available tools:".bold());
        for schema in tools.schemas() {
            println!("  {} {}: {}", "•".cyan(), schema.name.bold(), schema.description);
        }
    }

    /// Echo a prompt supplied on the command line
    pub fn echo_prompt(&self, prompt: &str) {
        println!();
        println!("{} {prompt}", "Using provided prompt:".bold().bright_cyan());
    }

    /// How the run ended
    pub fn outcome(&self, outcome: &RunOutcome) {
        println!();
        match outcome {
            RunOutcome::Finished { iterations } => {
                println!(
                    "{} {}",
                    "🎉 Work completed! Exiting.".bold().green(),
                    format!("({iterations} loops)").dimmed()
                );
            }
            RunOutcome::IterationsExhausted { .. } => {
                println!("{}", "⚠️ Maximum loops reached. Exiting.".bold().yellow());
            }
        }
    }

    pub fn interrupted(&self) {
        self.clear_spinner();
        println!();
        println!("{}", "Interrupted by user. Goodbye!".red());
    }

    fn clear_spinner(&self) {
        if let Ok(mut slot) = self.spinner.lock() {
            if let Some(spinner) = slot.take() {
                spinner.finish_and_clear();
            }
        }
    }
}

impl LoopObserver for ConsoleUi {
    fn iteration_started(&self, iteration: usize, max_iterations: usize) {
        println!();
        println!("{}", format!("--- Loop {iteration}/{max_iterations} ---").dimmed());
    }

    fn request_started(&self) {
        let spinner = ProgressBar::new_spinner();
        spinner.set_style(
            ProgressStyle::with_template("{spinner} {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_spinner()),
        );
        spinner.set_message("🤖 Thinking...");
        spinner.enable_steady_tick(Duration::from_millis(120));

        if let Ok(mut slot) = self.spinner.lock() {
            *slot = Some(spinner);
        }
    }

    fn request_finished(&self) {
        self.clear_spinner();
    }

    fn assistant_text(&self, content: &str) {
        println!("{}", "🤖 Assistant Response".bold().bright_blue());
        println!("{content}");
    }

    fn extra_tool_calls_dropped(&self, total: usize) {
        println!(
            "{}",
            format!(
                "⚠️ Multiple tool calls detected ({total})! Only the first will be processed."
            )
            .red()
        );
    }

    fn tool_call_started(&self, call: &ToolCall) {
        let args = serde_json::to_string(&call.arguments).unwrap_or_else(|_| "{}".to_string());
        println!("🔧 Calling tool: {} with {args}", call.name.bold());
    }

    fn tool_call_finished(&self, result: &ToolResult) {
        if result.success {
            println!("{}", result.output.green());
        } else {
            println!("{}", result.output.red());
        }
    }

    fn transport_error(&self, error: &AgentError) {
        println!("{}", format!("⚠️ {error}").red());
    }
}

/// Styled interactive prompt read from stdin; loops until non-empty
pub fn prompt_for_input() -> io::Result<String> {
    loop {
        println!();
        print!(
            "{} ",
            "What would you like me to help you with?".bold().bright_cyan()
        );
        io::stdout().flush()?;

        let mut input = String::new();
        io::stdin().lock().read_line(&mut input)?;
        let input = input.trim();
        if !input.is_empty() {
            return Ok(input.to_string());
        }
    }
}
