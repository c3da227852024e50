//! Environment Configuration
//!
//! All knobs come from the environment (optionally via a `.env` file loaded
//! at startup):
//!
//! | Variable         | Default                                        |
//! |------------------|------------------------------------------------|
//! | `MODEL_NAME`     | `qwen3:0.6b`                                   |
//! | `MODEL_BASE_URL` | `http://localhost:11434/v1/chat/completions`   |
//! | `OPENAI_API_KEY` | unset (no bearer token)                        |
//! | `MAX_LOOP_COUNT` | `15`                                           |
//! | `DEBUG`          | unset (info-level logging)                     |
//!
//! `TAVILY_API_KEY` is intentionally not read here: the search tool reads it
//! at its first use and fails with a descriptive message if it is missing.

use assistant_core::error::{AgentError, Result};
use assistant_runtime::openai::OpenAiConfig;

const DEFAULT_MAX_LOOPS: usize = 15;

/// Resolved settings for one run
#[derive(Clone, Debug)]
pub struct Settings {
    pub model: String,
    pub base_url: String,
    pub api_key: Option<String>,
    pub max_loops: usize,
    pub debug: bool,
}

impl Settings {
    /// Read settings from the environment.
    ///
    /// An unparseable `MAX_LOOP_COUNT` is a fatal configuration error, not a
    /// silent fallback.
    pub fn from_env() -> Result<Self> {
        let provider = OpenAiConfig::from_env();
        let max_loops = parse_max_loops(std::env::var("MAX_LOOP_COUNT").ok())?;
        let debug = std::env::var("DEBUG").is_ok_and(|v| !v.is_empty());

        Ok(Self {
            model: provider.model,
            base_url: provider.base_url,
            api_key: provider.api_key,
            max_loops,
            debug,
        })
    }

    /// Provider configuration for the completion endpoint
    pub fn provider_config(&self) -> OpenAiConfig {
        OpenAiConfig {
            base_url: self.base_url.clone(),
            model: self.model.clone(),
            api_key: self.api_key.clone(),
            ..OpenAiConfig::default()
        }
    }
}

fn parse_max_loops(raw: Option<String>) -> Result<usize> {
    match raw {
        None => Ok(DEFAULT_MAX_LOOPS),
        Some(value) => value.trim().parse::<usize>().map_err(|_| {
            AgentError::Config(format!(
                "MAX_LOOP_COUNT must be a positive integer, got '{value}'"
            ))
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_max_loops_defaults_to_fifteen() {
        assert_eq!(parse_max_loops(None).unwrap(), DEFAULT_MAX_LOOPS);
    }

    #[test]
    fn test_max_loops_parses_value() {
        assert_eq!(parse_max_loops(Some("3".into())).unwrap(), 3);
    }

    #[test]
    fn test_max_loops_rejects_garbage() {
        let err = parse_max_loops(Some("lots".into())).unwrap_err();
        assert!(matches!(err, AgentError::Config(_)));
        assert!(err.to_string().contains("MAX_LOOP_COUNT"));
    }
}
