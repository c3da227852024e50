//! # assistant-runtime
//!
//! Runtime integrations for the tool-assistant loop.
//!
//! - **openai**: provider for OpenAI-compatible `/v1/chat/completions`
//!   endpoints (Ollama, OpenRouter, OpenAI, ...)
//! - **search**: Tavily web-search client and tool
//!
//! ## Usage
//!
//! ```rust,ignore
//! use assistant_runtime::openai::OpenAiProvider;
//!
//! let provider = OpenAiProvider::from_env()?;
//! let agent = AgentBuilder::new()
//!     .provider(Arc::new(provider))
//!     .build()?;
//! ```

pub mod openai;
pub mod search;

pub use openai::{OpenAiConfig, OpenAiProvider};
pub use search::{ContextSearchTool, TavilyClient};

// Re-export core types for convenience
pub use assistant_core::{
    Agent, AgentBuilder, AgentError, Conversation, LlmProvider, Message, Result, Role, RunOutcome,
    Tool, ToolRegistry,
};
