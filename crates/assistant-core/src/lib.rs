//! # assistant-core
//!
//! Core loop logic with provider-agnostic LLM abstraction and a
//! statically-declared tool system.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                        Agent                                 │
//! │  ┌─────────────┐  ┌─────────────┐  ┌─────────────────────┐  │
//! │  │ Conversation│  │    Tool     │  │   LlmProvider       │  │
//! │  │    Loop     │──│   Registry  │──│   (Strategy)        │  │
//! │  └─────────────┘  └─────────────┘  └─────────────────────┘  │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! The `LlmProvider` trait keeps the loop independent of the concrete
//! endpoint; the `LoopObserver` trait keeps it independent of the terminal.

pub mod error;
pub mod message;
pub mod provider;
pub mod reasoning;
pub mod tool;

pub use error::{AgentError, Result};
pub use message::{Conversation, Message, Role};
pub use provider::{Completion, LlmProvider};
pub use reasoning::{Agent, AgentBuilder, AgentConfig, LoopObserver, NoopObserver, RunOutcome};
pub use tool::{Tool, ToolCall, ToolRegistry, ToolResult, ToolSchema};
