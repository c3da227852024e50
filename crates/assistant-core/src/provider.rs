//! LLM Provider Abstraction
//!
//! A common interface for completion backends, so the loop works with any
//! OpenAI-compatible endpoint (or a scripted mock in tests) without code
//! changes.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::message::Message;
use crate::tool::{ToolCall, ToolSchema};

/// Response from one completion request
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct Completion {
    /// Free-text content of the assistant message, if any
    pub content: Option<String>,

    /// Tool calls requested by the model, in wire order
    #[serde(default)]
    pub tool_calls: Vec<ToolCall>,

    /// Model that generated this response
    pub model: Option<String>,

    /// Token usage statistics (if reported by the endpoint)
    pub usage: Option<TokenUsage>,
}

impl Completion {
    /// Text-only completion (convenience for tests and simple providers)
    pub fn text(content: impl Into<String>) -> Self {
        Self {
            content: Some(content.into()),
            ..Self::default()
        }
    }
}

/// Token usage statistics
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct TokenUsage {
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
    pub total_tokens: u32,
}

/// Strategy trait for completion providers.
///
/// One blocking request per call: the full ordered history plus the tool
/// descriptor list goes out, one assistant message comes back.
#[async_trait]
pub trait LlmProvider: Send + Sync {
    async fn complete(&self, messages: &[Message], tools: &[ToolSchema]) -> Result<Completion>;
}
