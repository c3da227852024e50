//! OpenAI-compatible Completion Provider
//!
//! Speaks the `/v1/chat/completions` wire protocol: one JSON POST per
//! iteration carrying the full message history, the tool descriptor list and
//! `tool_choice: "auto"`. Works against Ollama, OpenRouter, OpenAI or any
//! other compatible endpoint.

use std::time::Duration;

use assistant_core::{
    error::{AgentError, Result},
    message::Message,
    provider::{Completion, LlmProvider, TokenUsage},
    tool::{ToolCall, ToolSchema},
};
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Value};

/// Provider configuration
#[derive(Clone, Debug)]
pub struct OpenAiConfig {
    /// Full URL of the chat-completions route
    pub base_url: String,

    /// Model identifier sent with every request
    pub model: String,

    /// Bearer token; omitted from requests when absent
    pub api_key: Option<String>,

    /// Transport-level timeout in seconds
    pub timeout_secs: u64,
}

impl Default for OpenAiConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:11434/v1/chat/completions".into(),
            model: "qwen3:0.6b".into(),
            api_key: None,
            timeout_secs: 120,
        }
    }
}

impl OpenAiConfig {
    /// Read `MODEL_BASE_URL`, `MODEL_NAME` and `OPENAI_API_KEY`.
    ///
    /// An empty `OPENAI_API_KEY` counts as absent; local endpoints usually
    /// need none.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            base_url: std::env::var("MODEL_BASE_URL").unwrap_or(defaults.base_url),
            model: std::env::var("MODEL_NAME").unwrap_or(defaults.model),
            api_key: std::env::var("OPENAI_API_KEY")
                .ok()
                .filter(|k| !k.is_empty()),
            timeout_secs: defaults.timeout_secs,
        }
    }
}

/// OpenAI-compatible provider
pub struct OpenAiProvider {
    http: reqwest::Client,
    config: OpenAiConfig,
}

impl OpenAiProvider {
    pub fn new(config: OpenAiConfig) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| AgentError::Provider(format!("failed to build HTTP client: {e}")))?;

        Ok(Self { http, config })
    }

    /// Create from environment variables
    pub fn from_env() -> Result<Self> {
        Self::new(OpenAiConfig::from_env())
    }

    pub fn config(&self) -> &OpenAiConfig {
        &self.config
    }

    /// Wire encoding of the history: role and content only
    fn wire_messages(messages: &[Message]) -> Vec<Value> {
        messages
            .iter()
            .map(|m| json!({ "role": m.role.to_string(), "content": m.content }))
            .collect()
    }

    fn build_payload(&self, messages: &[Message], tools: &[ToolSchema]) -> Value {
        let descriptors: Vec<Value> = tools.iter().map(ToolSchema::to_descriptor).collect();
        json!({
            "model": self.config.model,
            "messages": Self::wire_messages(messages),
            "tools": descriptors,
            "tool_choice": "auto",
        })
    }

    /// Parse a completion response body into the provider-agnostic form.
    ///
    /// A body without (or with empty) `choices` is a provider error, which
    /// the loop folds into history as a recoverable observation.
    fn parse_response(body: &str) -> Result<Completion> {
        let response: ChatResponse = serde_json::from_str(body)
            .map_err(|e| AgentError::Provider(format!("malformed completion response: {e}")))?;

        let choice = response
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| AgentError::Provider("completion response contained no choices".into()))?;

        let tool_calls = choice
            .message
            .tool_calls
            .into_iter()
            .map(|wire| {
                Ok(ToolCall {
                    name: wire.function.name,
                    arguments: parse_arguments(wire.function.arguments)?,
                    id: Some(
                        wire.id
                            .unwrap_or_else(|| uuid::Uuid::new_v4().to_string()),
                    ),
                })
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Completion {
            content: choice.message.content,
            tool_calls,
            model: response.model,
            usage: response.usage.map(|u| TokenUsage {
                prompt_tokens: u.prompt_tokens,
                completion_tokens: u.completion_tokens,
                total_tokens: u.total_tokens,
            }),
        })
    }
}

#[async_trait]
impl LlmProvider for OpenAiProvider {
    async fn complete(&self, messages: &[Message], tools: &[ToolSchema]) -> Result<Completion> {
        let payload = self.build_payload(messages, tools);

        let mut request = self.http.post(&self.config.base_url).json(&payload);
        if let Some(key) = &self.config.api_key {
            request = request.bearer_auth(key);
        }

        let response = request.send().await.map_err(|e| {
            AgentError::Provider(format!("request to {} failed: {e}", self.config.base_url))
        })?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| AgentError::Provider(format!("failed to read response body: {e}")))?;

        tracing::debug!(%status, body = %body, "completion endpoint response");

        if !status.is_success() {
            return Err(AgentError::Provider(format!(
                "completion endpoint returned {status}: {}",
                truncate(&body, 200)
            )));
        }

        Self::parse_response(&body)
    }
}

/// Decode a `function.arguments` payload.
///
/// Endpoints send either a literal JSON object or a JSON-encoded string;
/// both are accepted. Absent arguments decode to an empty map.
fn parse_arguments(raw: Option<Value>) -> Result<serde_json::Map<String, Value>> {
    match raw {
        None => Ok(serde_json::Map::new()),
        Some(Value::Object(map)) => Ok(map),
        Some(Value::String(s)) => match serde_json::from_str::<Value>(&s) {
            Ok(Value::Object(map)) => Ok(map),
            Ok(other) => Err(AgentError::Parse(format!(
                "tool call arguments decoded to {other}, expected an object"
            ))),
            Err(e) => Err(AgentError::Parse(format!(
                "tool call arguments are not valid JSON: {e}"
            ))),
        },
        Some(other) => Err(AgentError::Parse(format!(
            "tool call arguments have unexpected type: {other}"
        ))),
    }
}

fn truncate(s: &str, max_len: usize) -> String {
    if s.len() <= max_len {
        s.to_string()
    } else {
        let cut = s
            .char_indices()
            .take_while(|(i, _)| *i < max_len)
            .last()
            .map_or(0, |(i, c)| i + c.len_utf8());
        format!("{}... [truncated]", &s[..cut])
    }
}

// Wire types for the completion response

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
    model: Option<String>,
    usage: Option<WireUsage>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: WireMessage,
}

#[derive(Debug, Deserialize)]
struct WireMessage {
    content: Option<String>,
    #[serde(default)]
    tool_calls: Vec<WireToolCall>,
}

#[derive(Debug, Deserialize)]
struct WireToolCall {
    id: Option<String>,
    function: WireFunction,
}

#[derive(Debug, Deserialize)]
struct WireFunction {
    name: String,
    arguments: Option<Value>,
}

#[derive(Debug, Deserialize)]
struct WireUsage {
    prompt_tokens: u32,
    completion_tokens: u32,
    total_tokens: u32,
}

#[cfg(test)]
mod tests {
    use super::*;
    use assistant_core::tool::{JsonType, ParameterSchema};

    #[test]
    fn test_config_defaults() {
        let config = OpenAiConfig::default();
        assert_eq!(config.base_url, "http://localhost:11434/v1/chat/completions");
        assert_eq!(config.model, "qwen3:0.6b");
        assert!(config.api_key.is_none());
    }

    #[test]
    fn test_payload_shape() {
        let provider = OpenAiProvider::new(OpenAiConfig::default()).unwrap();
        let messages = vec![Message::system("be helpful"), Message::user("hi")];
        let tools = vec![ToolSchema::new("demo", "A demo.")
            .parameter(ParameterSchema::new("q", JsonType::String))];

        let payload = provider.build_payload(&messages, &tools);

        assert_eq!(payload["model"], "qwen3:0.6b");
        assert_eq!(payload["tool_choice"], "auto");
        assert_eq!(payload["messages"][0]["role"], "system");
        assert_eq!(payload["messages"][1]["content"], "hi");
        // wire messages carry exactly role and content
        assert_eq!(payload["messages"][0].as_object().unwrap().len(), 2);
        assert_eq!(payload["tools"][0]["function"]["name"], "demo");
    }

    #[test]
    fn test_parse_arguments_literal_object() {
        let map = parse_arguments(Some(json!({ "x": 1 }))).unwrap();
        assert_eq!(map["x"], json!(1));
    }

    #[test]
    fn test_parse_arguments_encoded_string() {
        let map = parse_arguments(Some(json!(r#"{"x": 1, "y": "two"}"#))).unwrap();
        assert_eq!(map["x"], json!(1));
        assert_eq!(map["y"], json!("two"));
    }

    #[test]
    fn test_parse_arguments_absent() {
        assert!(parse_arguments(None).unwrap().is_empty());
    }

    #[test]
    fn test_parse_arguments_rejects_non_object() {
        assert!(parse_arguments(Some(json!("[1, 2]"))).is_err());
        assert!(parse_arguments(Some(json!(42))).is_err());
        assert!(parse_arguments(Some(json!("not json"))).is_err());
    }

    #[test]
    fn test_parse_response_with_tool_call() {
        let body = r#"{
            "model": "qwen3:0.6b",
            "choices": [{
                "message": {
                    "content": null,
                    "tool_calls": [{
                        "id": "call_1",
                        "function": {
                            "name": "my_super_cool_function",
                            "arguments": "{\"x_int\": 2, \"y_int\": 3}"
                        }
                    }]
                }
            }],
            "usage": {"prompt_tokens": 10, "completion_tokens": 5, "total_tokens": 15}
        }"#;

        let completion = OpenAiProvider::parse_response(body).unwrap();
        assert_eq!(completion.tool_calls.len(), 1);
        let call = &completion.tool_calls[0];
        assert_eq!(call.name, "my_super_cool_function");
        assert_eq!(call.arguments["x_int"], json!(2));
        assert_eq!(call.id.as_deref(), Some("call_1"));
        assert_eq!(completion.usage.unwrap().total_tokens, 15);
    }

    #[test]
    fn test_parse_response_generates_missing_call_id() {
        let body = r#"{
            "choices": [{
                "message": {
                    "tool_calls": [{
                        "function": { "name": "encode_a_secret", "arguments": {"secret_to_encode": "hi"} }
                    }]
                }
            }]
        }"#;

        let completion = OpenAiProvider::parse_response(body).unwrap();
        assert!(completion.tool_calls[0].id.is_some());
    }

    #[test]
    fn test_parse_response_without_choices_is_an_error() {
        let err = OpenAiProvider::parse_response(r#"{"error": "overloaded"}"#).unwrap_err();
        assert!(matches!(err, AgentError::Provider(_)));
        assert!(err.to_string().contains("no choices"));
    }

    #[test]
    fn test_parse_response_rejects_invalid_json() {
        let err = OpenAiProvider::parse_response("<html>busy</html>").unwrap_err();
        assert!(matches!(err, AgentError::Provider(_)));
    }

    #[test]
    fn test_parse_response_text_only() {
        let body = r#"{"choices": [{"message": {"content": "hello there"}}]}"#;
        let completion = OpenAiProvider::parse_response(body).unwrap();
        assert_eq!(completion.content.as_deref(), Some("hello there"));
        assert!(completion.tool_calls.is_empty());
    }

    #[test]
    fn test_truncate_respects_char_boundaries() {
        let s = "ααααα";
        let t = truncate(s, 3);
        assert!(t.starts_with('α'));
        assert!(t.ends_with("[truncated]"));
    }
}
