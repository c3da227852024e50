//! Tavily Web Search
//!
//! Thin client for the Tavily search API plus the tool exposing it to the
//! model. The API key is read at the point of first use; a missing key is a
//! descriptive tool failure, not a startup error.

use std::time::Duration;

use assistant_core::{
    error::{AgentError, Result},
    tool::{JsonType, ParameterSchema, Tool, ToolCall, ToolResult, ToolSchema},
};
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;

const TAVILY_ENDPOINT: &str = "https://api.tavily.com/search";
const DEFAULT_MAX_RESULTS: u64 = 5;

/// Client for the Tavily search API
pub struct TavilyClient {
    http: reqwest::Client,
    api_key: String,
}

impl TavilyClient {
    pub fn new(api_key: impl Into<String>) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| AgentError::Provider(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            http,
            api_key: api_key.into(),
        })
    }

    /// Create from `TAVILY_API_KEY`; fails with a message naming the variable
    pub fn from_env() -> Result<Self> {
        let api_key = std::env::var("TAVILY_API_KEY")
            .ok()
            .filter(|k| !k.is_empty())
            .ok_or_else(|| {
                AgentError::Config(
                    "TAVILY_API_KEY environment variable not found. \
                     Please add it to your environment or .env file."
                        .into(),
                )
            })?;
        Self::new(api_key)
    }

    /// Search and format the hits as a compact JSON context string
    pub async fn search_context(&self, query: &str, max_results: u64) -> Result<String> {
        let payload = json!({
            "api_key": self.api_key,
            "query": query,
            "max_results": max_results,
            "search_depth": "basic",
            "include_answer": false,
        });

        let response = self
            .http
            .post(TAVILY_ENDPOINT)
            .json(&payload)
            .send()
            .await
            .map_err(|e| AgentError::Provider(format!("search request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            return Err(AgentError::Provider(format!(
                "search endpoint returned {status}"
            )));
        }

        let body: TavilyResponse = response
            .json()
            .await
            .map_err(|e| AgentError::Provider(format!("malformed search response: {e}")))?;

        tracing::debug!(hits = body.results.len(), %query, "search results");
        Ok(context_from(&body.results))
    }
}

/// Render hits as the JSON context string handed back to the model
fn context_from(hits: &[TavilyHit]) -> String {
    let entries: Vec<serde_json::Value> = hits
        .iter()
        .map(|hit| json!({ "url": hit.url, "content": hit.content }))
        .collect();
    serde_json::to_string(&entries).unwrap_or_else(|_| "[]".to_string())
}

#[derive(Debug, Deserialize)]
struct TavilyResponse {
    #[serde(default)]
    results: Vec<TavilyHit>,
}

#[derive(Debug, Deserialize)]
struct TavilyHit {
    #[serde(default)]
    url: String,
    #[serde(default)]
    content: String,
}

/// Web-search tool backed by Tavily
pub struct ContextSearchTool;

#[async_trait]
impl Tool for ContextSearchTool {
    fn schema(&self) -> ToolSchema {
        ToolSchema::new(
            "tavily_context_search",
            "Get search context for answering a query using the Tavily web search API.",
        )
        .parameter(ParameterSchema::new("query", JsonType::String).describe("Search query"))
        .parameter(
            ParameterSchema::new("max_results", JsonType::Integer)
                .describe("Maximum number of results to include in context")
                .with_default(json!(DEFAULT_MAX_RESULTS)),
        )
    }

    async fn execute(&self, call: &ToolCall) -> Result<ToolResult> {
        let query = call.str_arg("query")?;
        let max_results = call.u64_arg_or("max_results", DEFAULT_MAX_RESULTS)?;

        let client = TavilyClient::from_env()?;
        let context = client.search_context(query, max_results).await?;
        Ok(ToolResult::success("tavily_context_search", context))
    }
}
