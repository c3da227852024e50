//! Conversation Loop
//!
//! The orchestrator owns the message history. Each iteration sends the full
//! history plus the tool descriptor list to the provider, routes at most one
//! tool call to the registry, and appends the synthesized observation as the
//! next user message. The loop ends on a terminal tool result or when the
//! iteration budget runs out.

use std::sync::Arc;

use crate::error::{AgentError, Result};
use crate::message::{Conversation, Message, Role};
use crate::provider::LlmProvider;
use crate::tool::{Tool, ToolCall, ToolRegistry, ToolResult, FINISH_TOOL_NAME};

const DEFAULT_SYSTEM_PROMPT: &str = "You are a helpful AI assistant that works in a loop. \
You can call tools when necessary. After thinking, return in valid tool calling format. \
Call 'all_work_is_finished' with is_finished=true when the task is complete.\n\n\
Only call one tool per response/iteration of the loop.";

const NEXT_STEP_INSTRUCTION: &str = "Given this information, decide what to do next or call \
'all_work_is_finished' if the task is complete.";

/// Loop configuration
#[derive(Clone, Debug)]
pub struct AgentConfig {
    /// System prompt placed at the head of every conversation
    pub system_prompt: String,

    /// Maximum request/response cycles before giving up
    pub max_iterations: usize,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            system_prompt: DEFAULT_SYSTEM_PROMPT.into(),
            max_iterations: 15,
        }
    }
}

/// Progress callbacks for a presentation layer.
///
/// The loop itself never touches a terminal; a renderer implements this and
/// the core stays testable. All methods default to no-ops.
pub trait LoopObserver: Send + Sync {
    fn iteration_started(&self, _iteration: usize, _max_iterations: usize) {}
    fn request_started(&self) {}
    fn request_finished(&self) {}
    /// The model answered with free text and no tool call
    fn assistant_text(&self, _content: &str) {}
    /// The model requested more than one tool call; only the first ran
    fn extra_tool_calls_dropped(&self, _total: usize) {}
    fn tool_call_started(&self, _call: &ToolCall) {}
    fn tool_call_finished(&self, _result: &ToolResult) {}
    /// The completion request failed; the loop continues with an observation
    fn transport_error(&self, _error: &AgentError) {}
}

/// Observer that ignores everything
pub struct NoopObserver;

impl LoopObserver for NoopObserver {}

/// How a run ended
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RunOutcome {
    /// The finish tool was invoked with a truthy flag
    Finished { iterations: usize },

    /// The iteration budget ran out before a finish signal
    IterationsExhausted { iterations: usize },
}

/// The conversation orchestrator
pub struct Agent {
    provider: Arc<dyn LlmProvider>,
    tools: Arc<ToolRegistry>,
    config: AgentConfig,
    observer: Arc<dyn LoopObserver>,
}

impl std::fmt::Debug for Agent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Agent")
            .field("config", &self.config)
            .field("tools", &self.tools.names())
            .finish_non_exhaustive()
    }
}

impl Agent {
    pub fn new(
        provider: Arc<dyn LlmProvider>,
        tools: Arc<ToolRegistry>,
        config: AgentConfig,
        observer: Arc<dyn LoopObserver>,
    ) -> Self {
        Self {
            provider,
            tools,
            config,
            observer,
        }
    }

    /// Run the loop over an existing conversation.
    ///
    /// The system prompt is inserted if the conversation does not already
    /// start with one. Completion-endpoint failures are folded back into the
    /// history as recoverable observations; they still consume an iteration.
    pub async fn run(&self, conversation: &mut Conversation) -> Result<RunOutcome> {
        if conversation.messages().first().map(|m| &m.role) != Some(&Role::System) {
            conversation
                .messages_mut()
                .insert(0, Message::system(self.config.system_prompt.clone()));
        }

        let schemas = self.tools.schemas();

        for iteration in 0..self.config.max_iterations {
            self.observer
                .iteration_started(iteration + 1, self.config.max_iterations);
            tracing::debug!(iteration = iteration + 1, "loop iteration");

            self.observer.request_started();
            let completion = self
                .provider
                .complete(conversation.messages(), &schemas)
                .await;
            self.observer.request_finished();

            let completion = match completion {
                Ok(c) => c,
                Err(e) => {
                    self.observer.transport_error(&e);
                    tracing::warn!(error = %e, "completion request failed");
                    conversation.push(Message::user(format!(
                        "⚠️ The completion endpoint request failed: {e}. \
                         The conversation so far is unchanged; please try again.\n\n\
                         {NEXT_STEP_INSTRUCTION}"
                    )));
                    continue;
                }
            };

            if let Some(usage) = &completion.usage {
                tracing::debug!(
                    prompt_tokens = usage.prompt_tokens,
                    completion_tokens = usage.completion_tokens,
                    "token usage"
                );
            }

            let mut tool_calls = completion.tool_calls;
            if tool_calls.len() > 1 {
                self.observer.extra_tool_calls_dropped(tool_calls.len());
                tracing::warn!(
                    requested = tool_calls.len(),
                    "multiple tool calls in one response; only the first is processed"
                );
                tool_calls.truncate(1);
            }

            let observation = match tool_calls.into_iter().next() {
                None => {
                    let content = completion
                        .content
                        .unwrap_or_else(|| "No response content".to_string());
                    self.observer.assistant_text(&content);
                    format!(
                        "💭 Assistant provided a text response without calling any tools. \
                         Response: '{content}'. If you need to use tools to complete the task, \
                         please call the appropriate function. If the task is complete, call \
                         '{FINISH_TOOL_NAME}' with is_finished=true. When calling this tool make \
                         sure to use the 'tool_calls' format."
                    )
                }
                Some(call) => {
                    self.observer.tool_call_started(&call);
                    let result = self.tools.dispatch(&call).await;
                    self.observer.tool_call_finished(&result);

                    if result.terminal {
                        return Ok(RunOutcome::Finished {
                            iterations: iteration + 1,
                        });
                    }
                    result.output
                }
            };

            conversation.push(Message::user(format!(
                "{observation}\n\n{NEXT_STEP_INSTRUCTION}"
            )));
        }

        Ok(RunOutcome::IterationsExhausted {
            iterations: self.config.max_iterations,
        })
    }

    /// Run on a single prompt with a fresh two-message history
    pub async fn ask(&self, prompt: &str) -> Result<RunOutcome> {
        let mut conversation = Conversation::with_system_prompt(self.config.system_prompt.clone());
        conversation.push(Message::user(prompt));
        self.run(&mut conversation).await
    }

    /// Get the tool registry
    pub fn tools(&self) -> &ToolRegistry {
        &self.tools
    }

    /// Get configuration
    pub fn config(&self) -> &AgentConfig {
        &self.config
    }
}

/// Builder for the orchestrator.
///
/// Tools are collected first and registered in one pass inside `build`, so a
/// duplicate name fails at construction, before any loop runs.
pub struct AgentBuilder {
    provider: Option<Arc<dyn LlmProvider>>,
    tools: Vec<Arc<dyn Tool>>,
    observer: Arc<dyn LoopObserver>,
    config: AgentConfig,
}

impl Default for AgentBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl AgentBuilder {
    pub fn new() -> Self {
        Self {
            provider: None,
            tools: Vec::new(),
            observer: Arc::new(NoopObserver),
            config: AgentConfig::default(),
        }
    }

    pub fn provider(mut self, provider: Arc<dyn LlmProvider>) -> Self {
        self.provider = Some(provider);
        self
    }

    pub fn tool<T: Tool + 'static>(mut self, tool: T) -> Self {
        self.tools.push(Arc::new(tool));
        self
    }

    pub fn tool_arc(mut self, tool: Arc<dyn Tool>) -> Self {
        self.tools.push(tool);
        self
    }

    pub fn observer(mut self, observer: Arc<dyn LoopObserver>) -> Self {
        self.observer = observer;
        self
    }

    pub fn system_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.config.system_prompt = prompt.into();
        self
    }

    pub fn max_iterations(mut self, max: usize) -> Self {
        self.config.max_iterations = max;
        self
    }

    pub fn build(self) -> Result<Agent> {
        let provider = self
            .provider
            .ok_or_else(|| AgentError::Config("Provider is required".into()))?;

        let mut registry = ToolRegistry::new();
        for tool in self.tools {
            registry.register_arc(tool)?;
        }

        Ok(Agent::new(
            provider,
            Arc::new(registry),
            self.config,
            self.observer,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::Completion;
    use crate::tool::{FinishTool, ToolSchema};
    use async_trait::async_trait;
    use serde_json::json;
    use std::collections::VecDeque;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    /// Provider that replays a fixed script of responses
    struct ScriptedProvider {
        script: Mutex<VecDeque<Result<Completion>>>,
        calls: AtomicUsize,
    }

    impl ScriptedProvider {
        fn new(script: Vec<Result<Completion>>) -> Arc<Self> {
            Arc::new(Self {
                script: Mutex::new(script.into()),
                calls: AtomicUsize::new(0),
            })
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl LlmProvider for ScriptedProvider {
        async fn complete(
            &self,
            _messages: &[Message],
            _tools: &[ToolSchema],
        ) -> Result<Completion> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.script
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| Ok(Completion::text("script exhausted")))
        }
    }

    /// Tool that records every invocation
    struct RecorderTool {
        invocations: Arc<AtomicUsize>,
    }

    #[async_trait]
    impl Tool for RecorderTool {
        fn schema(&self) -> ToolSchema {
            ToolSchema::new("recorder", "Records invocations.")
        }

        async fn execute(&self, _call: &ToolCall) -> Result<ToolResult> {
            self.invocations.fetch_add(1, Ordering::SeqCst);
            Ok(ToolResult::success("recorder", "recorded"))
        }
    }

    /// Observer that counts dropped-tool-call warnings
    #[derive(Default)]
    struct WarningCounter {
        dropped: AtomicUsize,
    }

    impl LoopObserver for WarningCounter {
        fn extra_tool_calls_dropped(&self, _total: usize) {
            self.dropped.fetch_add(1, Ordering::SeqCst);
        }
    }

    fn tool_call(name: &str, arguments: serde_json::Value) -> ToolCall {
        let serde_json::Value::Object(map) = arguments else {
            panic!("arguments must be an object");
        };
        ToolCall::new(name, map)
    }

    fn finish_call(flag: bool) -> ToolCall {
        tool_call(FINISH_TOOL_NAME, json!({ "is_finished": flag }))
    }

    fn completion_with_calls(calls: Vec<ToolCall>) -> Completion {
        Completion {
            tool_calls: calls,
            ..Completion::default()
        }
    }

    fn agent_with(provider: Arc<ScriptedProvider>, max_iterations: usize) -> Agent {
        AgentBuilder::new()
            .provider(provider)
            .tool(FinishTool)
            .max_iterations(max_iterations)
            .build()
            .unwrap()
    }

    #[tokio::test]
    async fn test_budget_exhaustion_without_finish() {
        let provider = ScriptedProvider::new(vec![
            Ok(Completion::text("thinking")),
            Ok(Completion::text("still thinking")),
            Ok(Completion::text("hmm")),
        ]);
        let agent = agent_with(provider.clone(), 3);

        let outcome = agent.ask("do something").await.unwrap();

        assert_eq!(outcome, RunOutcome::IterationsExhausted { iterations: 3 });
        assert_eq!(provider.calls(), 3);
    }

    #[tokio::test]
    async fn test_finish_signal_ends_run_immediately() {
        let provider = ScriptedProvider::new(vec![
            Ok(completion_with_calls(vec![finish_call(true)])),
            Ok(Completion::text("never requested")),
        ]);
        let agent = agent_with(provider.clone(), 15);

        let outcome = agent.ask("wrap up").await.unwrap();

        assert_eq!(outcome, RunOutcome::Finished { iterations: 1 });
        assert_eq!(provider.calls(), 1);
    }

    #[tokio::test]
    async fn test_finish_with_false_flag_keeps_looping() {
        let provider = ScriptedProvider::new(vec![
            Ok(completion_with_calls(vec![finish_call(false)])),
            Ok(completion_with_calls(vec![finish_call(true)])),
        ]);
        let agent = agent_with(provider.clone(), 15);

        let outcome = agent.ask("almost done").await.unwrap();

        assert_eq!(outcome, RunOutcome::Finished { iterations: 2 });
        assert_eq!(provider.calls(), 2);
    }

    #[tokio::test]
    async fn test_only_first_of_multiple_tool_calls_is_processed() {
        let invocations = Arc::new(AtomicUsize::new(0));
        let observer = Arc::new(WarningCounter::default());

        // Second call in the same response is the finish signal; if it ran,
        // the run would end on iteration 1.
        let provider = ScriptedProvider::new(vec![
            Ok(completion_with_calls(vec![
                tool_call("recorder", json!({})),
                finish_call(true),
            ])),
            Ok(completion_with_calls(vec![finish_call(true)])),
        ]);

        let agent = AgentBuilder::new()
            .provider(provider.clone())
            .tool(RecorderTool {
                invocations: invocations.clone(),
            })
            .tool(FinishTool)
            .observer(observer.clone())
            .max_iterations(15)
            .build()
            .unwrap();

        let outcome = agent.ask("two at once").await.unwrap();

        assert_eq!(outcome, RunOutcome::Finished { iterations: 2 });
        assert_eq!(invocations.load(Ordering::SeqCst), 1);
        assert_eq!(observer.dropped.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_provider_error_becomes_recoverable_observation() {
        let provider = ScriptedProvider::new(vec![
            Err(AgentError::Provider("response contained no choices".into())),
            Ok(completion_with_calls(vec![finish_call(true)])),
        ]);
        let agent = agent_with(provider.clone(), 15);

        let mut conversation = Conversation::new();
        conversation.push(Message::user("fragile endpoint"));
        let outcome = agent.run(&mut conversation).await.unwrap();

        assert_eq!(outcome, RunOutcome::Finished { iterations: 2 });
        let error_obs = conversation
            .messages()
            .iter()
            .find(|m| m.content.contains("completion endpoint request failed"))
            .expect("error observation appended");
        assert_eq!(error_obs.role, Role::User);
        assert!(error_obs.content.contains("no choices"));
    }

    #[tokio::test]
    async fn test_text_response_is_quoted_back_as_user_observation() {
        let provider = ScriptedProvider::new(vec![Ok(Completion::text("just chatting"))]);
        let agent = agent_with(provider, 1);

        let mut conversation = Conversation::new();
        conversation.push(Message::user("hello"));
        agent.run(&mut conversation).await.unwrap();

        let last = conversation.last().unwrap();
        assert_eq!(last.role, Role::User);
        assert!(last.content.contains("'just chatting'"));
        assert!(last.content.contains(FINISH_TOOL_NAME));
    }

    #[tokio::test]
    async fn test_tool_result_observation_carries_next_step_instruction() {
        let invocations = Arc::new(AtomicUsize::new(0));
        let provider = ScriptedProvider::new(vec![Ok(completion_with_calls(vec![tool_call(
            "recorder",
            json!({}),
        )]))]);

        let agent = AgentBuilder::new()
            .provider(provider)
            .tool(RecorderTool { invocations })
            .tool(FinishTool)
            .max_iterations(1)
            .build()
            .unwrap();

        let mut conversation = Conversation::new();
        conversation.push(Message::user("record it"));
        agent.run(&mut conversation).await.unwrap();

        let last = conversation.last().unwrap();
        assert!(last.content.contains("✅ Called recorder"));
        assert!(last.content.contains("decide what to do next"));
    }

    #[tokio::test]
    async fn test_system_prompt_inserted_when_missing() {
        let provider = ScriptedProvider::new(vec![Ok(completion_with_calls(vec![finish_call(
            true,
        )]))]);
        let agent = agent_with(provider, 15);

        let mut conversation = Conversation::new();
        conversation.push(Message::user("no system prompt yet"));
        agent.run(&mut conversation).await.unwrap();

        assert_eq!(conversation.messages()[0].role, Role::System);
    }

    #[test]
    fn test_builder_requires_provider() {
        let err = AgentBuilder::new().build().unwrap_err();
        assert!(matches!(err, AgentError::Config(_)));
    }

    #[test]
    fn test_builder_rejects_duplicate_tools() {
        let provider = ScriptedProvider::new(vec![]);
        let err = AgentBuilder::new()
            .provider(provider)
            .tool(FinishTool)
            .tool(FinishTool)
            .build()
            .unwrap_err();
        assert!(matches!(err, AgentError::DuplicateTool(_)));
    }
}
