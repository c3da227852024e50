//! Tool System
//!
//! Tools are declared with an explicit parameter schema at registration time
//! and invoked by the conversation loop. The registry owns dispatch: a tool
//! call never crashes the loop, it is converted into an observation string.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::error::{AgentError, Result};

/// JSON Schema type of a tool parameter.
///
/// `Array` and `Object` carry no element-type detail.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JsonType {
    Null,
    Integer,
    Number,
    /// Fallback for parameters with no better declared type
    #[default]
    String,
    Boolean,
    Array,
    Object,
}

impl JsonType {
    pub fn as_str(self) -> &'static str {
        match self {
            JsonType::Null => "null",
            JsonType::Integer => "integer",
            JsonType::Number => "number",
            JsonType::String => "string",
            JsonType::Boolean => "boolean",
            JsonType::Array => "array",
            JsonType::Object => "object",
        }
    }
}

/// Parameter definition for tool schema
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ParameterSchema {
    /// Parameter name
    pub name: String,

    /// JSON Schema type
    #[serde(rename = "type")]
    pub param_type: JsonType,

    /// Human-readable description
    #[serde(default)]
    pub description: String,

    /// Default value if not provided
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default: Option<Value>,
}

impl ParameterSchema {
    /// New parameter with an explicit type
    pub fn new(name: impl Into<String>, param_type: JsonType) -> Self {
        Self {
            name: name.into(),
            param_type,
            description: String::new(),
            default: None,
        }
    }

    /// New parameter with no declared type (maps to `string`)
    pub fn untyped(name: impl Into<String>) -> Self {
        Self::new(name, JsonType::default())
    }

    pub fn describe(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_default(mut self, default: Value) -> Self {
        self.default = Some(default);
        self
    }

    /// A parameter is required iff it has no default value
    pub fn is_required(&self) -> bool {
        self.default.is_none()
    }
}

/// Tool definition schema (for LLM function calling)
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ToolSchema {
    /// Unique tool identifier
    pub name: String,

    /// Human-readable description (shown to the LLM); empty when a tool
    /// supplies none
    #[serde(default)]
    pub description: String,

    /// Parameter definitions, in declaration order
    pub parameters: Vec<ParameterSchema>,
}

impl ToolSchema {
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            parameters: Vec::new(),
        }
    }

    pub fn parameter(mut self, parameter: ParameterSchema) -> Self {
        self.parameters.push(parameter);
        self
    }

    /// Build the wire descriptor sent in the request's `tools` array.
    ///
    /// Pure function of the schema: every parameter contributes a `type`
    /// entry to `properties`, and is listed in `required` iff it has no
    /// default value.
    pub fn to_descriptor(&self) -> Value {
        let mut properties = serde_json::Map::new();
        let mut required = Vec::new();

        for param in &self.parameters {
            let mut prop = serde_json::Map::new();
            prop.insert("type".into(), json!(param.param_type.as_str()));
            if !param.description.is_empty() {
                prop.insert("description".into(), json!(param.description));
            }
            properties.insert(param.name.clone(), Value::Object(prop));

            if param.is_required() {
                required.push(param.name.clone());
            }
        }

        json!({
            "type": "function",
            "function": {
                "name": self.name,
                "description": self.description,
                "parameters": {
                    "type": "object",
                    "properties": properties,
                    "required": required,
                }
            }
        })
    }
}

/// Tool call request parsed from model output
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ToolCall {
    /// Tool identifier
    pub name: String,

    /// Arguments as key-value pairs
    #[serde(default)]
    pub arguments: serde_json::Map<String, Value>,

    /// Optional call ID for tracking
    #[serde(default)]
    pub id: Option<String>,
}

impl ToolCall {
    pub fn new(name: impl Into<String>, arguments: serde_json::Map<String, Value>) -> Self {
        Self {
            name: name.into(),
            arguments,
            id: None,
        }
    }

    /// Required string argument
    pub fn str_arg(&self, name: &str) -> Result<&str> {
        self.arguments
            .get(name)
            .and_then(Value::as_str)
            .ok_or_else(|| AgentError::ToolValidation(format!("missing string argument '{name}'")))
    }

    /// Required numeric argument; numeric strings are accepted as well
    pub fn f64_arg(&self, name: &str) -> Result<f64> {
        let value = self
            .arguments
            .get(name)
            .ok_or_else(|| AgentError::ToolValidation(format!("missing argument '{name}'")))?;

        match value {
            Value::Number(n) => n.as_f64().ok_or_else(|| {
                AgentError::ToolValidation(format!("argument '{name}' is not a finite number"))
            }),
            Value::String(s) => s.trim().parse::<f64>().map_err(|_| {
                AgentError::ToolValidation(format!("argument '{name}' is not numeric: '{s}'"))
            }),
            other => Err(AgentError::ToolValidation(format!(
                "argument '{name}' has unexpected type: {other}"
            ))),
        }
    }

    /// Required boolean argument; the strings "true"/"false" are accepted
    pub fn bool_arg(&self, name: &str) -> Result<bool> {
        let value = self
            .arguments
            .get(name)
            .ok_or_else(|| AgentError::ToolValidation(format!("missing argument '{name}'")))?;

        match value {
            Value::Bool(b) => Ok(*b),
            Value::String(s) => s.trim().parse::<bool>().map_err(|_| {
                AgentError::ToolValidation(format!("argument '{name}' is not a boolean: '{s}'"))
            }),
            other => Err(AgentError::ToolValidation(format!(
                "argument '{name}' has unexpected type: {other}"
            ))),
        }
    }

    /// Optional integer argument with a fallback
    pub fn u64_arg_or(&self, name: &str, default: u64) -> Result<u64> {
        match self.arguments.get(name) {
            None => Ok(default),
            Some(Value::Number(n)) => n.as_u64().ok_or_else(|| {
                AgentError::ToolValidation(format!("argument '{name}' is not a positive integer"))
            }),
            Some(Value::String(s)) => s.trim().parse::<u64>().map_err(|_| {
                AgentError::ToolValidation(format!("argument '{name}' is not an integer: '{s}'"))
            }),
            Some(other) => Err(AgentError::ToolValidation(format!(
                "argument '{name}' has unexpected type: {other}"
            ))),
        }
    }
}

/// Result from tool execution
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ToolResult {
    /// Tool that was called
    pub name: String,

    /// Whether execution succeeded
    pub success: bool,

    /// Output (result message or error text)
    pub output: String,

    /// Finish signal: `true` tells the loop to stop after this result
    #[serde(default)]
    pub terminal: bool,
}

impl ToolResult {
    pub fn success(name: impl Into<String>, output: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            success: true,
            output: output.into(),
            terminal: false,
        }
    }

    pub fn failure(name: impl Into<String>, error: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            success: false,
            output: error.into(),
            terminal: false,
        }
    }

    /// Successful result that ends the run
    pub fn finished(name: impl Into<String>, output: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            success: true,
            output: output.into(),
            terminal: true,
        }
    }
}

/// Tool trait - implement to add new capabilities
#[async_trait]
pub trait Tool: Send + Sync {
    /// Get the tool's schema for LLM function calling
    fn schema(&self) -> ToolSchema;

    /// Execute the tool with given arguments
    async fn execute(&self, call: &ToolCall) -> Result<ToolResult>;

    /// Validate arguments before execution (optional)
    fn validate(&self, call: &ToolCall) -> Result<()> {
        let schema = self.schema();

        for param in &schema.parameters {
            if param.is_required() && !call.arguments.contains_key(&param.name) {
                return Err(AgentError::ToolValidation(format!(
                    "Missing required parameter: {}",
                    param.name
                )));
            }
        }

        Ok(())
    }
}

/// Registry for available tools.
///
/// Registration order is preserved so the descriptor list sent to the API
/// matches the order tools were declared in.
#[derive(Default)]
pub struct ToolRegistry {
    tools: Vec<Arc<dyn Tool>>,
    index: HashMap<String, usize>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a new tool; fails if the name is already taken
    pub fn register<T: Tool + 'static>(&mut self, tool: T) -> Result<()> {
        self.register_arc(Arc::new(tool))
    }

    /// Register a shared tool; fails if the name is already taken
    pub fn register_arc(&mut self, tool: Arc<dyn Tool>) -> Result<()> {
        let name = tool.schema().name;
        if self.index.contains_key(&name) {
            return Err(AgentError::DuplicateTool(name));
        }
        self.index.insert(name, self.tools.len());
        self.tools.push(tool);
        Ok(())
    }

    /// Get a tool by name
    pub fn get(&self, name: &str) -> Option<Arc<dyn Tool>> {
        self.index.get(name).map(|&i| self.tools[i].clone())
    }

    /// Execute a tool call, converting every failure into a result string.
    ///
    /// The returned observation embeds the tool name, the arguments and the
    /// raw output, so the model can see exactly what happened.
    pub async fn dispatch(&self, call: &ToolCall) -> ToolResult {
        let Some(tool) = self.get(&call.name) else {
            return ToolResult::failure(
                &call.name,
                format!("Tool '{}' not found in available tools.", call.name),
            );
        };

        let outcome = match tool.validate(call) {
            Ok(()) => tool.execute(call).await,
            Err(e) => Err(e),
        };

        let rendered_args = serde_json::to_string(&call.arguments)
            .unwrap_or_else(|_| "{}".to_string());

        match outcome {
            Ok(result) => ToolResult {
                output: format!(
                    "✅ Called {} with {}. Result: {}",
                    call.name, rendered_args, result.output
                ),
                ..result
            },
            Err(e) => {
                tracing::warn!(tool = %call.name, error = %e, "tool call failed");
                ToolResult::failure(&call.name, format!("❌ Error calling {}: {}", call.name, e))
            }
        }
    }

    /// All tool schemas, in registration order
    pub fn schemas(&self) -> Vec<ToolSchema> {
        self.tools.iter().map(|t| t.schema()).collect()
    }

    /// All wire descriptors, in registration order
    pub fn descriptors(&self) -> Vec<Value> {
        self.tools.iter().map(|t| t.schema().to_descriptor()).collect()
    }

    /// Tool names, in registration order
    pub fn names(&self) -> Vec<String> {
        self.tools.iter().map(|t| t.schema().name).collect()
    }

    /// Number of registered tools
    pub fn len(&self) -> usize {
        self.tools.len()
    }

    /// Check if empty
    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }
}

// ============================================================================
// Built-in Tools
// ============================================================================

/// Name of the finish tool, referenced by the default system prompt
pub const FINISH_TOOL_NAME: &str = "all_work_is_finished";

/// Toy math tool: sin(x) * cos(y)
pub struct CoolMathTool;

#[async_trait]
impl Tool for CoolMathTool {
    fn schema(&self) -> ToolSchema {
        ToolSchema::new(
            "my_super_cool_function",
            "Does some cool math and returns a number.",
        )
        .parameter(ParameterSchema::new("x_int", JsonType::Number))
        .parameter(ParameterSchema::new("y_int", JsonType::Number))
    }

    async fn execute(&self, call: &ToolCall) -> Result<ToolResult> {
        let x = call.f64_arg("x_int")?;
        let y = call.f64_arg("y_int")?;
        let r = x.sin() * y.cos();
        Ok(ToolResult::success("my_super_cool_function", r.to_string()))
    }
}

/// Encodes a secret string with a simple transformation
pub struct SecretEncodeTool;

#[async_trait]
impl Tool for SecretEncodeTool {
    fn schema(&self) -> ToolSchema {
        ToolSchema::new(
            "encode_a_secret",
            "Encodes a secret string with a simple transformation.",
        )
        .parameter(ParameterSchema::new("secret_to_encode", JsonType::String))
    }

    async fn execute(&self, call: &ToolCall) -> Result<ToolResult> {
        let secret = call.str_arg("secret_to_encode")?;
        let encoded: String = secret.chars().map(|c| format!("xx{c}")).collect();
        Ok(ToolResult::success("encode_a_secret", encoded))
    }
}

/// The finish signal.
///
/// A truthy `is_finished` produces a terminal result; the loop stops after
/// it, bypassing the remaining iteration budget. A falsy flag is a normal
/// result and the loop continues.
pub struct FinishTool;

#[async_trait]
impl Tool for FinishTool {
    fn schema(&self) -> ToolSchema {
        ToolSchema::new(
            FINISH_TOOL_NAME,
            "A function to call when all work is sufficiently finished. This ends the run.",
        )
        .parameter(ParameterSchema::new("is_finished", JsonType::Boolean))
    }

    async fn execute(&self, call: &ToolCall) -> Result<ToolResult> {
        if call.bool_arg("is_finished")? {
            Ok(ToolResult::finished(FINISH_TOOL_NAME, "🎉 Work completed!"))
        } else {
            Ok(ToolResult::success(
                FINISH_TOOL_NAME,
                "is_finished was false; the run continues.",
            ))
        }
    }
}
