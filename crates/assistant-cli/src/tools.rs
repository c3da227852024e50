//! Filesystem Tools
//!
//! Tools with local side effects live next to the binary that grants them.

use assistant_core::{
    error::Result,
    tool::{JsonType, ParameterSchema, Tool, ToolCall, ToolResult, ToolSchema},
};
use async_trait::async_trait;

/// Writes content to a file, creating or truncating it
pub struct WriteFileTool;

#[async_trait]
impl Tool for WriteFileTool {
    fn schema(&self) -> ToolSchema {
        ToolSchema::new("write_to_file", "Writes content to a file.")
            .parameter(
                ParameterSchema::new("filename", JsonType::String)
                    .describe("Path of the file to write"),
            )
            .parameter(
                ParameterSchema::new("content", JsonType::String)
                    .describe("Content to write into the file"),
            )
    }

    async fn execute(&self, call: &ToolCall) -> Result<ToolResult> {
        let filename = call.str_arg("filename")?;
        let content = call.str_arg("content")?;

        tokio::fs::write(filename, content).await?;

        tracing::info!(file = filename, bytes = content.len(), "wrote file");
        Ok(ToolResult::success(
            "write_to_file",
            format!("Wrote {} bytes to {filename}", content.len()),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assistant_core::tool::ToolRegistry;
    use serde_json::json;

    fn args(pairs: &[(&str, serde_json::Value)]) -> serde_json::Map<String, serde_json::Value> {
        pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), v.clone()))
            .collect()
    }

    #[tokio::test]
    async fn test_write_and_read_back() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("note.txt");
        let path_str = path.to_string_lossy().to_string();

        let call = ToolCall::new(
            "write_to_file",
            args(&[
                ("filename", json!(path_str)),
                ("content", json!("hello from the loop")),
            ]),
        );
        let result = WriteFileTool.execute(&call).await.unwrap();

        assert!(result.success);
        assert!(result.output.contains("19 bytes"));
        assert_eq!(
            std::fs::read_to_string(&path).unwrap(),
            "hello from the loop"
        );
    }

    #[tokio::test]
    async fn test_unwritable_path_becomes_dispatch_failure() {
        let mut registry = ToolRegistry::new();
        registry.register(WriteFileTool).unwrap();

        let call = ToolCall::new(
            "write_to_file",
            args(&[
                ("filename", json!("/nonexistent-dir/nope.txt")),
                ("content", json!("x")),
            ]),
        );
        let result = registry.dispatch(&call).await;

        assert!(!result.success);
        assert!(result.output.contains("write_to_file"));
    }

    #[tokio::test]
    async fn test_missing_content_argument_is_rejected() {
        let mut registry = ToolRegistry::new();
        registry.register(WriteFileTool).unwrap();

        let call = ToolCall::new("write_to_file", args(&[("filename", json!("x.txt"))]));
        let result = registry.dispatch(&call).await;

        assert!(!result.success);
        assert!(result.output.contains("content"));
    }
}
