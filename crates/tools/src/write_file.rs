//! `write_file` — create or overwrite a file.

use async_trait::async_trait;
use majordome_core::error::ToolError;
use majordome_core::tool::{InvocationContext, Tool};
use tracing::debug;

use crate::path_argument;

pub struct WriteFileTool;

#[async_trait]
impl Tool for WriteFileTool {
    fn name(&self) -> &str {
        "write_file"
    }

    fn description(&self) -> &str {
        "Write content to a file. Creates the file (and parent directories) if needed, overwrites it otherwise."
    }

    fn parameters_schema(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "path": {
                    "type": "string",
                    "description": "The file path to write to"
                },
                "content": {
                    "type": "string",
                    "description": "The full content to write"
                }
            },
            "required": ["path", "content"]
        })
    }

    async fn execute(
        &self,
        arguments: serde_json::Value,
        _context: &InvocationContext,
    ) -> Result<serde_json::Value, ToolError> {
        let path = path_argument(&arguments)
            .ok_or_else(|| ToolError::InvalidArguments("Missing 'path' argument".into()))?;

        let content = arguments["content"]
            .as_str()
            .ok_or_else(|| ToolError::InvalidArguments("Missing 'content' argument".into()))?;

        if let Some(parent) = std::path::Path::new(path).parent()
            && !parent.as_os_str().is_empty()
            && let Err(e) = tokio::fs::create_dir_all(parent).await
        {
            return Ok(serde_json::json!({
                "success": false,
                "error": format!("Failed to create directory: {e}"),
            }));
        }

        match tokio::fs::write(path, content).await {
            Ok(()) => {
                debug!(path, bytes = content.len(), "File written");
                Ok(serde_json::json!({
                    "success": true,
                    "message": format!("Wrote {} bytes to {path}", content.len()),
                }))
            }
            Err(e) => Ok(serde_json::json!({
                "success": false,
                "error": format!("Failed to write {path}: {e}"),
            })),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ctx() -> InvocationContext {
        InvocationContext {
            session_id: "test".into(),
            iteration: 1,
            call_id: "call_1".into(),
        }
    }

    #[test]
    fn tool_definition() {
        let schema = WriteFileTool.parameters_schema();
        assert_eq!(schema["required"], serde_json::json!(["path", "content"]));
        assert_eq!(WriteFileTool.name(), "write_file");
    }

    #[tokio::test]
    async fn write_and_verify() {
        let dir = tempfile::tempdir().unwrap();
        let file_path = dir.path().join("output.txt");

        let result = WriteFileTool
            .execute(
                serde_json::json!({
                    "path": file_path.to_str().unwrap(),
                    "content": "Hello from test!"
                }),
                &ctx(),
            )
            .await
            .unwrap();

        assert_eq!(result["success"], true);
        assert!(result["message"].as_str().unwrap().contains("16 bytes"));
        assert_eq!(std::fs::read_to_string(&file_path).unwrap(), "Hello from test!");
    }

    #[tokio::test]
    async fn write_creates_parent_dirs() {
        let dir = tempfile::tempdir().unwrap();
        let file_path = dir.path().join("nested").join("dir").join("file.txt");

        let result = WriteFileTool
            .execute(
                serde_json::json!({
                    "file_path": file_path.to_str().unwrap(),
                    "content": "nested content"
                }),
                &ctx(),
            )
            .await
            .unwrap();

        assert_eq!(result["success"], true);
        assert_eq!(std::fs::read_to_string(&file_path).unwrap(), "nested content");
    }

    #[tokio::test]
    async fn missing_content_argument() {
        let result = WriteFileTool
            .execute(serde_json::json!({ "path": "/tmp/x.txt" }), &ctx())
            .await;
        assert!(matches!(result, Err(ToolError::InvalidArguments(_))));
    }
}
