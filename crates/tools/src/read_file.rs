//! `read_file` — read a text file, optionally only its first lines.

use async_trait::async_trait;
use majordome_core::error::ToolError;
use majordome_core::tool::{InvocationContext, Tool};

use crate::path_argument;

pub struct ReadFileTool;

#[async_trait]
impl Tool for ReadFileTool {
    fn name(&self) -> &str {
        "read_file"
    }

    fn description(&self) -> &str {
        "Read the contents of a text file at the given path."
    }

    fn parameters_schema(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "path": {
                    "type": "string",
                    "description": "The file path to read"
                },
                "limit": {
                    "type": "integer",
                    "description": "Only return the first N lines"
                }
            },
            "required": ["path"]
        })
    }

    async fn execute(
        &self,
        arguments: serde_json::Value,
        _context: &InvocationContext,
    ) -> Result<serde_json::Value, ToolError> {
        let path = path_argument(&arguments)
            .ok_or_else(|| ToolError::InvalidArguments("Missing 'path' argument".into()))?;

        let content = match tokio::fs::read_to_string(path).await {
            Ok(content) => content,
            Err(e) => {
                return Ok(serde_json::json!({
                    "success": false,
                    "error": format!("Failed to read {path}: {e}"),
                }));
            }
        };

        let total_lines = content.lines().count();
        let content = match arguments["limit"].as_u64() {
            Some(limit) => content
                .lines()
                .take(limit as usize)
                .collect::<Vec<_>>()
                .join("\n"),
            None => content,
        };

        Ok(serde_json::json!({
            "success": true,
            "path": path,
            "lines": total_lines,
            "content": content,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn ctx() -> InvocationContext {
        InvocationContext {
            session_id: "test".into(),
            iteration: 1,
            call_id: "call_1".into(),
        }
    }

    #[test]
    fn tool_definition() {
        let tool = ReadFileTool;
        assert_eq!(tool.name(), "read_file");
        let schema = tool.parameters_schema();
        assert_eq!(schema["required"], serde_json::json!(["path"]));
        assert!(schema["properties"]["path"].is_object());
    }

    #[tokio::test]
    async fn read_existing_file() {
        let dir = tempfile::tempdir().unwrap();
        let file_path = dir.path().join("test.txt");
        let mut f = std::fs::File::create(&file_path).unwrap();
        writeln!(f, "Hello, world!").unwrap();

        let result = ReadFileTool
            .execute(
                serde_json::json!({ "path": file_path.to_str().unwrap() }),
                &ctx(),
            )
            .await
            .unwrap();

        assert_eq!(result["success"], true);
        assert!(result["content"].as_str().unwrap().contains("Hello, world!"));
    }

    #[tokio::test]
    async fn limit_keeps_first_lines() {
        let dir = tempfile::tempdir().unwrap();
        let file_path = dir.path().join("lines.txt");
        std::fs::write(&file_path, "one\ntwo\nthree\n").unwrap();

        let result = ReadFileTool
            .execute(
                serde_json::json!({ "file_path": file_path.to_str().unwrap(), "limit": 2 }),
                &ctx(),
            )
            .await
            .unwrap();

        assert_eq!(result["content"], "one\ntwo");
        assert_eq!(result["lines"], 3);
    }

    #[tokio::test]
    async fn missing_file_is_reported_not_raised() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("nope.txt");

        let result = ReadFileTool
            .execute(serde_json::json!({ "path": missing.to_str().unwrap() }), &ctx())
            .await
            .unwrap();

        assert_eq!(result["success"], false);
        assert!(result["error"].as_str().unwrap().contains("Failed to read"));
    }

    #[tokio::test]
    async fn missing_path_argument() {
        let result = ReadFileTool.execute(serde_json::json!({}), &ctx()).await;
        assert!(matches!(result, Err(ToolError::InvalidArguments(_))));
    }
}
