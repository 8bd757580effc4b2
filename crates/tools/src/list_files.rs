//! `list_files` — list the entries of a directory.

use async_trait::async_trait;
use majordome_core::error::ToolError;
use majordome_core::tool::{InvocationContext, Tool};

use crate::path_argument;

/// Listings are capped to keep tool results small enough for the context window.
const MAX_ENTRIES: usize = 500;

pub struct ListFilesTool;

#[async_trait]
impl Tool for ListFilesTool {
    fn name(&self) -> &str {
        "list_files"
    }

    fn description(&self) -> &str {
        "List files and sub-directories in a directory (defaults to the current directory)."
    }

    fn parameters_schema(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "path": {
                    "type": "string",
                    "description": "Directory to list"
                }
            }
        })
    }

    async fn execute(
        &self,
        arguments: serde_json::Value,
        _context: &InvocationContext,
    ) -> Result<serde_json::Value, ToolError> {
        let path = path_argument(&arguments).unwrap_or(".");

        let mut dir = match tokio::fs::read_dir(path).await {
            Ok(dir) => dir,
            Err(e) => {
                return Ok(serde_json::json!({
                    "success": false,
                    "error": format!("Failed to list {path}: {e}"),
                }));
            }
        };

        let mut entries = Vec::new();
        let mut truncated = false;
        loop {
            let entry = match dir.next_entry().await {
                Ok(Some(entry)) => entry,
                Ok(None) => break,
                Err(e) => {
                    return Err(ToolError::ExecutionFailed {
                        tool_name: "list_files".into(),
                        reason: e.to_string(),
                    });
                }
            };
            if entries.len() == MAX_ENTRIES {
                truncated = true;
                break;
            }
            let is_dir = entry.file_type().await.map(|t| t.is_dir()).unwrap_or(false);
            let mut name = entry.file_name().to_string_lossy().into_owned();
            if is_dir {
                name.push('/');
            }
            entries.push(name);
        }
        entries.sort();

        Ok(serde_json::json!({
            "success": true,
            "path": path,
            "count": entries.len(),
            "truncated": truncated,
            "entries": entries,
        }))
    }
}
