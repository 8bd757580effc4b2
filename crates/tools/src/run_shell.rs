//! `run_shell` — execute a command through the platform shell.
//!
//! No allowlist and no sandbox: the command runs with the assistant's own
//! privileges. The only guard is a wall-clock timeout.

use std::time::Duration;

use async_trait::async_trait;
use majordome_core::error::ToolError;
use majordome_core::tool::{InvocationContext, Tool};
use tokio::process::Command;
use tracing::{debug, warn};

/// Output beyond this many bytes per stream is cut.
const MAX_OUTPUT_BYTES: usize = 16 * 1024;

pub struct RunShellTool {
    timeout: Duration,
}

impl RunShellTool {
    pub fn new(timeout_secs: u64) -> Self {
        Self {
            timeout: Duration::from_secs(timeout_secs),
        }
    }

    fn command(line: &str) -> Command {
        let mut cmd = if cfg!(target_os = "windows") {
            let mut c = Command::new("cmd");
            c.args(["/C", line]);
            c
        } else {
            let mut c = Command::new("sh");
            c.args(["-c", line]);
            c
        };
        cmd.kill_on_drop(true);
        cmd
    }
}

fn truncate(bytes: &[u8]) -> String {
    let text = String::from_utf8_lossy(bytes);
    if text.len() <= MAX_OUTPUT_BYTES {
        return text.trim_end().to_string();
    }
    let mut end = MAX_OUTPUT_BYTES;
    while !text.is_char_boundary(end) {
        end -= 1;
    }
    format!("{}\n[truncated]", &text[..end])
}

#[async_trait]
impl Tool for RunShellTool {
    fn name(&self) -> &str {
        "run_shell"
    }

    fn description(&self) -> &str {
        "Execute a shell command and return its exit code, stdout and stderr."
    }

    fn parameters_schema(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "command": {
                    "type": "string",
                    "description": "The shell command to execute"
                },
                "cwd": {
                    "type": "string",
                    "description": "Optional working directory"
                }
            },
            "required": ["command"]
        })
    }

    async fn execute(
        &self,
        arguments: serde_json::Value,
        context: &InvocationContext,
    ) -> Result<serde_json::Value, ToolError> {
        let line = arguments["command"]
            .as_str()
            .filter(|c| !c.trim().is_empty())
            .ok_or_else(|| ToolError::InvalidArguments("Missing 'command' argument".into()))?;

        debug!(command = %line, iteration = context.iteration, "Executing shell command");

        let mut cmd = Self::command(line);
        if let Some(cwd) = arguments["cwd"].as_str() {
            cmd.current_dir(cwd);
        }

        let output = match tokio::time::timeout(self.timeout, cmd.output()).await {
            Ok(result) => result.map_err(|e| ToolError::ExecutionFailed {
                tool_name: "run_shell".into(),
                reason: e.to_string(),
            })?,
            Err(_) => {
                return Err(ToolError::Timeout {
                    tool_name: "run_shell".into(),
                    timeout_secs: self.timeout.as_secs(),
                });
            }
        };

        let exit_code = output.status.code().unwrap_or(-1);
        let success = output.status.success();
        if !success {
            warn!(command = %line, exit_code, "Command failed");
        }

        Ok(serde_json::json!({
            "success": success,
            "exit_code": exit_code,
            "stdout": truncate(&output.stdout),
            "stderr": truncate(&output.stderr),
        }))
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
    fn schema_requires_command() {
        let tool = RunShellTool::new(30);
        assert_eq!(tool.name(), "run_shell");
        assert_eq!(tool.positional_argument(), "command");
        let schema = tool.parameters_schema();
        assert_eq!(schema["required"], serde_json::json!(["command"]));
    }

    #[tokio::test]
    async fn execute_echo() {
        let tool = RunShellTool::new(30);
        let result = tool
            .execute(serde_json::json!({"command": "echo hello"}), &ctx())
            .await
            .unwrap();
        assert_eq!(result["success"], true);
        assert_eq!(result["exit_code"], 0);
        assert!(result["stdout"].as_str().unwrap().contains("hello"));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn failing_command_reports_exit_code() {
        let tool = RunShellTool::new(30);
        let result = tool
            .execute(serde_json::json!({"command": "exit 3"}), &ctx())
            .await
            .unwrap();
        assert_eq!(result["success"], false);
        assert_eq!(result["exit_code"], 3);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn runs_in_requested_directory() {
        let dir = tempfile::tempdir().unwrap();
        let tool = RunShellTool::new(30);
        let result = tool
            .execute(
                serde_json::json!({"command": "pwd", "cwd": dir.path().to_str().unwrap()}),
                &ctx(),
            )
            .await
            .unwrap();
        let stdout = result["stdout"].as_str().unwrap();
        let expected = dir.path().file_name().unwrap().to_str().unwrap();
        assert!(stdout.contains(expected));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn slow_command_times_out() {
        let tool = RunShellTool::new(1);
        let result = tool
            .execute(serde_json::json!({"command": "sleep 5"}), &ctx())
            .await;
        assert!(matches!(result, Err(ToolError::Timeout { timeout_secs: 1, .. })));
    }

    #[tokio::test]
    async fn missing_command() {
        let tool = RunShellTool::new(30);
        let result = tool.execute(serde_json::json!({}), &ctx()).await;
        assert!(matches!(result, Err(ToolError::InvalidArguments(_))));
    }

    #[test]
    fn long_output_is_truncated() {
        let big = vec![b'x'; MAX_OUTPUT_BYTES + 10];
        let text = truncate(&big);
        assert!(text.ends_with("[truncated]"));
    }
}
