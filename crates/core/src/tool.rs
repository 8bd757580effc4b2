//! Tool trait — the abstraction over assistant capabilities.
//!
//! Tools are what give the assistant the ability to act in the world:
//! tell the time, run shell commands, read/write files, and so on.
//! A tool returns an arbitrary JSON value; the agent loop never inspects it
//! beyond serializing it into a tool-result message.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use crate::error::ToolError;
use crate::provider::ToolDefinition;

/// A request to execute a tool.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolCall {
    /// Unique call ID (the LLM's tool_call.id, or synthesized)
    pub id: String,

    /// Name of the tool to execute
    pub name: String,

    /// Arguments as a JSON value (an object by convention)
    pub arguments: serde_json::Value,
}

/// Per-invocation information handed to a tool alongside its arguments.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InvocationContext {
    /// The transcript this call belongs to
    pub session_id: String,

    /// Agent loop iteration that issued the call (1-based)
    pub iteration: u32,

    /// The call ID being executed
    pub call_id: String,
}

/// The core Tool trait.
///
/// Each tool implements this trait and is registered in the [`ToolRegistry`]
/// that the agent loop dispatches through.
#[async_trait]
pub trait Tool: Send + Sync {
    /// The unique name of this tool (e.g., "get_time", "read_file").
    fn name(&self) -> &str;

    /// A description of what this tool does (sent to the LLM).
    fn description(&self) -> &str;

    /// JSON Schema describing this tool's parameters.
    fn parameters_schema(&self) -> serde_json::Value;

    /// The argument a bare positional string maps to, as in `read_file("a.txt")`.
    fn positional_argument(&self) -> &str {
        default_positional_argument(self.name())
    }

    /// Execute the tool with the given arguments.
    async fn execute(
        &self,
        arguments: serde_json::Value,
        context: &InvocationContext,
    ) -> std::result::Result<serde_json::Value, ToolError>;

    /// Convert this tool into a ToolDefinition for sending to the LLM.
    fn to_definition(&self) -> ToolDefinition {
        ToolDefinition {
            name: self.name().to_string(),
            description: self.description().to_string(),
            parameters: self.parameters_schema(),
        }
    }
}

/// Conventional positional argument for a tool, guessed from its name.
pub fn default_positional_argument(tool_name: &str) -> &'static str {
    let name = tool_name.to_ascii_lowercase();
    let has = |needle: &str| name.contains(needle);

    if has("shell") || has("bash") || has("command") || has("exec") || has("cmd") {
        "command"
    } else if has("search") || has("recall") || has("query") {
        "query"
    } else if has("url") || has("http") || has("fetch") || has("browse") {
        "url"
    } else if has("file") || has("dir") || has("folder") || has("path") || has("image") {
        "path"
    } else {
        "input"
    }
}

/// A registry of available tools.
///
/// Built once at startup and then shared immutably (`Arc<ToolRegistry>`)
/// between concurrent agent runs. The agent loop uses it to:
/// 1. Get tool definitions to send to the LLM
/// 2. Recognize tool names in free-text output
/// 3. Look up and execute tools when the LLM requests them
pub struct ToolRegistry {
    tools: BTreeMap<String, Box<dyn Tool>>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self {
            tools: BTreeMap::new(),
        }
    }

    /// Register a tool. Replaces any existing tool with the same name.
    pub fn register(&mut self, tool: Box<dyn Tool>) {
        let name = tool.name().to_string();
        self.tools.insert(name, tool);
    }

    /// Get a tool by name.
    pub fn get(&self, name: &str) -> Option<&dyn Tool> {
        self.tools.get(name).map(|t| t.as_ref())
    }

    /// Whether a tool with this exact name is registered.
    pub fn contains(&self, name: &str) -> bool {
        self.tools.contains_key(name)
    }

    /// Positional argument of a registered tool.
    pub fn positional_argument(&self, name: &str) -> Option<&str> {
        self.get(name).map(|t| t.positional_argument())
    }

    /// Get all tool definitions (for sending to the LLM), sorted by name.
    pub fn definitions(&self) -> Vec<ToolDefinition> {
        self.tools.values().map(|t| t.to_definition()).collect()
    }

    /// Execute a tool call.
    pub async fn execute(
        &self,
        call: &ToolCall,
        context: &InvocationContext,
    ) -> std::result::Result<serde_json::Value, ToolError> {
        let tool = self
            .tools
            .get(&call.name)
            .ok_or_else(|| ToolError::NotFound(call.name.clone()))?;
        tool.execute(call.arguments.clone(), context).await
    }

    /// List all registered tool names, sorted.
    pub fn names(&self) -> Vec<&str> {
        self.tools.keys().map(|s| s.as_str()).collect()
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }
}

impl Default for ToolRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// A simple test tool for unit tests.
    struct EchoTool;

    #[async_trait]
    impl Tool for EchoTool {
        fn name(&self) -> &str { "echo" }
        fn description(&self) -> &str { "Echoes back the input" }
        fn parameters_schema(&self) -> serde_json::Value {
            serde_json::json!({
                "type": "object",
                "properties": {
                    "text": { "type": "string" }
                },
                "required": ["text"]
            })
        }
        fn positional_argument(&self) -> &str { "text" }
        async fn execute(
            &self,
            arguments: serde_json::Value,
            _context: &InvocationContext,
        ) -> std::result::Result<serde_json::Value, ToolError> {
            let text = arguments["text"].as_str().unwrap_or("").to_string();
            Ok(serde_json::json!({ "success": true, "message": text }))
        }
    }

    fn ctx() -> InvocationContext {
        InvocationContext {
            session_id: "s1".into(),
            iteration: 1,
            call_id: "call_1".into(),
        }
    }

    #[test]
    fn registry_register_and_lookup() {
        let mut registry = ToolRegistry::new();
        registry.register(Box::new(EchoTool));
        assert!(registry.get("echo").is_some());
        assert!(registry.contains("echo"));
        assert!(!registry.contains("nonexistent"));
        assert_eq!(registry.positional_argument("echo"), Some("text"));
        assert_eq!(registry.positional_argument("nonexistent"), None);
    }

    #[test]
    fn registry_definitions() {
        let mut registry = ToolRegistry::new();
        registry.register(Box::new(EchoTool));
        let defs = registry.definitions();
        assert_eq!(defs.len(), 1);
        assert_eq!(defs[0].name, "echo");
    }

    #[tokio::test]
    async fn registry_execute_tool() {
        let mut registry = ToolRegistry::new();
        registry.register(Box::new(EchoTool));

        let call = ToolCall {
            id: "call_1".into(),
            name: "echo".into(),
            arguments: serde_json::json!({"text": "hello world"}),
        };
        let result = registry.execute(&call, &ctx()).await.unwrap();
        assert_eq!(result["success"], true);
        assert_eq!(result["message"], "hello world");
    }

    #[tokio::test]
    async fn registry_execute_missing_tool() {
        let registry = ToolRegistry::new();
        let call = ToolCall {
            id: "call_1".into(),
            name: "nonexistent".into(),
            arguments: serde_json::json!({}),
        };
        let err = registry.execute(&call, &ctx()).await.unwrap_err();
        assert!(matches!(err, ToolError::NotFound(_)));
    }

    #[test]
    fn positional_argument_heuristics() {
        assert_eq!(default_positional_argument("run_shell"), "command");
        assert_eq!(default_positional_argument("read_file"), "path");
        assert_eq!(default_positional_argument("list_files"), "path");
        assert_eq!(default_positional_argument("web_search"), "query");
        assert_eq!(default_positional_argument("fetch_url"), "url");
        assert_eq!(default_positional_argument("get_weather"), "input");
    }
}
