//! Shared test helpers: scripted providers and stub tools.

use std::collections::VecDeque;
use std::sync::Mutex;

use async_trait::async_trait;
use majordome_core::error::{ProviderError, ToolError};
use majordome_core::message::{Message, MessageToolCall};
use majordome_core::provider::{Provider, ProviderRequest, ProviderResponse};
use majordome_core::tool::{InvocationContext, Tool, ToolRegistry};

/// A provider replaying a fixed script, one step per call.
///
/// Runs out gracefully: once the script is empty every call fails.
pub struct SequentialMockProvider {
    name: String,
    script: Mutex<VecDeque<Result<ProviderResponse, ProviderError>>>,
    requests: Mutex<Vec<ProviderRequest>>,
}

impl SequentialMockProvider {
    pub fn new(name: &str, script: Vec<Result<ProviderResponse, ProviderError>>) -> Self {
        Self {
            name: name.into(),
            script: Mutex::new(script.into()),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn call_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }

    pub fn requests(&self) -> Vec<ProviderRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl Provider for SequentialMockProvider {
    fn name(&self) -> &str {
        &self.name
    }

    async fn complete(&self, request: ProviderRequest) -> Result<ProviderResponse, ProviderError> {
        self.requests.lock().unwrap().push(request);
        self.script
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(ProviderError::Network("script exhausted".into())))
    }
}

/// A provider answering each request through a closure.
pub struct FnProvider<F> {
    name: String,
    respond: F,
    calls: Mutex<usize>,
}

impl<F> FnProvider<F>
where
    F: Fn(&ProviderRequest) -> Result<ProviderResponse, ProviderError> + Send + Sync,
{
    pub fn new(name: &str, respond: F) -> Self {
        Self {
            name: name.into(),
            respond,
            calls: Mutex::new(0),
        }
    }

    pub fn call_count(&self) -> usize {
        *self.calls.lock().unwrap()
    }
}

#[async_trait]
impl<F> Provider for FnProvider<F>
where
    F: Fn(&ProviderRequest) -> Result<ProviderResponse, ProviderError> + Send + Sync,
{
    fn name(&self) -> &str {
        &self.name
    }

    async fn complete(&self, request: ProviderRequest) -> Result<ProviderResponse, ProviderError> {
        *self.calls.lock().unwrap() += 1;
        (self.respond)(&request)
    }
}

pub fn text(content: &str) -> Result<ProviderResponse, ProviderError> {
    Ok(ProviderResponse {
        message: Message::assistant(content),
        usage: None,
        model: "mock-model".into(),
    })
}

pub fn native_calls(calls: Vec<MessageToolCall>) -> Result<ProviderResponse, ProviderError> {
    Ok(ProviderResponse {
        message: Message::assistant_with_calls("", calls),
        usage: None,
        model: "mock-model".into(),
    })
}

pub fn tool_call(id: &str, name: &str, args: serde_json::Value) -> MessageToolCall {
    MessageToolCall {
        id: id.into(),
        name: name.into(),
        arguments: args.to_string(),
    }
}

/// A tool that echoes its arguments back.
pub struct StubTool {
    name: String,
}

#[async_trait]
impl Tool for StubTool {
    fn name(&self) -> &str {
        &self.name
    }

    fn description(&self) -> &str {
        "Stub tool for tests"
    }

    fn parameters_schema(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "properties": { "input": { "type": "string" } }
        })
    }

    async fn execute(
        &self,
        arguments: serde_json::Value,
        _context: &InvocationContext,
    ) -> Result<serde_json::Value, ToolError> {
        Ok(serde_json::json!({ "success": true, "tool": self.name, "echo": arguments }))
    }
}

/// A tool whose handler always errors.
pub struct FailingTool;

#[async_trait]
impl Tool for FailingTool {
    fn name(&self) -> &str {
        "flaky"
    }

    fn description(&self) -> &str {
        "Always fails"
    }

    fn parameters_schema(&self) -> serde_json::Value {
        serde_json::json!({"type": "object", "properties": {}})
    }

    async fn execute(
        &self,
        _arguments: serde_json::Value,
        _context: &InvocationContext,
    ) -> Result<serde_json::Value, ToolError> {
        Err(ToolError::ExecutionFailed {
            tool_name: "flaky".into(),
            reason: "disk on fire".into(),
        })
    }
}

/// A tool whose handler panics.
pub struct PanickingTool;

#[async_trait]
impl Tool for PanickingTool {
    fn name(&self) -> &str {
        "boom"
    }

    fn description(&self) -> &str {
        "Always panics"
    }

    fn parameters_schema(&self) -> serde_json::Value {
        serde_json::json!({"type": "object", "properties": {}})
    }

    async fn execute(
        &self,
        _arguments: serde_json::Value,
        _context: &InvocationContext,
    ) -> Result<serde_json::Value, ToolError> {
        panic!("handler exploded")
    }
}

/// A registry of stub tools with the given names.
pub fn registry_with(names: &[&str]) -> ToolRegistry {
    let mut registry = ToolRegistry::new();
    for name in names {
        registry.register(Box::new(StubTool {
            name: (*name).to_string(),
        }));
    }
    registry
}
