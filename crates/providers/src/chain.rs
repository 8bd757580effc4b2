//! Provider chain — ordered fallback across backends with per-backend timeouts.
//!
//! Each backend is tried once, in order. A failure, timeout, or empty reply
//! falls through to the next entry; the first usable reply wins. The chain
//! never parses reply text: free-text tool intent is the agent's concern.

use chrono::Utc;
use majordome_core::error::ProviderError;
use majordome_core::event::{DomainEvent, EventBus};
use majordome_core::message::{Message, MessageToolCall, Role};
use majordome_core::provider::{
    CallingConvention, Provider, ProviderRequest, ToolDefinition, Usage,
};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(120);

const DEFAULT_SYSTEM_PROMPT: &str =
    "You are a helpful personal assistant. Answer concisely, in the user's language.";

/// The reply of the backend that answered.
#[derive(Debug, Clone)]
pub struct ProviderResult {
    /// Name of the chain entry that answered
    pub provider_id: String,

    /// Model reported by the backend
    pub model_id: String,

    /// The assistant message, including any structured tool calls
    pub message: Message,

    pub usage: Option<Usage>,
}

impl ProviderResult {
    /// Structured tool calls returned by the backend (empty for text backends).
    pub fn tool_calls(&self) -> &[MessageToolCall] {
        &self.message.tool_calls
    }

    pub fn content(&self) -> &str {
        &self.message.content
    }
}

/// A single entry in the chain.
#[derive(Clone)]
struct ChainEntry {
    provider: Arc<dyn Provider>,
    model: String,
    calling: CallingConvention,
    timeout: Duration,
}

/// Ordered list of backends tried until one returns a usable result.
///
/// Cheap to clone: entries share their providers through `Arc`.
#[derive(Clone)]
pub struct ProviderChain {
    entries: Vec<ChainEntry>,
    default_system_prompt: String,
    temperature: f32,
    max_tokens: Option<u32>,
    event_bus: Option<Arc<EventBus>>,
}

impl ProviderChain {
    /// Create a new chain with no entries.
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
            default_system_prompt: DEFAULT_SYSTEM_PROMPT.into(),
            temperature: 0.1,
            max_tokens: None,
            event_bus: None,
        }
    }

    /// Append a backend with a custom timeout.
    pub fn add(
        mut self,
        provider: Arc<dyn Provider>,
        model: impl Into<String>,
        calling: CallingConvention,
        timeout: Duration,
    ) -> Self {
        self.entries.push(ChainEntry {
            provider,
            model: model.into(),
            calling,
            timeout,
        });
        self
    }

    /// Append a backend with the default timeout (120s).
    pub fn add_default(
        self,
        provider: Arc<dyn Provider>,
        model: impl Into<String>,
        calling: CallingConvention,
    ) -> Self {
        self.add(provider, model, calling, DEFAULT_TIMEOUT)
    }

    /// System prompt injected when the transcript carries none.
    pub fn with_default_system_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.default_system_prompt = prompt.into();
        self
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    pub fn with_max_tokens(mut self, max: u32) -> Self {
        self.max_tokens = Some(max);
        self
    }

    /// Publish a `ProviderAttempted` event for every attempt.
    pub fn with_event_bus(mut self, bus: Arc<EventBus>) -> Self {
        self.event_bus = Some(bus);
        self
    }

    /// A one-entry chain restricted to the named backend, if present.
    pub fn pinned(&self, name: &str) -> Option<ProviderChain> {
        let entry = self.entries.iter().find(|e| e.provider.name() == name)?;
        Some(Self {
            entries: vec![entry.clone()],
            ..self.clone()
        })
    }

    /// Entry names in fallback order.
    pub fn names(&self) -> Vec<&str> {
        self.entries.iter().map(|e| e.provider.name()).collect()
    }

    /// Number of providers in the chain.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the chain is empty.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Keep a caller-supplied system message verbatim; inject the default otherwise.
    fn prepare_messages(&self, transcript: &[Message]) -> Vec<Message> {
        if transcript.iter().any(|m| m.role == Role::System) {
            return transcript.to_vec();
        }
        let mut messages = Vec::with_capacity(transcript.len() + 1);
        messages.push(Message::system(&self.default_system_prompt));
        messages.extend_from_slice(transcript);
        messages
    }

    /// Try each backend in order until one returns a usable reply.
    ///
    /// `tools` is forwarded only to structured backends. Passing an empty
    /// slice asks every backend for plain text.
    pub async fn call(
        &self,
        transcript: &[Message],
        tools: &[ToolDefinition],
    ) -> Result<ProviderResult, ProviderError> {
        if self.entries.is_empty() {
            return Err(ProviderError::NotConfigured(
                "No providers in chain".into(),
            ));
        }

        let messages = self.prepare_messages(transcript);
        let mut last_error = String::new();

        for (i, entry) in self.entries.iter().enumerate() {
            let provider_name = entry.provider.name().to_string();

            info!(
                provider = %provider_name,
                model = %entry.model,
                attempt = i + 1,
                total = self.entries.len(),
                "Chain: trying provider"
            );

            let request = ProviderRequest {
                model: entry.model.clone(),
                messages: messages.clone(),
                temperature: self.temperature,
                max_tokens: self.max_tokens,
                tools: match entry.calling {
                    CallingConvention::Structured => tools.to_vec(),
                    CallingConvention::Text => Vec::new(),
                },
            };

            let start = Instant::now();
            let outcome =
                match tokio::time::timeout(entry.timeout, entry.provider.complete(request)).await {
                    Ok(Ok(response))
                        if response.message.content.trim().is_empty()
                            && response.message.tool_calls.is_empty() =>
                    {
                        Err(ProviderError::EmptyResponse(provider_name.clone()))
                    }
                    Ok(Ok(response)) => Ok(response),
                    Ok(Err(e)) => Err(e),
                    Err(_) => Err(ProviderError::Timeout(format!(
                        "Provider '{}' timed out after {}s",
                        provider_name,
                        entry.timeout.as_secs()
                    ))),
                };
            let duration_ms = start.elapsed().as_millis() as u64;

            self.publish(&provider_name, &entry.model, i + 1, outcome.is_ok(), duration_ms);

            match outcome {
                Ok(response) => {
                    debug!(
                        provider = %provider_name,
                        duration_ms,
                        tool_calls = response.message.tool_calls.len(),
                        "Chain: provider answered"
                    );
                    return Ok(ProviderResult {
                        provider_id: provider_name,
                        model_id: response.model,
                        message: response.message,
                        usage: response.usage,
                    });
                }
                Err(e) => {
                    warn!(
                        provider = %provider_name,
                        error = %e,
                        "Chain: provider failed, trying next"
                    );
                    last_error = e.to_string();
                }
            }
        }

        Err(ProviderError::Exhausted {
            attempts: self.entries.len(),
            last_error,
        })
    }

    fn publish(&self, provider: &str, model: &str, attempt: usize, success: bool, duration_ms: u64) {
        if let Some(bus) = &self.event_bus {
            bus.publish(DomainEvent::ProviderAttempted {
                provider: provider.to_string(),
                model: model.to_string(),
                attempt,
                success,
                duration_ms,
                timestamp: Utc::now(),
            });
        }
    }

    /// Reachability of every backend, in chain order.
    pub async fn health_check(&self) -> Vec<(String, bool)> {
        let mut report = Vec::with_capacity(self.entries.len());
        for entry in &self.entries {
            let healthy = matches!(
                tokio::time::timeout(entry.timeout, entry.provider.health_check()).await,
                Ok(Ok(true))
            );
            report.push((entry.provider.name().to_string(), healthy));
        }
        report
    }
}

impl Default for ProviderChain {
    fn default() -> Self {
        Self::new()
    }
}
