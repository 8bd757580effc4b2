//! The agent reasoning loop implementation.

use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Instant;

use chrono::Utc;
use futures::FutureExt;
use majordome_config::AgentConfig;
use majordome_core::event::{DomainEvent, EventBus};
use majordome_core::message::{Message, MessageToolCall, Transcript};
use majordome_core::tool::{InvocationContext, ToolCall, ToolRegistry};
use majordome_core::{Error, ToolError};
use majordome_providers::ProviderChain;
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::extract::{Extraction, ToolCallExtractor};
use crate::normalize::normalize_arguments;
use crate::prompt::build_system_message;

/// Per-run knobs; unset fields fall back to the loop's configuration.
#[derive(Debug, Clone, Default)]
pub struct RunOptions {
    /// Iteration ceiling for this run
    pub max_iterations: Option<u32>,

    /// Restrict the run to one named backend of the chain
    pub provider_override: Option<String>,

    /// Replace the configured system prompt (the tool catalogue is still appended)
    pub system_prompt_override: Option<String>,
}

/// How a run ended.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum RunStatus {
    /// The model answered in natural language.
    Answered { answer: String },

    /// The model emitted a finish signal.
    Finished { summary: String },

    /// The provider chain was exhausted.
    Failed { error: String },

    /// The iteration ceiling was reached without an answer.
    MaxIterationsExceeded { max: u32 },
}

impl RunStatus {
    pub fn label(&self) -> &'static str {
        match self {
            RunStatus::Answered { .. } => "answered",
            RunStatus::Finished { .. } => "finished",
            RunStatus::Failed { .. } => "failed",
            RunStatus::MaxIterationsExceeded { .. } => "max_iterations_exceeded",
        }
    }
}

/// The result of [`AgentLoop::run`].
#[derive(Debug, Clone)]
pub struct RunOutcome {
    pub status: RunStatus,

    /// Everything exchanged during the run, system message first
    pub transcript: Transcript,

    /// Iterations started, including the one that ended the run
    pub iterations_used: u32,
}

impl RunOutcome {
    pub fn success(&self) -> bool {
        matches!(
            self.status,
            RunStatus::Answered { .. } | RunStatus::Finished { .. }
        )
    }

    /// The final answer, or the finish summary.
    pub fn answer(&self) -> Option<&str> {
        match &self.status {
            RunStatus::Answered { answer } => Some(answer),
            RunStatus::Finished { summary } => Some(summary),
            _ => None,
        }
    }

    pub fn error(&self) -> Option<String> {
        match &self.status {
            RunStatus::Failed { error } => Some(error.clone()),
            RunStatus::MaxIterationsExceeded { max } => {
                Some(format!("Maximum of {max} iterations reached without an answer"))
            }
            _ => None,
        }
    }
}

/// What a forced-synthesis call produced.
enum Synthesis {
    Answer(String),
    Finish { summary: String, raw: String },
}

/// The core agent loop that orchestrates LLM calls and tool execution.
///
/// Holds only shared, immutable collaborators; every call to [`run`](Self::run)
/// owns its own transcript, so one loop can serve concurrent runs.
pub struct AgentLoop {
    chain: Arc<ProviderChain>,

    tools: Arc<ToolRegistry>,

    system_prompt: String,

    /// Instruction appended for the forced-synthesis call
    synthesis_prompt: String,

    max_iterations: u32,

    event_bus: Option<Arc<EventBus>>,
}

impl AgentLoop {
    /// Create a loop with the default agent settings.
    pub fn new(chain: Arc<ProviderChain>, tools: Arc<ToolRegistry>) -> Self {
        Self::from_config(&AgentConfig::default(), chain, tools)
    }

    pub fn from_config(
        config: &AgentConfig,
        chain: Arc<ProviderChain>,
        tools: Arc<ToolRegistry>,
    ) -> Self {
        Self {
            chain,
            tools,
            system_prompt: config.system_prompt.clone(),
            synthesis_prompt: config.synthesis_prompt.clone(),
            max_iterations: config.max_iterations,
            event_bus: None,
        }
    }

    pub fn with_max_iterations(mut self, max: u32) -> Self {
        self.max_iterations = max;
        self
    }

    pub fn with_system_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.system_prompt = prompt.into();
        self
    }

    pub fn with_event_bus(mut self, bus: Arc<EventBus>) -> Self {
        self.event_bus = Some(bus);
        self
    }

    pub fn tools(&self) -> &ToolRegistry {
        &self.tools
    }

    /// Run one request to completion.
    ///
    /// Every runtime failure (exhausted chain, tool errors, iteration ceiling)
    /// is reported through [`RunStatus`]; `Err` is reserved for invalid
    /// options.
    pub async fn run(&self, user_message: &str, options: RunOptions) -> Result<RunOutcome, Error> {
        let max_iterations = options.max_iterations.unwrap_or(self.max_iterations);
        if max_iterations == 0 {
            return Err(Error::config("max_iterations must be greater than 0"));
        }

        let pinned;
        let chain: &ProviderChain = match &options.provider_override {
            Some(name) => {
                pinned = self.chain.pinned(name).ok_or_else(|| {
                    Error::config(format!(
                        "Unknown provider '{name}' (available: {})",
                        self.chain.names().join(", ")
                    ))
                })?;
                &pinned
            }
            None => &self.chain,
        };

        let prompt = options
            .system_prompt_override
            .as_deref()
            .unwrap_or(&self.system_prompt);

        let mut transcript = Transcript::new();
        transcript.push(Message::system(build_system_message(prompt, &self.tools)));
        transcript.push(Message::user(user_message));

        info!(
            session = %transcript.id,
            max_iterations,
            providers = chain.len(),
            "Starting agent run"
        );

        let definitions = self.tools.definitions();
        let extractor = ToolCallExtractor::new(&self.tools);

        for iteration in 1..=max_iterations {
            debug!(session = %transcript.id, iteration, "Agent loop iteration");

            let reply = match chain.call(transcript.messages(), &definitions).await {
                Ok(reply) => reply,
                Err(e) => {
                    warn!(session = %transcript.id, iteration, error = %e, "Provider chain failed");
                    let status = RunStatus::Failed {
                        error: e.to_string(),
                    };
                    return Ok(self.complete(status, transcript, iteration));
                }
            };

            let content = reply.message.content.clone();
            let calls = match extractor.extract(&content, reply.tool_calls()) {
                Extraction::Finish { summary } => {
                    transcript.push(Message::assistant(content));
                    return Ok(self.complete(RunStatus::Finished { summary }, transcript, iteration));
                }
                Extraction::Calls(calls) if calls.is_empty() => {
                    transcript.push(Message::assistant(&content));
                    let status = RunStatus::Answered { answer: content };
                    return Ok(self.complete(status, transcript, iteration));
                }
                Extraction::Calls(calls) => calls,
            };

            let calls: Vec<ToolCall> = calls
                .into_iter()
                .map(|c| ToolCall {
                    arguments: normalize_arguments(c.arguments),
                    ..c
                })
                .collect();

            info!(
                session = %transcript.id,
                iteration,
                provider = %reply.provider_id,
                calls = calls.len(),
                "Dispatching tool calls"
            );

            transcript.push(Message::assistant_with_calls(
                content,
                calls.iter().map(to_wire).collect(),
            ));

            let mut any_succeeded = false;
            for call in &calls {
                any_succeeded |= self.dispatch(call, &mut transcript, iteration).await;
            }

            if !any_succeeded {
                debug!(session = %transcript.id, iteration, "No tool succeeded, skipping synthesis");
                continue;
            }

            match self.synthesize(chain, &transcript, &extractor).await {
                Some(Synthesis::Answer(answer)) => {
                    transcript.push(Message::assistant(&answer));
                    return Ok(self.complete(RunStatus::Answered { answer }, transcript, iteration));
                }
                Some(Synthesis::Finish { summary, raw }) => {
                    transcript.push(Message::assistant(raw));
                    return Ok(self.complete(RunStatus::Finished { summary }, transcript, iteration));
                }
                None => {}
            }
        }

        warn!(session = %transcript.id, max_iterations, "Max iterations reached");
        Ok(self.complete(
            RunStatus::MaxIterationsExceeded {
                max: max_iterations,
            },
            transcript,
            max_iterations,
        ))
    }

    /// Execute one call and append its result. Returns whether the handler
    /// was found and returned `Ok`.
    async fn dispatch(&self, call: &ToolCall, transcript: &mut Transcript, iteration: u32) -> bool {
        let Some(tool) = self.tools.get(&call.name) else {
            warn!(tool = %call.name, iteration, "Model requested an unknown tool");
            let error = ToolError::NotFound(call.name.clone());
            transcript.push(Message::tool_result(
                &call.id,
                &call.name,
                error_payload(&format!("Unknown tool '{}': {error}", call.name)),
            ));
            self.publish_tool(&call.name, false, 0);
            return false;
        };

        let context = InvocationContext {
            session_id: transcript.id.clone(),
            iteration,
            call_id: call.id.clone(),
        };

        let start = Instant::now();
        let outcome = AssertUnwindSafe(tool.execute(call.arguments.clone(), &context))
            .catch_unwind()
            .await;
        let duration_ms = start.elapsed().as_millis() as u64;

        let (content, ok) = match outcome {
            Ok(Ok(value)) => (value.to_string(), true),
            Ok(Err(e)) => {
                warn!(tool = %call.name, error = %e, "Tool execution failed");
                (error_payload(&e.to_string()), false)
            }
            Err(panic) => {
                let error = ToolError::Panicked {
                    tool_name: call.name.clone(),
                    reason: panic_message(panic.as_ref()),
                };
                warn!(tool = %call.name, error = %error, "Tool panicked");
                (error_payload(&error.to_string()), false)
            }
        };

        debug!(tool = %call.name, duration_ms, success = ok, "Tool finished");
        transcript.push(Message::tool_result(&call.id, &call.name, content));
        self.publish_tool(&call.name, ok, duration_ms);
        ok
    }

    /// Ask for a plain-language answer from the tool results, without tools.
    ///
    /// The instruction is sent on a copy of the messages and never enters
    /// the transcript.
    async fn synthesize(
        &self,
        chain: &ProviderChain,
        transcript: &Transcript,
        extractor: &ToolCallExtractor<'_>,
    ) -> Option<Synthesis> {
        let mut messages = transcript.messages().to_vec();
        messages.push(Message::user(&self.synthesis_prompt));

        let reply = match chain.call(&messages, &[]).await {
            Ok(reply) => reply,
            Err(e) => {
                warn!(session = %transcript.id, error = %e, "Forced synthesis failed");
                return None;
            }
        };

        let content = reply.message.content.clone();
        match extractor.extract(&content, reply.tool_calls()) {
            Extraction::Finish { summary } => Some(Synthesis::Finish {
                summary,
                raw: content,
            }),
            Extraction::Calls(calls) if calls.is_empty() && !content.trim().is_empty() => {
                Some(Synthesis::Answer(content))
            }
            Extraction::Calls(_) => {
                debug!(session = %transcript.id, "Synthesis reply was not a plain answer");
                None
            }
        }
    }

    fn complete(&self, status: RunStatus, transcript: Transcript, iterations_used: u32) -> RunOutcome {
        info!(
            session = %transcript.id,
            outcome = status.label(),
            iterations = iterations_used,
            "Agent run completed"
        );
        if let Some(bus) = &self.event_bus {
            bus.publish(DomainEvent::RunCompleted {
                session_id: transcript.id.clone(),
                outcome: status.label().to_string(),
                iterations: iterations_used,
                timestamp: Utc::now(),
            });
        }
        RunOutcome {
            status,
            transcript,
            iterations_used,
        }
    }

    fn publish_tool(&self, tool_name: &str, success: bool, duration_ms: u64) {
        if let Some(bus) = &self.event_bus {
            bus.publish(DomainEvent::ToolExecuted {
                tool_name: tool_name.to_string(),
                success,
                duration_ms,
                timestamp: Utc::now(),
            });
        }
    }
}

fn to_wire(call: &ToolCall) -> MessageToolCall {
    MessageToolCall {
        id: call.id.clone(),
        name: call.name.clone(),
        arguments: call.arguments.to_string(),
    }
}

fn error_payload(message: &str) -> String {
    serde_json::json!({ "success": false, "error": message }).to_string()
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".into()
    }
}
