//! Native Ollama provider (`POST /api/chat`).
//!
//! Local models are usually driven as text backends, but when tools are sent
//! and the model supports them Ollama answers with `tool_calls` whose
//! arguments are JSON objects; those are re-serialized to strings here.

use async_trait::async_trait;
use majordome_core::error::ProviderError;
use majordome_core::message::{Message, MessageToolCall};
use majordome_core::provider::{Provider, ProviderRequest, ProviderResponse, Usage};
use serde::Deserialize;
use tracing::{debug, warn};

use crate::openai_compat::{role_str, status_error};

const CONTEXT_WINDOW: u32 = 4096;

/// A provider talking to a local (or remote) Ollama daemon.
pub struct OllamaProvider {
    name: String,
    base_url: String,
    client: reqwest::Client,
}

impl OllamaProvider {
    pub fn new(name: impl Into<String>, base_url: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            client: reqwest::Client::new(),
        }
    }

    fn request_body(request: &ProviderRequest) -> serde_json::Value {
        let messages: Vec<serde_json::Value> = request
            .messages
            .iter()
            .map(|m| {
                let mut msg = serde_json::json!({
                    "role": role_str(m.role),
                    "content": m.content,
                });
                if !m.tool_calls.is_empty() {
                    msg["tool_calls"] = m
                        .tool_calls
                        .iter()
                        .map(|tc| {
                            serde_json::json!({
                                "function": {
                                    "name": tc.name,
                                    "arguments": serde_json::from_str::<serde_json::Value>(&tc.arguments)
                                        .unwrap_or_else(|_| serde_json::json!({})),
                                }
                            })
                        })
                        .collect();
                }
                msg
            })
            .collect();

        let mut options = serde_json::json!({
            "temperature": request.temperature,
            "num_ctx": CONTEXT_WINDOW,
        });
        if let Some(max_tokens) = request.max_tokens {
            options["num_predict"] = serde_json::json!(max_tokens);
        }

        let mut body = serde_json::json!({
            "model": request.model,
            "messages": messages,
            "stream": false,
            "options": options,
            "keep_alive": -1,
        });

        if !request.tools.is_empty() {
            body["tools"] = request
                .tools
                .iter()
                .map(|t| {
                    serde_json::json!({
                        "type": "function",
                        "function": {
                            "name": t.name,
                            "description": t.description,
                            "parameters": t.parameters,
                        }
                    })
                })
                .collect();
        }

        body
    }
}

#[async_trait]
impl Provider for OllamaProvider {
    fn name(&self) -> &str {
        &self.name
    }

    async fn complete(
        &self,
        request: ProviderRequest,
    ) -> std::result::Result<ProviderResponse, ProviderError> {
        let url = format!("{}/api/chat", self.base_url);
        let body = Self::request_body(&request);

        debug!(provider = %self.name, model = %request.model, "Sending Ollama chat request");

        let response = self
            .client
            .post(&url)
            .json(&body)
            .send()
            .await
            .map_err(|e| ProviderError::Network(e.to_string()))?;

        let status = response.status().as_u16();
        if status != 200 {
            let error_body = response.text().await.unwrap_or_default();
            warn!(provider = %self.name, status, body = %error_body, "Ollama returned error");
            return Err(status_error(status, error_body));
        }

        let chat: ChatResponse = response.json().await.map_err(|e| ProviderError::ApiError {
            status_code: 200,
            message: format!("Failed to parse Ollama response: {e}"),
        })?;

        Ok(chat.into_provider_response(&request.model))
    }

    async fn health_check(&self) -> std::result::Result<bool, ProviderError> {
        let url = format!("{}/api/tags", self.base_url);
        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| ProviderError::Network(e.to_string()))?;
        Ok(response.status().is_success())
    }
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    model: Option<String>,
    message: ChatMessage,
    #[serde(default)]
    prompt_eval_count: Option<u32>,
    #[serde(default)]
    eval_count: Option<u32>,
}

#[derive(Debug, Deserialize)]
struct ChatMessage {
    #[serde(default)]
    content: String,
    #[serde(default)]
    tool_calls: Vec<ChatToolCall>,
}

#[derive(Debug, Deserialize)]
struct ChatToolCall {
    function: ChatFunction,
}

#[derive(Debug, Deserialize)]
struct ChatFunction {
    name: String,
    #[serde(default)]
    arguments: serde_json::Value,
}

impl ChatResponse {
    fn into_provider_response(self, requested_model: &str) -> ProviderResponse {
        let tool_calls = self
            .message
            .tool_calls
            .into_iter()
            .map(|tc| MessageToolCall {
                id: format!("call_{}", uuid::Uuid::new_v4().simple()),
                name: tc.function.name,
                arguments: match tc.function.arguments {
                    serde_json::Value::String(s) => s,
                    serde_json::Value::Null => "{}".into(),
                    other => other.to_string(),
                },
            })
            .collect();

        let usage = match (self.prompt_eval_count, self.eval_count) {
            (Some(p), Some(c)) => Some(Usage {
                prompt_tokens: p,
                completion_tokens: c,
                total_tokens: p + c,
            }),
            _ => None,
        };

        ProviderResponse {
            message: Message::assistant_with_calls(self.message.content, tool_calls),
            usage,
            model: self.model.unwrap_or_else(|| requested_model.to_string()),
        }
    }
}
