// Ollama provider - non-streaming `/api/chat`

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::time::Duration;

use super::types::{ProviderRequest, ProviderResponse};
use super::LlmProvider;
use crate::errors::CollaboratorError;
use crate::tools::types::RawAction;

pub const DEFAULT_OLLAMA_URL: &str = "http://localhost:11434";
pub const DEFAULT_OLLAMA_MODEL: &str = "llama3.2";
const REQUEST_TIMEOUT_SECS: u64 = 120;

/// Ollama chat provider
#[derive(Clone)]
pub struct OllamaProvider {
    client: Client,
    base_url: String,
    default_model: String,
    timeout: Duration,
}

impl OllamaProvider {
    pub fn new(base_url: impl Into<String>) -> anyhow::Result<Self> {
        Self::with_timeout(base_url, Duration::from_secs(REQUEST_TIMEOUT_SECS))
    }

    pub fn with_timeout(base_url: impl Into<String>, timeout: Duration) -> anyhow::Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| anyhow::anyhow!("Failed to create HTTP client: {}", e))?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            default_model: DEFAULT_OLLAMA_MODEL.to_string(),
            timeout,
        })
    }

    /// Set custom model for this provider
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.default_model = model.into();
        self
    }

    fn to_ollama_request(&self, request: &ProviderRequest) -> OllamaRequest {
        let model = if request.model.is_empty() {
            self.default_model.clone()
        } else {
            request.model.clone()
        };

        let mut messages = Vec::with_capacity(2);
        if let Some(system) = &request.system {
            messages.push(OllamaMessage {
                role: "system".to_string(),
                content: system.clone(),
            });
        }
        messages.push(OllamaMessage {
            role: "user".to_string(),
            content: request.user.clone(),
        });

        let tools = request.tools.as_ref().map(|defs| {
            defs.iter()
                .map(|tool| {
                    let parameters = serde_json::to_value(&tool.input_schema).unwrap_or_else(|e| {
                        tracing::warn!("Failed to convert tool schema for '{}': {}", tool.name, e);
                        json!({})
                    });
                    json!({
                        "type": "function",
                        "function": {
                            "name": tool.name,
                            "description": tool.description.clone().unwrap_or_default(),
                            "parameters": parameters,
                        }
                    })
                })
                .collect()
        });

        OllamaRequest {
            model,
            messages,
            stream: false,
            format: request.json_mode.then(|| "json".to_string()),
            options: request.temperature.map(|temperature| OllamaOptions { temperature }),
            tools,
        }
    }

    fn from_ollama_response(response: OllamaResponse) -> ProviderResponse {
        let tool_calls = response
            .message
            .tool_calls
            .unwrap_or_default()
            .into_iter()
            .map(|call| RawAction::new(call.function.name, call.function.arguments))
            .collect();

        ProviderResponse {
            model: response.model,
            content: response.message.content,
            tool_calls,
        }
    }
}

#[async_trait]
impl LlmProvider for OllamaProvider {
    async fn send_message(
        &self,
        request: &ProviderRequest,
    ) -> Result<ProviderResponse, CollaboratorError> {
        let body = self.to_ollama_request(request);
        let url = format!("{}/api/chat", self.base_url);

        tracing::debug!("Sending request to Ollama: model={} tools={}", body.model, body.tools.as_ref().map_or(0, Vec::len));

        let response = self
            .client
            .post(&url)
            .json(&body)
            .send()
            .await
            .map_err(|e| CollaboratorError::from_reqwest(e, self.timeout))?;

        let status = response.status();
        if !status.is_success() {
            let error_body = response.text().await.unwrap_or_default();
            let message = format!("Ollama request failed ({}): {}", status, error_body.trim());
            return Err(if status.is_server_error() {
                CollaboratorError::Unavailable(message)
            } else {
                CollaboratorError::Rejected(message)
            });
        }

        let parsed: OllamaResponse = response
            .json()
            .await
            .map_err(|e| CollaboratorError::from_reqwest(e, self.timeout))?;

        tracing::debug!("Received Ollama reply ({} chars)", parsed.message.content.len());

        Ok(Self::from_ollama_response(parsed))
    }

    fn name(&self) -> &str {
        "ollama"
    }

    fn default_model(&self) -> &str {
        &self.default_model
    }
}

#[derive(Debug, Serialize)]
struct OllamaRequest {
    model: String,
    messages: Vec<OllamaMessage>,
    stream: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    format: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    options: Option<OllamaOptions>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tools: Option<Vec<Value>>,
}

#[derive(Debug, Serialize)]
struct OllamaMessage {
    role: String,
    content: String,
}

#[derive(Debug, Serialize)]
struct OllamaOptions {
    temperature: f32,
}

#[derive(Debug, Deserialize)]
struct OllamaResponse {
    #[serde(default)]
    model: String,
    message: OllamaReplyMessage,
}

#[derive(Debug, Deserialize)]
struct OllamaReplyMessage {
    #[serde(default)]
    content: String,
    #[serde(default)]
    tool_calls: Option<Vec<OllamaToolCall>>,
}

#[derive(Debug, Deserialize)]
struct OllamaToolCall {
    function: OllamaFunctionCall,
}

#[derive(Debug, Deserialize)]
struct OllamaFunctionCall {
    name: String,
    /// Usually an object; some models send a JSON string
    #[serde(default)]
    arguments: Value,
}
