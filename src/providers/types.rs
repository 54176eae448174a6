// Request/response types for the model collaborator
//
// One system prompt, one user message, one reply. The pipeline never keeps
// a multi-turn history.

use crate::tools::types::{RawAction, ToolDefinition};
use serde::Serialize;

/// A single chat request
#[derive(Debug, Clone, Serialize)]
pub struct ProviderRequest {
    /// Model name (empty means the provider default)
    pub model: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub system: Option<String>,

    pub user: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,

    /// Ask the runtime to constrain output to a JSON document
    pub json_mode: bool,

    /// Tool definitions for native tool calling
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tools: Option<Vec<ToolDefinition>>,
}

impl ProviderRequest {
    pub fn new(user: impl Into<String>) -> Self {
        Self {
            model: String::new(),
            system: None,
            user: user.into(),
            temperature: None,
            json_mode: false,
            tools: None,
        }
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    pub fn with_system(mut self, system: impl Into<String>) -> Self {
        self.system = Some(system.into());
        self
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }

    pub fn with_json_mode(mut self, json_mode: bool) -> Self {
        self.json_mode = json_mode;
        self
    }

    pub fn with_tools(mut self, tools: Vec<ToolDefinition>) -> Self {
        self.tools = Some(tools);
        self
    }
}

/// What the model answered
#[derive(Debug, Clone, Default)]
pub struct ProviderResponse {
    /// Model that produced the reply, as reported by the runtime
    pub model: String,

    /// Reply text (may be empty when the model only emitted tool calls)
    pub content: String,

    /// Native tool calls, in the order the model emitted them
    pub tool_calls: Vec<RawAction>,
}

impl ProviderResponse {
    pub fn text(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            ..Self::default()
        }
    }

    pub fn has_tool_calls(&self) -> bool {
        !self.tool_calls.is_empty()
    }
}
