// Agent session - one registry, one model, one tool collaborator
//
// `run_action` drives a single request through
// Decoding -> Normalizing -> Dispatching -> Done. Any failure jumps straight
// to Done with a Failure envelope; nothing escapes as an error or panic.

use anyhow::{Context, Result};
use serde_json::Value;
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info, instrument, warn};

use super::prompt::{action_prompt, explain_prompt, EXPLAIN_QUERY};
use crate::config::constants::DEFAULT_TEMPERATURE;
use crate::config::{Config, ToolSource};
use crate::errors::{ActionError, CollaboratorError};
use crate::logging::{ActionLogger, ActionRecord};
use crate::providers::{LlmProvider, OllamaProvider, ProviderRequest, ProviderResponse};
use crate::tools::collaborator::ToolCollaborator;
use crate::tools::decoder;
use crate::tools::dispatcher::Dispatcher;
use crate::tools::local::{LocalToolbox, ToolContext};
use crate::tools::mcp::McpHttpClient;
use crate::tools::normalizer::{ArgumentNormalizer, NormalizerConfig};
use crate::tools::registry::ToolRegistry;
use crate::tools::types::{NormalizedAction, RawAction, ResultEnvelope};

/// Where a request currently is
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Decoding,
    Normalizing,
    Dispatching,
    Done,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Decoding => "decoding",
            Stage::Normalizing => "normalizing",
            Stage::Dispatching => "dispatching",
            Stage::Done => "done",
        };
        f.write_str(name)
    }
}

/// Session knobs that do not come from the collaborators themselves
#[derive(Debug, Clone)]
pub struct SessionOptions {
    /// Model name; empty uses the provider default
    pub model: String,
    pub temperature: f32,
    /// Offer tools natively and take the model's first tool call
    pub native_tools: bool,
    pub normalizer: NormalizerConfig,
    pub tool_timeout: Option<Duration>,
    pub action_log: Option<PathBuf>,
}

impl Default for SessionOptions {
    fn default() -> Self {
        Self {
            model: String::new(),
            temperature: DEFAULT_TEMPERATURE,
            native_tools: false,
            normalizer: NormalizerConfig::default(),
            tool_timeout: None,
            action_log: None,
        }
    }
}

impl SessionOptions {
    pub fn from_config(config: &Config) -> Result<Self> {
        Ok(Self {
            model: config.model.name.clone(),
            temperature: config.model.temperature,
            native_tools: config.model.native_tools,
            normalizer: config.normalizer_config()?,
            tool_timeout: Some(config.tools.timeout()),
            action_log: config.action_log.clone(),
        })
    }
}

/// What a request touched, for the action log
#[derive(Default)]
struct RequestTrace {
    raw_reply: Option<String>,
    action_id: Option<String>,
    tool: Option<String>,
    arguments: Option<Value>,
}

impl RequestTrace {
    fn record_action(&mut self, action: &NormalizedAction) {
        self.action_id = Some(action.id().to_string());
        self.tool = Some(action.tool_name().to_string());
        self.arguments = Some(Value::Object(action.arguments().clone()));
    }
}

pub struct AgentSession {
    registry: Arc<ToolRegistry>,
    provider: Arc<dyn LlmProvider>,
    normalizer: ArgumentNormalizer,
    dispatcher: Dispatcher,
    options: SessionOptions,
    logger: Option<ActionLogger>,
}

impl AgentSession {
    /// Load the registry through `collaborator` and assemble a session.
    ///
    /// Fails with `RegistryUnavailable` if the listing call fails; other
    /// errors come from opening the action log.
    pub async fn new(
        collaborator: Arc<dyn ToolCollaborator>,
        provider: Arc<dyn LlmProvider>,
        options: SessionOptions,
    ) -> Result<Self> {
        let registry = Arc::new(ToolRegistry::load(collaborator.as_ref()).await?);

        let mut dispatcher = Dispatcher::new(Arc::clone(&registry), collaborator);
        if let Some(timeout) = options.tool_timeout {
            dispatcher = dispatcher.with_timeout(timeout);
        }

        let logger = options
            .action_log
            .clone()
            .map(ActionLogger::new)
            .transpose()?;

        info!(
            "Session ready: {} tools, model '{}', native tools {}",
            registry.len(),
            if options.model.is_empty() {
                provider.default_model()
            } else {
                options.model.as_str()
            },
            options.native_tools
        );

        Ok(Self {
            registry,
            provider,
            normalizer: ArgumentNormalizer::new(options.normalizer.clone()),
            dispatcher,
            options,
            logger,
        })
    }

    /// Build the collaborators `config` describes and connect.
    ///
    /// `force_local` overrides `tools.source`.
    pub async fn connect(config: &Config, force_local: bool) -> Result<Self> {
        let source = if force_local {
            ToolSource::Local
        } else {
            config.tools.source
        };

        let collaborator: Arc<dyn ToolCollaborator> = match source {
            ToolSource::Mcp => {
                info!("Using MCP tool server at {}", config.tools.url);
                Arc::new(
                    McpHttpClient::new(&config.tools.mcp_config())
                        .context("Failed to create MCP client")?,
                )
            }
            ToolSource::Local => {
                let context = match &config.tools.root {
                    Some(root) => ToolContext::with_root(root),
                    None => ToolContext::default(),
                };
                info!("Using in-process toolbox (root: {:?})", context.root);
                Arc::new(LocalToolbox::with_file_tools(context))
            }
        };

        let provider = OllamaProvider::with_timeout(&config.model.base_url, config.model.timeout())?
            .with_model(&config.model.name);

        Self::new(collaborator, Arc::new(provider), SessionOptions::from_config(config)?).await
    }

    pub fn registry(&self) -> &ToolRegistry {
        &self.registry
    }

    /// `(tool name, parameter names)` in listing order
    pub fn describe_tools(&self) -> Vec<(String, Vec<String>)> {
        self.registry.describe()
    }

    /// System prompt sent with every `run_action`
    pub fn build_system_prompt(&self) -> String {
        action_prompt(&self.registry)
    }

    /// Ask the model, decode its reply, normalize, dispatch once
    #[instrument(skip(self, query))]
    pub async fn run_action(&self, query: &str) -> ResultEnvelope {
        let started = Instant::now();
        let mut trace = RequestTrace::default();

        let envelope = self.drive(query, &mut trace).await;
        self.enter(Stage::Done);

        self.log_request(query, trace, &envelope, started);
        envelope
    }

    async fn drive(&self, query: &str, trace: &mut RequestTrace) -> ResultEnvelope {
        self.enter(Stage::Decoding);
        let response = match self.ask_model(query).await {
            Ok(response) => response,
            Err(e) => return e.into(),
        };
        trace.raw_reply = Some(response.content.clone());

        let raw = match self.decode_reply(&response) {
            Ok(raw) => raw,
            Err(e) => return e.into(),
        };

        self.enter(Stage::Normalizing);
        let action = match self.normalize(raw, &response.content) {
            Ok(action) => action,
            Err(e) => return e.into(),
        };
        trace.record_action(&action);

        self.enter(Stage::Dispatching);
        self.dispatcher.dispatch(action).await
    }

    /// Normalize and dispatch a tool call directly, without the model
    #[instrument(skip(self, arguments))]
    pub async fn call(&self, tool: &str, arguments: Value) -> ResultEnvelope {
        let started = Instant::now();
        let mut trace = RequestTrace::default();
        let raw = RawAction::new(tool, arguments);

        self.enter(Stage::Normalizing);
        let envelope = match self.normalize(raw, "") {
            Ok(action) => {
                trace.record_action(&action);
                self.enter(Stage::Dispatching);
                self.dispatcher.dispatch(action).await
            }
            Err(e) => e.into(),
        };
        self.enter(Stage::Done);

        self.log_request(&format!("call {}", tool), trace, &envelope, started);
        envelope
    }

    /// Have the model describe the tool catalog in prose
    pub async fn explain_tools(&self) -> ResultEnvelope {
        let request = ProviderRequest::new(EXPLAIN_QUERY)
            .with_model(self.options.model.clone())
            .with_system(explain_prompt(&self.registry))
            .with_temperature(self.options.temperature);

        match self.provider.send_message(&request).await {
            Ok(response) => ResultEnvelope::success(Value::String(response.content)),
            Err(e) => self.model_error(e).into(),
        }
    }

    fn enter(&self, stage: Stage) {
        debug!(%stage, "request stage");
    }

    async fn ask_model(&self, query: &str) -> Result<ProviderResponse, ActionError> {
        let mut request = ProviderRequest::new(query)
            .with_model(self.options.model.clone())
            .with_system(self.build_system_prompt())
            .with_temperature(self.options.temperature);

        if self.options.native_tools && self.provider.supports_tools() {
            let tools = self.registry.iter().map(|t| t.to_definition()).collect();
            request = request.with_tools(tools);
        } else {
            request = request.with_json_mode(true);
        }

        let response = self
            .provider
            .send_message(&request)
            .await
            .map_err(|e| self.model_error(e))?;
        debug!("Model reply: {}", response.content);
        Ok(response)
    }

    fn model_error(&self, err: CollaboratorError) -> ActionError {
        warn!("Model call failed: {}", err);
        match err {
            CollaboratorError::Timeout(elapsed) => ActionError::CollaboratorTimeout {
                collaborator: self.provider.name().to_string(),
                elapsed,
            },
            other => ActionError::ExecutionError {
                tool: format!("{} model", self.provider.name()),
                message: other.to_string(),
            },
        }
    }

    fn decode_reply(&self, response: &ProviderResponse) -> Result<RawAction, ActionError> {
        if self.options.native_tools {
            if let Some(first) = response.tool_calls.first() {
                if response.tool_calls.len() > 1 {
                    warn!(
                        "Model proposed {} tool calls, dispatching only the first",
                        response.tool_calls.len()
                    );
                }
                return Ok(first.clone());
            }
        }
        decoder::decode(&response.content)
    }

    fn normalize(&self, raw: RawAction, reply: &str) -> Result<NormalizedAction, ActionError> {
        let name = raw
            .tool_name
            .clone()
            .ok_or_else(|| ActionError::malformed("reply does not name a tool", reply))?;
        let descriptor = self
            .registry
            .get(&name)
            .ok_or_else(|| ActionError::UnknownTool(name.clone()))?;
        self.normalizer.normalize(raw, descriptor)
    }

    fn log_request(
        &self,
        query: &str,
        trace: RequestTrace,
        envelope: &ResultEnvelope,
        started: Instant,
    ) {
        let Some(logger) = &self.logger else {
            return;
        };

        let mut record = ActionRecord::new(query, envelope.clone());
        record.raw_reply = trace.raw_reply;
        record.action_id = trace.action_id;
        record.tool = trace.tool;
        record.arguments = trace.arguments;
        record.duration_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);

        if let Err(e) = logger.record(&record) {
            warn!("Failed to write action log: {:#}", e);
        }
    }
}
