// In-process toolbox
//
// Runs the file tools directly instead of going through a remote tool
// server. Same tool names and schemas as the server exposes, so the rest of
// the pipeline cannot tell the difference.

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde_json::{Map, Value};
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::errors::CollaboratorError;
use crate::tools::collaborator::ToolCollaborator;
use crate::tools::implementations::{
    CsvAddRowTool, CsvInsightTool, CsvReadTool, PingTool, TextAppendTool, TextEditTool,
    TextReadTool,
};
use crate::tools::types::{ToolDefinition, ToolInputSchema};

/// Context passed to tools during execution
#[derive(Debug, Clone, Default)]
pub struct ToolContext {
    /// Directory relative paths are resolved against (process cwd when unset)
    pub root: Option<PathBuf>,
}

impl ToolContext {
    pub fn with_root(root: impl Into<PathBuf>) -> Self {
        Self {
            root: Some(root.into()),
        }
    }

    pub fn resolve(&self, path: &str) -> PathBuf {
        let path = Path::new(path);
        match &self.root {
            Some(root) if path.is_relative() => root.join(path),
            _ => path.to_path_buf(),
        }
    }
}

/// A tool the in-process toolbox can run
#[async_trait]
pub trait Tool: Send + Sync {
    fn name(&self) -> &str;

    fn description(&self) -> &str;

    fn input_schema(&self) -> ToolInputSchema;

    async fn execute(&self, input: &Map<String, Value>, context: &ToolContext) -> Result<Value>;

    fn definition(&self) -> ToolDefinition {
        ToolDefinition {
            name: self.name().to_string(),
            description: Some(self.description().to_string()),
            input_schema: self.input_schema(),
        }
    }
}

/// Fetch a required string argument
pub(crate) fn str_arg<'a>(input: &'a Map<String, Value>, key: &str) -> Result<&'a str> {
    input
        .get(key)
        .and_then(Value::as_str)
        .with_context(|| format!("Missing {} parameter", key))
}

pub struct LocalToolbox {
    tools: Vec<Box<dyn Tool>>,
    context: ToolContext,
}

impl LocalToolbox {
    pub fn new(context: ToolContext) -> Self {
        Self {
            tools: Vec::new(),
            context,
        }
    }

    /// Toolbox with ping plus the CSV and text tools
    pub fn with_file_tools(context: ToolContext) -> Self {
        let mut toolbox = Self::new(context);
        toolbox.register(Box::new(PingTool));
        toolbox.register(Box::new(CsvReadTool));
        toolbox.register(Box::new(CsvAddRowTool));
        toolbox.register(Box::new(CsvInsightTool));
        toolbox.register(Box::new(TextReadTool));
        toolbox.register(Box::new(TextAppendTool));
        toolbox.register(Box::new(TextEditTool));
        toolbox
    }

    pub fn register(&mut self, tool: Box<dyn Tool>) {
        self.tools.push(tool);
    }

    pub fn context(&self) -> &ToolContext {
        &self.context
    }
}

#[async_trait]
impl ToolCollaborator for LocalToolbox {
    fn name(&self) -> &str {
        "local toolbox"
    }

    async fn list_tools(&self) -> Result<Vec<ToolDefinition>, CollaboratorError> {
        Ok(self.tools.iter().map(|t| t.definition()).collect())
    }

    async fn call_tool(
        &self,
        tool_name: &str,
        arguments: &Map<String, Value>,
    ) -> Result<Value, CollaboratorError> {
        let tool = self
            .tools
            .iter()
            .find(|t| t.name() == tool_name)
            .ok_or_else(|| CollaboratorError::Rejected(format!("Unknown tool: {}", tool_name)))?;

        debug!("Running local tool {}", tool_name);
        tool.execute(arguments, &self.context)
            .await
            .map_err(|e| CollaboratorError::Rejected(format!("{:#}", e)))
    }
}
