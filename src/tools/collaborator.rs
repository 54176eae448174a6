// Tool execution collaborator
//
// Whatever actually runs the file tools: a remote MCP server or the
// in-process toolbox. The registry lists through it, the dispatcher calls
// through it.

use async_trait::async_trait;
use serde_json::{Map, Value};

use crate::errors::CollaboratorError;
use crate::tools::types::ToolDefinition;

#[async_trait]
pub trait ToolCollaborator: Send + Sync {
    /// Short label used in logs and timeout messages
    fn name(&self) -> &str;

    /// List the tools this collaborator can execute
    async fn list_tools(&self) -> Result<Vec<ToolDefinition>, CollaboratorError>;

    /// Execute one tool call. Implementations must not retry on their own.
    async fn call_tool(
        &self,
        tool_name: &str,
        arguments: &Map<String, Value>,
    ) -> Result<Value, CollaboratorError>;
}
