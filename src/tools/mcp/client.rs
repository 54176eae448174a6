// MCP client over streamable HTTP
//
// The rust-mcp-sdk runtime owns the wire protocol (initialize handshake,
// session header, JSON or event-stream replies). It is started lazily on the
// first request and exactly once per handle.

use async_trait::async_trait;
use rust_mcp_sdk::error::McpSdkError;
use rust_mcp_sdk::mcp_client::{client_runtime, ClientHandler, ClientRuntime};
use rust_mcp_sdk::schema::{
    CallToolRequestParams, ClientCapabilities, Implementation, InitializeRequestParams,
    PaginatedRequestParams, ProtocolVersion,
};
use rust_mcp_sdk::{McpClient, RequestOptions, StreamableTransportOptions, TransportError};
use serde_json::{json, Map, Value};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::OnceCell;
use tracing::{debug, info};

use super::config::McpServerConfig;
use crate::errors::CollaboratorError;
use crate::tools::collaborator::ToolCollaborator;
use crate::tools::types::ToolDefinition;

/// No server-initiated requests are handled
pub struct BasicClientHandler;

#[async_trait]
impl ClientHandler for BasicClientHandler {}

pub struct McpHttpClient {
    url: String,
    timeout: Duration,
    runtime: OnceCell<Arc<ClientRuntime>>,
}

impl McpHttpClient {
    pub fn new(config: &McpServerConfig) -> anyhow::Result<Self> {
        config.validate()?;
        Ok(Self {
            url: config.url.clone(),
            timeout: config.timeout(),
            runtime: OnceCell::new(),
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    /// Session id issued by the server, once the handshake has happened
    pub async fn session_id(&self) -> Option<String> {
        match self.runtime.get() {
            Some(runtime) => runtime.session_id().await,
            None => None,
        }
    }

    async fn runtime(&self) -> Result<&Arc<ClientRuntime>, CollaboratorError> {
        self.runtime.get_or_try_init(|| self.connect()).await
    }

    async fn connect(&self) -> Result<Arc<ClientRuntime>, CollaboratorError> {
        let client_details = InitializeRequestParams {
            protocol_version: ProtocolVersion::V2025_06_18.to_string(),
            capabilities: ClientCapabilities::default(),
            client_info: Implementation {
                name: "localdata".to_string(),
                version: env!("CARGO_PKG_VERSION").to_string(),
                description: Some("Tool-call dispatch for local models".to_string()),
                icons: vec![],
                title: None,
                website_url: None,
            },
            meta: None,
        };
        let transport_options = StreamableTransportOptions {
            mcp_url: self.url.clone(),
            request_options: RequestOptions {
                request_timeout: self.timeout,
                ..RequestOptions::default()
            },
        };

        let runtime = client_runtime::with_transport_options(
            client_details,
            transport_options,
            BasicClientHandler,
            None,
            None,
        );
        self.bounded(runtime.clone().start()).await?;

        let server = runtime
            .server_version()
            .map(|v| v.name)
            .unwrap_or_else(|| "unknown".to_string());
        info!(
            "Connected to MCP server '{}' at {} (session: {})",
            server,
            self.url,
            runtime.session_id().await.as_deref().unwrap_or("none")
        );
        Ok(runtime)
    }

    /// Run one SDK call under the configured timeout
    async fn bounded<T, F>(&self, call: F) -> Result<T, CollaboratorError>
    where
        F: Future<Output = Result<T, McpSdkError>>,
    {
        match tokio::time::timeout(self.timeout, call).await {
            Ok(result) => result.map_err(|e| from_sdk(e, self.timeout)),
            Err(_) => Err(CollaboratorError::Timeout(self.timeout)),
        }
    }
}

/// Classify an SDK failure
pub(crate) fn from_sdk(err: McpSdkError, timeout: Duration) -> CollaboratorError {
    match err {
        McpSdkError::RpcError(rpc) => {
            CollaboratorError::Rejected(format!("JSON-RPC error: {}", rpc.message))
        }
        McpSdkError::Transport(TransportError::HttpConnection(e)) => {
            if e.is_timeout() {
                CollaboratorError::Timeout(timeout)
            } else {
                CollaboratorError::Unavailable(e.to_string())
            }
        }
        McpSdkError::Transport(TransportError::Http(status)) => {
            let message = format!("MCP server returned {}", status);
            if status.is_server_error() {
                CollaboratorError::Unavailable(message)
            } else {
                CollaboratorError::Rejected(message)
            }
        }
        McpSdkError::Transport(TransportError::JsonrpcError(rpc)) => {
            CollaboratorError::Rejected(format!("JSON-RPC error: {}", rpc.message))
        }
        McpSdkError::Transport(
            e @ (TransportError::SendFailure(_)
            | TransportError::FailedToOpenSSEStream(_)
            | TransportError::SessionExpired
            | TransportError::ChannelClosed(_)
            | TransportError::Io(_)),
        ) => CollaboratorError::Unavailable(e.to_string()),
        McpSdkError::Io(e) => CollaboratorError::Unavailable(e.to_string()),
        other => {
            // The transport reports its own request timeout as an SdkError
            let message = other.to_string();
            if message.to_lowercase().contains("timed out") || message.contains("timeout") {
                CollaboratorError::Timeout(timeout)
            } else {
                CollaboratorError::Protocol(message)
            }
        }
    }
}

/// Put listed parameters back in declaration order.
///
/// The SDK keeps schema properties in an unordered map. Tool servers list
/// `required` in signature order and required parameters precede defaulted
/// ones, so that list followed by the remaining names (sorted) restores it.
pub(crate) fn restore_parameter_order(definition: &mut ToolDefinition) {
    let Some(properties) = definition.input_schema.properties.as_object_mut() else {
        return;
    };
    let mut unordered = std::mem::take(properties);
    let mut ordered = Map::new();

    for name in &definition.input_schema.required {
        if let Some(prop) = unordered.remove(name) {
            ordered.insert(name.clone(), prop);
        }
    }
    let mut rest: Vec<(String, Value)> = unordered.into_iter().collect();
    rest.sort_by(|a, b| a.0.cmp(&b.0));
    ordered.extend(rest);

    *properties = ordered;
}

/// Turn a `tools/call` result into a plain value
pub(crate) fn call_result_value(result: Value) -> Result<Value, CollaboratorError> {
    let texts: Vec<&str> = result
        .get("content")
        .and_then(Value::as_array)
        .map(|items| {
            items
                .iter()
                .filter(|i| i.get("type").and_then(Value::as_str) == Some("text"))
                .filter_map(|i| i.get("text").and_then(Value::as_str))
                .collect()
        })
        .unwrap_or_default();

    if result.get("isError").and_then(Value::as_bool) == Some(true) {
        let message = if texts.is_empty() {
            "tool reported an error".to_string()
        } else {
            texts.join("\n")
        };
        return Err(CollaboratorError::Rejected(message));
    }

    if let Some(structured) = result.get("structuredContent").filter(|v| !v.is_null()) {
        // FastMCP wraps non-object returns as {"result": x}
        if let Some(obj) = structured.as_object() {
            if obj.len() == 1 {
                if let Some(inner) = obj.get("result") {
                    return Ok(inner.clone());
                }
            }
        }
        return Ok(structured.clone());
    }

    let parse = |t: &str| serde_json::from_str(t).unwrap_or_else(|_| Value::String(t.to_string()));
    Ok(match texts.as_slice() {
        [] => Value::Null,
        [single] => parse(single),
        many => Value::Array(many.iter().map(|t| parse(t)).collect()),
    })
}

fn to_json<T: serde::Serialize>(value: &T, what: &str) -> Result<Value, CollaboratorError> {
    serde_json::to_value(value)
        .map_err(|e| CollaboratorError::Protocol(format!("bad {}: {}", what, e)))
}

#[async_trait]
impl ToolCollaborator for McpHttpClient {
    fn name(&self) -> &str {
        "MCP server"
    }

    async fn list_tools(&self) -> Result<Vec<ToolDefinition>, CollaboratorError> {
        let runtime = self.runtime().await?;
        let mut tools = Vec::new();
        let mut cursor: Option<String> = None;

        loop {
            let params = match &cursor {
                Some(c) => Some(
                    serde_json::from_value::<PaginatedRequestParams>(json!({"cursor": c}))
                        .map_err(|e| CollaboratorError::Protocol(e.to_string()))?,
                ),
                None => None,
            };
            debug!("MCP tools/list (cursor: {:?})", cursor);
            let page = self.bounded(runtime.request_tool_list(params)).await?;
            let page = to_json(&page, "tool listing")?;

            let listed: Vec<ToolDefinition> = page
                .get("tools")
                .cloned()
                .map(serde_json::from_value)
                .transpose()
                .map_err(|e| CollaboratorError::Protocol(format!("bad tool listing: {}", e)))?
                .unwrap_or_default();
            for mut definition in listed {
                restore_parameter_order(&mut definition);
                tools.push(definition);
            }

            cursor = page
                .get("nextCursor")
                .and_then(Value::as_str)
                .map(str::to_string);
            if cursor.is_none() {
                break;
            }
        }

        Ok(tools)
    }

    async fn call_tool(
        &self,
        tool_name: &str,
        arguments: &Map<String, Value>,
    ) -> Result<Value, CollaboratorError> {
        let runtime = self.runtime().await?;
        debug!("MCP tools/call {}", tool_name);
        let result = self
            .bounded(runtime.request_tool_call(CallToolRequestParams {
                name: tool_name.to_string(),
                arguments: Some(arguments.clone()),
                meta: None,
                task: None,
            }))
            .await?;
        call_result_value(to_json(&result, "tool result")?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::types::ToolInputSchema;
    use rust_mcp_sdk::schema::RpcError;

    #[test]
    fn test_call_result_prefers_structured_content() {
        let value = call_result_value(json!({
            "content": [{"type": "text", "text": "30.0"}],
            "structuredContent": {"result": 30.0},
            "isError": false
        }))
        .unwrap();
        assert_eq!(value, json!(30.0));
    }

    #[test]
    fn test_call_result_parses_json_text() {
        let value = call_result_value(json!({
            "content": [{"type": "text", "text": "{\"status\": \"success\"}"}]
        }))
        .unwrap();
        assert_eq!(value, json!({"status": "success"}));

        let plain = call_result_value(json!({
            "content": [{"type": "text", "text": "pong,bob!"}]
        }))
        .unwrap();
        assert_eq!(plain, json!("pong,bob!"));
    }

    #[test]
    fn test_call_result_error_flag() {
        let err = call_result_value(json!({
            "content": [{"type": "text", "text": "Error calling tool 'text_read': No such file"}],
            "isError": true
        }))
        .unwrap_err();
        assert!(matches!(err, CollaboratorError::Rejected(m) if m.contains("No such file")));
    }

    #[test]
    fn test_rpc_error_is_rejected() {
        let err = from_sdk(
            McpSdkError::RpcError(
                RpcError::invalid_params().with_message("Unknown tool: nope".to_string()),
            ),
            Duration::from_secs(5),
        );
        assert!(matches!(err, CollaboratorError::Rejected(ref m) if m.contains("Unknown tool: nope")));
    }

    #[test]
    fn test_io_failure_is_unavailable() {
        let err = from_sdk(
            McpSdkError::Io(std::io::Error::new(
                std::io::ErrorKind::ConnectionRefused,
                "refused",
            )),
            Duration::from_secs(5),
        );
        assert!(matches!(err, CollaboratorError::Unavailable(_)));
    }

    #[test]
    fn test_parameter_order_restored_from_required() {
        let mut definition = ToolDefinition {
            name: "csv_insight".to_string(),
            description: None,
            input_schema: ToolInputSchema {
                schema_type: "object".to_string(),
                properties: json!({
                    "operation": {"type": "string"},
                    "limit": {"type": "integer"},
                    "column": {"type": "string"},
                    "path": {"type": "string"},
                    "format": {"type": "string"}
                }),
                required: vec![
                    "path".to_string(),
                    "column".to_string(),
                    "operation".to_string(),
                ],
            },
        };

        restore_parameter_order(&mut definition);
        let names: Vec<&str> = definition
            .input_schema
            .properties
            .as_object()
            .unwrap()
            .keys()
            .map(String::as_str)
            .collect();
        assert_eq!(names, vec!["path", "column", "operation", "format", "limit"]);
    }
}
