// MCP (Model Context Protocol) integration
//
// Talks to a remote tool server over streamable HTTP through rust-mcp-sdk's
// client runtime.
//
// Architecture:
// - McpHttpClient: one session-scoped handle, implements ToolCollaborator
// - McpServerConfig: endpoint and timeout
//
// Usage:
// ```rust
// let client = McpHttpClient::new(&config.tools.mcp_config())?;
// let registry = ToolRegistry::load(&client).await?;
// let value = client.call_tool("text_read", &args).await?;
// ```

pub mod client;
pub mod config;

pub use client::McpHttpClient;
pub use config::McpServerConfig;
