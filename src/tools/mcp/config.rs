// MCP tool server configuration

use serde::{Deserialize, Serialize};
use std::time::Duration;

pub const DEFAULT_MCP_URL: &str = "http://127.0.0.1:8090/mcp";
pub const DEFAULT_TOOL_TIMEOUT_SECS: u64 = 30;

/// Where the remote tool server lives
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct McpServerConfig {
    /// Streamable-HTTP endpoint, e.g. `http://127.0.0.1:8090/mcp`
    #[serde(default = "default_url")]
    pub url: String,

    /// Per-request timeout
    #[serde(default = "default_timeout")]
    pub timeout_seconds: u64,
}

fn default_url() -> String {
    DEFAULT_MCP_URL.to_string()
}

fn default_timeout() -> u64 {
    DEFAULT_TOOL_TIMEOUT_SECS
}

impl Default for McpServerConfig {
    fn default() -> Self {
        Self {
            url: default_url(),
            timeout_seconds: default_timeout(),
        }
    }
}

impl McpServerConfig {
    /// Endpoint from a bare server base such as `http://host:8090`
    /// (the `MCP_BASE_URL` convention); `/mcp` is appended when missing.
    pub fn from_base_url(base: &str) -> Self {
        let base = base.trim_end_matches('/');
        let url = if base.ends_with("/mcp") {
            base.to_string()
        } else {
            format!("{}/mcp", base)
        };
        Self {
            url,
            ..Self::default()
        }
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_seconds)
    }

    /// Validate the configuration
    pub fn validate(&self) -> anyhow::Result<()> {
        if !(self.url.starts_with("http://") || self.url.starts_with("https://")) {
            anyhow::bail!("MCP server url must be http(s), got '{}'", self.url);
        }
        if self.timeout_seconds == 0 {
            anyhow::bail!("MCP server timeout_seconds must be greater than zero");
        }
        Ok(())
    }
}
