// Configuration structs

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::time::Duration;

use super::constants::{DEFAULT_MODEL_TIMEOUT_SECS, DEFAULT_TEMPERATURE};
use crate::providers::ollama::{DEFAULT_OLLAMA_MODEL, DEFAULT_OLLAMA_URL};
use crate::tools::mcp::config::{DEFAULT_MCP_URL, DEFAULT_TOOL_TIMEOUT_SECS};
use crate::tools::mcp::McpServerConfig;
use crate::tools::normalizer::{
    AliasTable, NormalizerConfig, DEFAULT_NESTED_KEYS, DEFAULT_PATH_FIELDS,
};

/// Model runtime settings (`[model]`)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelConfig {
    /// Ollama base URL
    pub base_url: String,

    pub name: String,

    pub temperature: f32,

    pub timeout_seconds: u64,

    /// Pass tool definitions to the model and accept its native tool calls
    /// instead of decoding a JSON reply
    pub native_tools: bool,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_OLLAMA_URL.to_string(),
            name: DEFAULT_OLLAMA_MODEL.to_string(),
            temperature: DEFAULT_TEMPERATURE,
            timeout_seconds: DEFAULT_MODEL_TIMEOUT_SECS,
            native_tools: false,
        }
    }
}

impl ModelConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_seconds)
    }
}

/// Which collaborator executes tools
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ToolSource {
    /// Remote MCP tool server
    #[default]
    Mcp,
    /// In-process toolbox
    Local,
}

/// Tool execution settings (`[tools]`)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ToolsConfig {
    pub source: ToolSource,

    /// MCP endpoint (used when `source = "mcp"`)
    pub url: String,

    /// Directory relative paths resolve against (used when `source = "local"`)
    pub root: Option<PathBuf>,

    /// Per-call timeout; also the MCP HTTP timeout
    pub timeout_seconds: u64,
}

impl Default for ToolsConfig {
    fn default() -> Self {
        Self {
            source: ToolSource::default(),
            url: DEFAULT_MCP_URL.to_string(),
            root: None,
            timeout_seconds: DEFAULT_TOOL_TIMEOUT_SECS,
        }
    }
}

impl ToolsConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_seconds)
    }

    pub fn mcp_config(&self) -> McpServerConfig {
        McpServerConfig {
            url: self.url.clone(),
            timeout_seconds: self.timeout_seconds,
        }
    }
}

/// Normalizer field lists (`[normalizer]`)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NormalizerSettings {
    pub path_fields: Vec<String>,
    pub nested_keys: Vec<String>,
}

impl Default for NormalizerSettings {
    fn default() -> Self {
        Self {
            path_fields: DEFAULT_PATH_FIELDS.iter().map(|s| s.to_string()).collect(),
            nested_keys: DEFAULT_NESTED_KEYS.iter().map(|s| s.to_string()).collect(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub model: ModelConfig,

    pub tools: ToolsConfig,

    /// Friendly name -> canonical value, e.g. `"notes file" = "/data/notes.txt"`.
    /// Scoped to one session.
    pub aliases: BTreeMap<String, String>,

    pub normalizer: NormalizerSettings,

    /// JSONL file recording every request (disabled when unset)
    pub action_log: Option<PathBuf>,
}

impl Config {
    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        if !(self.model.base_url.starts_with("http://")
            || self.model.base_url.starts_with("https://"))
        {
            bail!("model.base_url must be http(s), got '{}'", self.model.base_url);
        }
        if self.model.name.trim().is_empty() {
            bail!("model.name must not be empty");
        }
        if !(0.0..=2.0).contains(&self.model.temperature) {
            bail!(
                "model.temperature must be between 0.0 and 2.0, got {}",
                self.model.temperature
            );
        }
        if self.model.timeout_seconds == 0 {
            bail!("model.timeout_seconds must be greater than zero");
        }

        match self.tools.source {
            ToolSource::Mcp => self
                .tools
                .mcp_config()
                .validate()
                .context("Invalid [tools] section")?,
            ToolSource::Local => {
                if self.tools.timeout_seconds == 0 {
                    bail!("tools.timeout_seconds must be greater than zero");
                }
            }
        }

        if self.normalizer.path_fields.iter().any(|f| f.trim().is_empty()) {
            bail!("normalizer.path_fields must not contain empty names");
        }

        // Surfaces alias chains at load time
        self.alias_table()?;
        Ok(())
    }

    pub fn alias_table(&self) -> Result<AliasTable> {
        AliasTable::new(self.aliases.iter().map(|(k, v)| (k, v.clone())))
            .context("Invalid [aliases] section")
    }

    pub fn normalizer_config(&self) -> Result<NormalizerConfig> {
        Ok(NormalizerConfig {
            aliases: self.alias_table()?,
            path_fields: self.normalizer.path_fields.clone(),
            nested_keys: self.normalizer.nested_keys.clone(),
        })
    }
}
