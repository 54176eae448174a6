// Configuration loader
// Loads ~/.localdata/config.toml (or an explicit path), then applies
// environment overrides

use anyhow::{Context, Result};
use std::fs;
use std::path::{Path, PathBuf};

use super::constants::{CONFIG_DIR_NAME, CONFIG_FILE_NAME, ENV_MCP_BASE_URL, ENV_MODEL, ENV_OLLAMA_HOST};
use super::settings::Config;
use crate::tools::mcp::McpServerConfig;

/// Default config location, if the home directory is known
pub fn default_config_path() -> Option<PathBuf> {
    dirs::home_dir().map(|home| home.join(CONFIG_DIR_NAME).join(CONFIG_FILE_NAME))
}

/// Load configuration.
///
/// An explicit `path` must exist. Without one, the default location is used
/// when present and built-in defaults otherwise.
pub fn load_config(path: Option<&Path>) -> Result<Config> {
    let mut config = match path {
        Some(path) => load_file(path)?,
        None => match default_config_path() {
            Some(path) if path.exists() => load_file(&path)?,
            _ => {
                tracing::debug!("No config file found, using defaults");
                Config::default()
            }
        },
    };

    apply_env_overrides(&mut config, |key| std::env::var(key).ok());
    config.validate()?;
    Ok(config)
}

fn load_file(path: &Path) -> Result<Config> {
    let contents = fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;
    let config: Config = toml::from_str(&contents)
        .with_context(|| format!("Failed to parse config file: {}", path.display()))?;
    tracing::debug!("Loaded config from {}", path.display());
    Ok(config)
}

/// Environment wins over the file. Empty values are ignored.
pub(crate) fn apply_env_overrides<F>(config: &mut Config, lookup: F)
where
    F: Fn(&str) -> Option<String>,
{
    let lookup = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

    if let Some(base) = lookup(ENV_MCP_BASE_URL) {
        config.tools.url = McpServerConfig::from_base_url(&base).url;
    }
    if let Some(host) = lookup(ENV_OLLAMA_HOST) {
        config.model.base_url = if host.starts_with("http://") || host.starts_with("https://") {
            host
        } else {
            format!("http://{}", host)
        };
    }
    if let Some(model) = lookup(ENV_MODEL) {
        config.model.name = model;
    }
}
