// Project-wide constants
//
// Import via `use crate::config::constants::*;`.

/// Config directory under the user's home
pub const CONFIG_DIR_NAME: &str = ".localdata";

pub const CONFIG_FILE_NAME: &str = "config.toml";

/// Sampling temperature for action proposals. Zero keeps the model's JSON
/// output as deterministic as the runtime allows.
pub const DEFAULT_TEMPERATURE: f32 = 0.0;

/// Model runtime request timeout. Local models can take a while on first
/// load.
pub const DEFAULT_MODEL_TIMEOUT_SECS: u64 = 120;

/// Tool server base URL override (the server root; `/mcp` is appended)
pub const ENV_MCP_BASE_URL: &str = "MCP_BASE_URL";

/// Ollama runtime address override
pub const ENV_OLLAMA_HOST: &str = "OLLAMA_HOST";

/// Model name override
pub const ENV_MODEL: &str = "LOCALDATA_MODEL";
