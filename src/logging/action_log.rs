// Action log - one JSONL record per request
//
// Records what the model was asked, what it answered, what was dispatched
// and how it ended. Written through on every request; a crash loses at most
// the request in flight.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing::debug;

use crate::tools::types::ResultEnvelope;

/// A single logged request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActionRecord {
    /// Unique ID for this entry
    pub id: String,

    pub timestamp: DateTime<Utc>,

    /// User query, or `call <tool>` for direct calls
    pub query: String,

    /// Model reply exactly as received
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub raw_reply: Option<String>,

    /// Dispatcher call id (`call_...`), when the request got that far
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub action_id: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool: Option<String>,

    /// Normalized arguments
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub arguments: Option<Value>,

    pub envelope: ResultEnvelope,

    pub duration_ms: u64,
}

impl ActionRecord {
    pub fn new(query: impl Into<String>, envelope: ResultEnvelope) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            timestamp: Utc::now(),
            query: query.into(),
            raw_reply: None,
            action_id: None,
            tool: None,
            arguments: None,
            envelope,
            duration_ms: 0,
        }
    }
}

/// Append-only JSONL writer
pub struct ActionLogger {
    log_path: PathBuf,
    // serializes appends from concurrent requests
    write_lock: Mutex<()>,
}

impl ActionLogger {
    pub fn new(log_path: PathBuf) -> Result<Self> {
        if let Some(parent) = log_path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).context("Failed to create action log directory")?;
            }
        }

        Ok(Self {
            log_path,
            write_lock: Mutex::new(()),
        })
    }

    /// Append one record, returning its id
    pub fn record(&self, record: &ActionRecord) -> Result<String> {
        let json = serde_json::to_string(record).context("Failed to serialize action record")?;

        let _guard = self
            .write_lock
            .lock()
            .map_err(|_| anyhow::anyhow!("action log lock poisoned"))?;
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.log_path)
            .context("Failed to open action log")?;
        writeln!(file, "{}", json).context("Failed to write action record")?;

        debug!("Logged action {} to {}", record.id, self.log_path.display());
        Ok(record.id.clone())
    }

    /// Read every record back (blank lines skipped)
    pub fn read_all(&self) -> Result<Vec<ActionRecord>> {
        let contents =
            std::fs::read_to_string(&self.log_path).context("Failed to read action log")?;
        contents
            .lines()
            .filter(|line| !line.trim().is_empty())
            .map(|line| serde_json::from_str(line).context("Failed to parse action record"))
            .collect()
    }

    pub fn path(&self) -> &Path {
        &self.log_path
    }
}
