// Error taxonomy for the action pipeline
//
// `ActionError` is what a single request can fail with. Every variant maps to
// one `ErrorKind`, which is what ends up in a `ResultEnvelope::Failure`.
// `CollaboratorError` is what the model / tool collaborators report; each
// pipeline stage decides how to map it.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;
use thiserror::Error;

/// Failure category carried through the result envelope
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ErrorKind {
    RegistryUnavailable,
    MalformedAction,
    MissingRequiredArgument,
    UnknownTool,
    ExecutionError,
    CollaboratorTimeout,
}

impl ErrorKind {
    /// Whether a host may reasonably retry the whole request
    pub fn is_retryable(self) -> bool {
        matches!(self, ErrorKind::CollaboratorTimeout)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ErrorKind::RegistryUnavailable => "RegistryUnavailable",
            ErrorKind::MalformedAction => "MalformedAction",
            ErrorKind::MissingRequiredArgument => "MissingRequiredArgument",
            ErrorKind::UnknownTool => "UnknownTool",
            ErrorKind::ExecutionError => "ExecutionError",
            ErrorKind::CollaboratorTimeout => "CollaboratorTimeout",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Request-level failure
#[derive(Debug, Error)]
pub enum ActionError {
    #[error("tool registry unavailable: {0}")]
    RegistryUnavailable(String),

    /// The model reply did not contain a usable action. `raw` is the reply
    /// exactly as received.
    #[error("malformed action: {reason}")]
    MalformedAction { reason: String, raw: String },

    #[error("tool '{tool}' is missing required argument '{field}'")]
    MissingRequiredArgument { tool: String, field: String },

    #[error("unknown tool '{0}'")]
    UnknownTool(String),

    #[error("execution of '{tool}' failed: {message}")]
    ExecutionError { tool: String, message: String },

    #[error("{collaborator} timed out after {elapsed:?}")]
    CollaboratorTimeout {
        collaborator: String,
        elapsed: Duration,
    },
}

impl ActionError {
    pub fn malformed(reason: impl Into<String>, raw: impl Into<String>) -> Self {
        ActionError::MalformedAction {
            reason: reason.into(),
            raw: raw.into(),
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            ActionError::RegistryUnavailable(_) => ErrorKind::RegistryUnavailable,
            ActionError::MalformedAction { .. } => ErrorKind::MalformedAction,
            ActionError::MissingRequiredArgument { .. } => ErrorKind::MissingRequiredArgument,
            ActionError::UnknownTool(_) => ErrorKind::UnknownTool,
            ActionError::ExecutionError { .. } => ErrorKind::ExecutionError,
            ActionError::CollaboratorTimeout { .. } => ErrorKind::CollaboratorTimeout,
        }
    }

    pub fn is_retryable(&self) -> bool {
        self.kind().is_retryable()
    }

    /// Original model text, when the failure happened while decoding it
    pub fn raw_response(&self) -> Option<&str> {
        match self {
            ActionError::MalformedAction { raw, .. } => Some(raw),
            _ => None,
        }
    }
}

/// Error reported by an external collaborator (model runtime or tool server)
#[derive(Debug, Error)]
pub enum CollaboratorError {
    #[error("request timed out after {0:?}")]
    Timeout(Duration),

    #[error("collaborator unavailable: {0}")]
    Unavailable(String),

    /// The collaborator was reached and refused or failed the request
    #[error("{0}")]
    Rejected(String),

    #[error("protocol error: {0}")]
    Protocol(String),
}

impl CollaboratorError {
    /// Classify a reqwest failure. `timeout` is the configured client timeout,
    /// reported back when the request hit it.
    pub fn from_reqwest(err: reqwest::Error, timeout: Duration) -> Self {
        if err.is_timeout() {
            CollaboratorError::Timeout(timeout)
        } else if err.is_connect() || err.is_request() {
            CollaboratorError::Unavailable(err.to_string())
        } else if err.is_decode() {
            CollaboratorError::Protocol(err.to_string())
        } else {
            CollaboratorError::Rejected(err.to_string())
        }
    }

    pub fn is_timeout(&self) -> bool {
        matches!(self, CollaboratorError::Timeout(_))
    }
}
