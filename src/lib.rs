// localdata - tool-call normalization and dispatch for local models
// Library exports

pub mod agent;
pub mod cli;
pub mod config;
pub mod errors;
pub mod logging;
pub mod providers;
pub mod tools;

pub use agent::AgentSession;
pub use errors::{ActionError, CollaboratorError, ErrorKind};
pub use tools::{NormalizedAction, RawAction, ResultEnvelope, ToolRegistry};
