// Tool-call pipeline
//
// Model reply -> decoder (RawAction) -> normalizer (NormalizedAction)
// -> dispatcher (ResultEnvelope). The registry is the schema source for the
// normalizer and the gate for the dispatcher; collaborators do the work.

pub mod collaborator;
pub mod decoder;
pub mod dispatcher;
pub mod implementations;
pub mod local;
pub mod mcp;
pub mod normalizer;
pub mod registry;
pub mod types;

pub use collaborator::ToolCollaborator;
pub use decoder::decode;
pub use dispatcher::Dispatcher;
pub use local::{LocalToolbox, Tool, ToolContext};
pub use mcp::{McpHttpClient, McpServerConfig};
pub use normalizer::{AliasTable, ArgumentNormalizer, NormalizerConfig};
pub use registry::ToolRegistry;
pub use types::{
    NormalizedAction, ParamType, ParameterSpec, RawAction, ResultEnvelope, ToolDefinition,
    ToolDescriptor, ToolInputSchema,
};
