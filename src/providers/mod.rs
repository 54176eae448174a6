// Model collaborator
//
// The local model runtime that turns a user query plus the tool catalog into
// a proposed action. Only Ollama is implemented; the trait is the seam the
// agent session and its tests work against.

use async_trait::async_trait;

use crate::errors::CollaboratorError;

pub mod ollama;
pub mod types;

pub use ollama::OllamaProvider;
pub use types::{ProviderRequest, ProviderResponse};

/// Trait for LLM providers
#[async_trait]
pub trait LlmProvider: Send + Sync {
    /// Send one request and wait for the complete reply
    async fn send_message(
        &self,
        request: &ProviderRequest,
    ) -> Result<ProviderResponse, CollaboratorError>;

    /// Provider name used in logs and timeout messages
    fn name(&self) -> &str;

    /// Model used when the request leaves `model` empty
    fn default_model(&self) -> &str;

    /// Check if the provider supports tool/function calling
    fn supports_tools(&self) -> bool {
        true
    }
}
