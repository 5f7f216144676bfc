//! LLM provider trait definition

use crate::{CompletionRequest, CompletionResponse, Result};
use async_trait::async_trait;

/// Trait for LLM providers
///
/// Implementations give access to a hosted model service. The caller never
/// inspects the credential; it lives inside the provider.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait LLMProvider: Send + Sync {
    /// Generate a completion from the LLM
    ///
    /// # Arguments
    ///
    /// * `request` - The completion request with model and prompt
    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse>;

    /// List identifiers of models that can serve `complete`
    async fn list_models(&self) -> Result<Vec<String>>;

    /// Get the provider name (e.g., "gemini")
    fn name(&self) -> &str;
}
