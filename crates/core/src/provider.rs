//! Provider trait: the abstraction over the language model.
//!
//! The model is consumed as a black-box text-completion function: a prompt
//! goes in, text comes out. No session state is kept between calls; the
//! agent loop re-sends the rendered transcript every turn.
//!
//! Implementations: OpenAI-compatible endpoints, Gemini.

use async_trait::async_trait;

use crate::error::ProviderError;

/// Stop sequence that keeps ReAct models from inventing their own
/// observations.
pub const REACT_STOP_SEQUENCE: &str = "\nObservation:";

/// The core Provider trait.
///
/// The agent loop calls `generate()` without knowing which backend is being
/// used.
#[async_trait]
pub trait Provider: Send + Sync {
    /// A human-readable name for this provider (e.g., "openai", "gemini").
    fn name(&self) -> &str;

    /// Complete the prompt and return the raw model text.
    async fn generate(&self, prompt: &str) -> std::result::Result<String, ProviderError>;

    /// Health check: can we reach the provider?
    async fn health_check(&self) -> std::result::Result<bool, ProviderError> {
        Ok(true)
    }
}
