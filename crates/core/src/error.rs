//! Error types for the reagent domain.
//!
//! Uses `thiserror` for ergonomic error definitions.
//! Each bounded context has its own error enum.
//!
//! Only a model failure ever escapes an agent run, so [`Error`] has a
//! single variant: malformed replies and tool failures are folded back
//! into the transcript as observations.

use thiserror::Error;

/// The error returned by an agent run.
#[derive(Debug, Error)]
pub enum Error {
    /// The model could not be reached or did not answer in time.
    #[error("Model invocation failed: {0}")]
    Provider(#[from] ProviderError),
}

/// Result type alias using our Error.
pub type Result<T> = std::result::Result<T, Error>;

// --- Bounded context errors ---

#[derive(Debug, Clone, Error)]
pub enum ProviderError {
    #[error("API request failed: {message} (status: {status_code})")]
    ApiError { status_code: u16, message: String },

    #[error("Rate limited by provider, retry after {retry_after_secs}s")]
    RateLimited { retry_after_secs: u64 },

    #[error("Authentication failed: {0}")]
    AuthenticationFailed(String),

    #[error("Provider not configured: {0}")]
    NotConfigured(String),

    #[error("Request timed out: {0}")]
    Timeout(String),

    #[error("Network error: {0}")]
    Network(String),

    #[error("Model returned no text: {0}")]
    EmptyResponse(String),
}

#[derive(Debug, Clone, Error)]
pub enum ToolError {
    #[error("Tool not found: {0}")]
    NotFound(String),

    #[error("Tool execution failed: {tool_name}: {reason}")]
    ExecutionFailed { tool_name: String, reason: String },

    #[error("Tool timed out: {tool_name} after {timeout_secs}s")]
    Timeout { tool_name: String, timeout_secs: u64 },

    #[error("Invalid tool input: {0}")]
    InvalidInput(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    #[error("Malformed model response: {reason}")]
    MalformedResponse { reason: String },
}

impl ParseError {
    pub fn malformed(reason: impl Into<String>) -> Self {
        Self::MalformedResponse {
            reason: reason.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn provider_error_displays_correctly() {
        let err = Error::Provider(ProviderError::ApiError {
            status_code: 429,
            message: "Too many requests".into(),
        });
        assert!(err.to_string().contains("429"));
        assert!(err.to_string().contains("Too many requests"));
        assert!(err.to_string().starts_with("Model invocation failed"));
    }

    #[test]
    fn tool_error_displays_correctly() {
        let err = ToolError::Timeout {
            tool_name: "google".into(),
            timeout_secs: 30,
        };
        assert!(err.to_string().contains("google"));
        assert!(err.to_string().contains("30s"));
    }

    #[test]
    fn provider_error_converts_into_run_error() {
        fn fails() -> Result<()> {
            let call: std::result::Result<(), ProviderError> =
                Err(ProviderError::Timeout("gemini did not respond within 60s".into()));
            call?;
            Ok(())
        }
        assert!(matches!(fails(), Err(Error::Provider(ProviderError::Timeout(_)))));
    }

    #[test]
    fn parse_error_carries_reason() {
        let err = ParseError::malformed("no Action or Final Answer");
        assert_eq!(
            err.to_string(),
            "Malformed model response: no Action or Final Answer"
        );
    }
}
