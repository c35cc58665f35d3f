//! Model provider implementations for reagent.
//!
//! All providers implement the `reagent_core::Provider` trait.
//! [`build_from_config`] selects the backend named by configuration.

pub mod gemini;
pub mod openai_compat;
pub mod router;

pub use gemini::GeminiProvider;
pub use openai_compat::OpenAiCompatProvider;
pub use router::{build_from_config, is_local, model_name};

use reagent_core::error::ProviderError;

/// Shared HTTP client settings. The agent loop enforces its own model
/// timeout; this one only guards against a hung connection.
pub(crate) fn http_client() -> reqwest::Client {
    reqwest::Client::builder()
        .timeout(std::time::Duration::from_secs(120))
        .build()
        .unwrap_or_default()
}

/// Map a non-200 status to a provider error.
pub(crate) fn error_for_status(status: u16, body: String) -> ProviderError {
    match status {
        429 => ProviderError::RateLimited {
            retry_after_secs: 5,
        },
        401 | 403 => ProviderError::AuthenticationFailed(
            "Invalid API key or insufficient permissions".into(),
        ),
        _ => ProviderError::ApiError {
            status_code: status,
            message: body,
        },
    }
}
