//! Provider selection: builds the configured model backend.

use reagent_config::AppConfig;
use reagent_core::error::ProviderError;
use reagent_core::provider::Provider;
use std::sync::Arc;
use tracing::info;

use crate::gemini::GeminiProvider;
use crate::openai_compat::OpenAiCompatProvider;

/// Build the default provider from configuration.
///
/// `[providers.<name>]` entries override the top-level key, model and URL.
/// Hosted backends without an API key are rejected here rather than on the
/// first request.
pub fn build_from_config(config: &AppConfig) -> Result<Arc<dyn Provider>, ProviderError> {
    let name = config.default_provider.as_str();
    let provider_config = config.providers.get(name);

    let api_key = provider_config
        .and_then(|p| p.api_key.clone())
        .or_else(|| config.api_key.clone());

    let model = model_name(config);

    let base_url = provider_config
        .and_then(|p| p.api_url.clone())
        .or_else(|| default_base_url(name))
        .ok_or_else(|| {
            ProviderError::NotConfigured(format!(
                "unknown provider '{name}'; set providers.{name}.api_url"
            ))
        })?;

    let api_key = match api_key {
        Some(key) => key,
        None if is_local(name) => String::new(),
        None => {
            return Err(ProviderError::NotConfigured(format!(
                "no API key for provider '{name}'; set api_key in config or {}",
                key_hint(name)
            )));
        }
    };

    let provider: Arc<dyn Provider> = if name == "gemini" {
        let mut p = GeminiProvider::new(api_key)
            .with_model(&model)
            .with_temperature(config.default_temperature)
            .with_max_tokens(config.default_max_tokens);
        if provider_config.is_some_and(|p| p.api_url.is_some()) {
            p = p.with_base_url(base_url);
        }
        Arc::new(p)
    } else {
        Arc::new(
            OpenAiCompatProvider::new(name, base_url, api_key)
                .with_model(&model)
                .with_temperature(config.default_temperature)
                .with_max_tokens(config.default_max_tokens),
        )
    };
    info!(provider = name, model = %model, "Using model provider");

    Ok(provider)
}

/// The model the default provider will be asked for:
/// `[providers.<name>] default_model`, then `default_model`, then the
/// backend's own default.
pub fn model_name(config: &AppConfig) -> String {
    let name = config.default_provider.as_str();
    config
        .providers
        .get(name)
        .and_then(|p| p.default_model.clone())
        .or_else(|| config.default_model.clone())
        .unwrap_or_else(|| {
            if name == "gemini" {
                crate::gemini::DEFAULT_MODEL.into()
            } else {
                crate::openai_compat::DEFAULT_MODEL.into()
            }
        })
}

fn key_hint(provider_name: &str) -> String {
    match reagent_config::provider_key_var(provider_name) {
        Some(var) => format!("REAGENT_API_KEY or {var}"),
        None => "REAGENT_API_KEY".into(),
    }
}

/// Backends that run on the user's machine and take no API key.
pub fn is_local(provider_name: &str) -> bool {
    matches!(provider_name, "ollama" | "vllm" | "llamacpp" | "llama.cpp")
}

/// Get the default base URL for well-known providers.
pub fn default_base_url(provider_name: &str) -> Option<String> {
    let url = match provider_name {
        "openai" => "https://api.openai.com/v1",
        "openrouter" => "https://openrouter.ai/api/v1",
        "gemini" => "https://generativelanguage.googleapis.com/v1beta",
        "ollama" => "http://localhost:11434/v1",
        "deepseek" => "https://api.deepseek.com/v1",
        "groq" => "https://api.groq.com/openai/v1",
        "together" => "https://api.together.xyz/v1",
        "fireworks" => "https://api.fireworks.ai/inference/v1",
        "vllm" => "http://localhost:8000/v1",
        "llamacpp" | "llama.cpp" => "http://localhost:8080/v1",
        _ => return None,
    };
    Some(url.into())
}

#[cfg(test)]
mod tests {
    use super::*;
    use reagent_config::ProviderConfig;

    #[test]
    fn default_base_urls() {
        assert!(default_base_url("openrouter").unwrap().contains("openrouter.ai"));
        assert!(default_base_url("openai").unwrap().contains("api.openai.com"));
        assert!(default_base_url("gemini").unwrap().contains("generativelanguage"));
        assert!(default_base_url("mystery").is_none());
    }

    #[test]
    fn missing_key_is_not_configured() {
        let config = AppConfig::default();
        let err = build_from_config(&config).err().unwrap();
        assert!(matches!(err, ProviderError::NotConfigured(_)));
    }

    #[test]
    fn builds_openai_with_key() {
        let config = AppConfig {
            api_key: Some("sk-test".into()),
            ..AppConfig::default()
        };
        let provider = build_from_config(&config).unwrap();
        assert_eq!(provider.name(), "openai");
    }

    #[test]
    fn builds_gemini() {
        let config = AppConfig {
            api_key: Some("gm-test".into()),
            default_provider: "gemini".into(),
            default_model: Some("gemini-1.5-pro".into()),
            ..AppConfig::default()
        };
        assert_eq!(build_from_config(&config).unwrap().name(), "gemini");
    }

    #[test]
    fn unset_model_uses_the_backend_default() {
        let gemini = AppConfig {
            api_key: Some("gm-test".into()),
            default_provider: "gemini".into(),
            ..AppConfig::default()
        };
        assert_eq!(model_name(&gemini), crate::gemini::DEFAULT_MODEL);

        let openai = AppConfig {
            api_key: Some("sk-test".into()),
            ..AppConfig::default()
        };
        assert_eq!(model_name(&openai), crate::openai_compat::DEFAULT_MODEL);
    }

    #[test]
    fn model_precedence() {
        let mut config = AppConfig {
            api_key: Some("gm-test".into()),
            default_provider: "gemini".into(),
            default_model: Some("gemini-1.5-pro".into()),
            ..AppConfig::default()
        };
        assert_eq!(model_name(&config), "gemini-1.5-pro");

        config.providers.insert(
            "gemini".into(),
            ProviderConfig {
                api_key: None,
                api_url: None,
                default_model: Some("gemini-2.0-flash".into()),
            },
        );
        assert_eq!(model_name(&config), "gemini-2.0-flash");
    }

    #[test]
    fn missing_key_error_names_the_vendor_variable() {
        let config = AppConfig {
            default_provider: "gemini".into(),
            ..AppConfig::default()
        };
        let err = build_from_config(&config).err().unwrap();
        assert!(err.to_string().contains("GEMINI_API_KEY"));
    }

    #[test]
    fn local_backends_need_no_key() {
        let config = AppConfig {
            default_provider: "ollama".into(),
            ..AppConfig::default()
        };
        assert_eq!(build_from_config(&config).unwrap().name(), "ollama");
    }

    #[test]
    fn custom_provider_needs_url() {
        let mut config = AppConfig {
            api_key: Some("k".into()),
            default_provider: "inhouse".into(),
            ..AppConfig::default()
        };
        assert!(build_from_config(&config).is_err());

        config.providers.insert(
            "inhouse".into(),
            ProviderConfig {
                api_key: None,
                api_url: Some("http://llm.internal/v1".into()),
                default_model: Some("mixtral".into()),
            },
        );
        assert_eq!(build_from_config(&config).unwrap().name(), "inhouse");
    }
}
