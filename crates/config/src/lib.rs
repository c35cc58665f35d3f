//! Configuration loading, validation, and management for reagent.
//!
//! Loads configuration from `~/.reagent/config.toml` (or an explicit path)
//! with environment variable overrides. Validates all settings at startup.
//! The resulting [`AppConfig`] is an ordinary value handed to whichever
//! component needs it; there is no process-wide instance.

use reagent_core::ConflictPolicy;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// The root configuration structure.
///
/// Maps directly to `~/.reagent/config.toml`.
#[derive(Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// API key (can be overridden per-provider)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    /// Default model backend
    #[serde(default = "default_provider")]
    pub default_provider: String,

    /// Model for every backend; when unset each backend uses its own default
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_model: Option<String>,

    /// Sampling temperature
    #[serde(default = "default_temperature")]
    pub default_temperature: f32,

    /// Max tokens per model response
    #[serde(default = "default_max_tokens")]
    pub default_max_tokens: u32,

    /// Provider-specific configurations
    #[serde(default)]
    pub providers: HashMap<String, ProviderConfig>,

    /// Agent loop limits and policies
    #[serde(default)]
    pub agent: AgentConfig,

    /// Built-in tool settings
    #[serde(default)]
    pub tools: ToolsConfig,

    /// HTTP gateway configuration
    #[serde(default)]
    pub gateway: GatewayConfig,

    /// Log output configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

fn default_provider() -> String {
    "openai".into()
}
fn default_temperature() -> f32 {
    0.2
}
fn default_max_tokens() -> u32 {
    1024
}

/// Redact a secret string for Debug output.
fn redact(s: &Option<String>) -> &'static str {
    match s {
        Some(_) => "[REDACTED]",
        None => "None",
    }
}

impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field("api_key", &redact(&self.api_key))
            .field("default_provider", &self.default_provider)
            .field("default_model", &self.default_model)
            .field("default_temperature", &self.default_temperature)
            .field("default_max_tokens", &self.default_max_tokens)
            .field("providers", &self.providers)
            .field("agent", &self.agent)
            .field("tools", &self.tools)
            .field("gateway", &self.gateway)
            .field("logging", &self.logging)
            .finish()
    }
}

impl std::fmt::Debug for ProviderConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderConfig")
            .field("api_key", &redact(&self.api_key))
            .field("api_url", &self.api_url)
            .field("default_model", &self.default_model)
            .finish()
    }
}

impl std::fmt::Debug for ToolsConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ToolsConfig")
            .field("wikipedia_url", &self.wikipedia_url)
            .field("serp_url", &self.serp_url)
            .field("serp_api_key", &redact(&self.serp_api_key))
            .field("max_results", &self.max_results)
            .field("timeout_secs", &self.timeout_secs)
            .finish()
    }
}

#[derive(Clone, Serialize, Deserialize)]
pub struct ProviderConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_url: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_model: Option<String>,
}

/// Limits and policies of the ReAct loop.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentConfig {
    /// Maximum model calls per query before a degraded answer is returned
    #[serde(default = "default_max_steps")]
    pub max_steps: u32,

    #[serde(default = "default_model_timeout_secs")]
    pub model_timeout_secs: u64,

    #[serde(default = "default_tool_timeout_secs")]
    pub tool_timeout_secs: u64,

    /// Observations longer than this are truncated before entering the transcript
    #[serde(default = "default_max_observation_chars")]
    pub max_observation_chars: usize,

    /// Which step wins when a response holds both an Action and a Final Answer
    #[serde(default)]
    pub conflict_policy: ConflictPolicy,
}

fn default_max_steps() -> u32 {
    8
}
fn default_model_timeout_secs() -> u64 {
    60
}
fn default_tool_timeout_secs() -> u64 {
    30
}
fn default_max_observation_chars() -> usize {
    4000
}

impl AgentConfig {
    pub fn model_timeout(&self) -> Duration {
        Duration::from_secs(self.model_timeout_secs)
    }

    pub fn tool_timeout(&self) -> Duration {
        Duration::from_secs(self.tool_timeout_secs)
    }
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            max_steps: default_max_steps(),
            model_timeout_secs: default_model_timeout_secs(),
            tool_timeout_secs: default_tool_timeout_secs(),
            max_observation_chars: default_max_observation_chars(),
            conflict_policy: ConflictPolicy::default(),
        }
    }
}

#[derive(Clone, Serialize, Deserialize)]
pub struct ToolsConfig {
    #[serde(default = "default_wikipedia_url")]
    pub wikipedia_url: String,

    #[serde(default = "default_serp_url")]
    pub serp_url: String,

    /// SerpAPI key; the `google` tool is only registered when set
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub serp_api_key: Option<String>,

    /// Search results returned per call
    #[serde(default = "default_max_results")]
    pub max_results: usize,

    /// HTTP timeout for tool requests
    #[serde(default = "default_tool_http_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_wikipedia_url() -> String {
    "https://en.wikipedia.org/w/api.php".into()
}
fn default_serp_url() -> String {
    "https://serpapi.com/search.json".into()
}
fn default_max_results() -> usize {
    3
}
fn default_tool_http_timeout_secs() -> u64 {
    20
}

impl Default for ToolsConfig {
    fn default() -> Self {
        Self {
            wikipedia_url: default_wikipedia_url(),
            serp_url: default_serp_url(),
            serp_api_key: None,
            max_results: default_max_results(),
            timeout_secs: default_tool_http_timeout_secs(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayConfig {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,

    #[serde(default = "default_max_body_bytes")]
    pub max_body_bytes: usize,

    /// Origins allowed by CORS. Empty = no CORS headers.
    #[serde(default)]
    pub allowed_origins: Vec<String>,
}

fn default_host() -> String {
    "0.0.0.0".into()
}
fn default_port() -> u16 {
    8080
}
fn default_max_body_bytes() -> usize {
    1024 * 1024
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            max_body_bytes: default_max_body_bytes(),
            allowed_origins: vec![],
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Default filter directive when `RUST_LOG` is unset
    #[serde(default = "default_log_level")]
    pub level: String,

    #[serde(default)]
    pub format: LogFormat,
}

fn default_log_level() -> String {
    "info".into()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: LogFormat::default(),
        }
    }
}

impl AppConfig {
    /// Load configuration from `path`, or from `~/.reagent/config.toml`
    /// when no path is given, then apply environment overrides:
    /// - `REAGENT_PROVIDER`, `REAGENT_MODEL`, `REAGENT_MAX_STEPS`
    /// - `REAGENT_API_KEY`, then the provider's own variable
    ///   (see [`provider_key_var`])
    /// - `SERPAPI_API_KEY`
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut config = Self::load_from(&Self::resolve_path(path))?;
        config.apply_env_overrides(|key| std::env::var(key).ok());
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a specific file path.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            tracing::info!("No config file found at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        let config: Self = toml::from_str(&content).map_err(|e| ConfigError::ParseError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        config.validate()?;
        Ok(config)
    }

    /// Apply overrides from an environment lookup. Missing or blank
    /// variables leave the file value untouched.
    pub fn apply_env_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        let var = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(provider) = var("REAGENT_PROVIDER") {
            self.default_provider = provider;
        }

        if let Some(model) = var("REAGENT_MODEL") {
            self.default_model = Some(model);
        }

        // The provider is settled by now, so its own key variable is known.
        if self.api_key.is_none() {
            self.api_key = var("REAGENT_API_KEY")
                .or_else(|| provider_key_var(&self.default_provider).and_then(var));
        }

        if let Some(steps) = var("REAGENT_MAX_STEPS") {
            match steps.parse() {
                Ok(n) => self.agent.max_steps = n,
                Err(_) => tracing::warn!(value = %steps, "Ignoring non-numeric REAGENT_MAX_STEPS"),
            }
        }

        if self.tools.serp_api_key.is_none() {
            self.tools.serp_api_key = var("SERPAPI_API_KEY");
        }
    }

    /// The file [`AppConfig::load`] reads for `path`.
    pub fn resolve_path(path: Option<&Path>) -> PathBuf {
        path.map_or_else(|| Self::config_dir().join("config.toml"), Path::to_path_buf)
    }

    /// Get the configuration directory path.
    pub fn config_dir() -> PathBuf {
        dirs_home().join(".reagent")
    }

    /// Validate the configuration.
    fn validate(&self) -> Result<(), ConfigError> {
        if self.default_temperature < 0.0 || self.default_temperature > 2.0 {
            return Err(ConfigError::ValidationError(
                "default_temperature must be between 0.0 and 2.0".into(),
            ));
        }

        if self.agent.max_steps == 0 {
            return Err(ConfigError::ValidationError(
                "agent.max_steps must be at least 1".into(),
            ));
        }

        if self.agent.model_timeout_secs == 0 || self.agent.tool_timeout_secs == 0 {
            return Err(ConfigError::ValidationError(
                "agent timeouts must be greater than zero".into(),
            ));
        }

        if self.tools.max_results == 0 {
            return Err(ConfigError::ValidationError(
                "tools.max_results must be at least 1".into(),
            ));
        }

        Ok(())
    }

    /// Check if an API key is available for the default provider.
    pub fn has_api_key(&self) -> bool {
        self.api_key.is_some()
            || self
                .providers
                .get(&self.default_provider)
                .is_some_and(|p| p.api_key.is_some())
    }

    /// Generate a default config TOML string (for the `init` command).
    pub fn default_toml() -> String {
        let config = Self::default();
        toml::to_string_pretty(&config).unwrap_or_default()
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            default_provider: default_provider(),
            default_model: None,
            default_temperature: default_temperature(),
            default_max_tokens: default_max_tokens(),
            providers: HashMap::new(),
            agent: AgentConfig::default(),
            tools: ToolsConfig::default(),
            gateway: GatewayConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

/// The vendor environment variable holding the key for `provider`.
///
/// Other OpenAI-compatible backends have no well-known variable and only
/// read `REAGENT_API_KEY`, so a vendor key is never sent to another vendor.
pub fn provider_key_var(provider: &str) -> Option<&'static str> {
    match provider {
        "openai" => Some("OPENAI_API_KEY"),
        "gemini" => Some("GEMINI_API_KEY"),
        "openrouter" => Some("OPENROUTER_API_KEY"),
        _ => None,
    }
}

/// Get the user's home directory.
fn dirs_home() -> PathBuf {
    #[cfg(target_os = "windows")]
    {
        std::env::var("USERPROFILE")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("C:\\Users\\Default"))
    }
    #[cfg(not(target_os = "windows"))]
    {
        std::env::var("HOME")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("/tmp"))
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file at {path}: {reason}")]
    ReadError { path: PathBuf, reason: String },

    #[error("Failed to parse config file at {path}: {reason}")]
    ParseError { path: PathBuf, reason: String },

    #[error("Configuration validation failed: {0}")]
    ValidationError(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn default_config_is_valid() {
        let config = AppConfig::default();
        assert_eq!(config.default_provider, "openai");
        assert_eq!(config.agent.max_steps, 8);
        assert_eq!(config.gateway.port, 8080);
        assert_eq!(config.agent.conflict_policy, ConflictPolicy::PreferAction);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn config_roundtrip_toml() {
        let config = AppConfig::default();
        let toml_str = toml::to_string_pretty(&config).unwrap();
        let parsed: AppConfig = toml::from_str(&toml_str).unwrap();
        assert_eq!(parsed.default_provider, config.default_provider);
        assert_eq!(parsed.agent.max_steps, config.agent.max_steps);
    }

    #[test]
    fn invalid_temperature_rejected() {
        let config = AppConfig {
            default_temperature: 5.0,
            ..AppConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn zero_max_steps_rejected() {
        let mut config = AppConfig::default();
        config.agent.max_steps = 0;
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("max_steps"));
    }

    #[test]
    fn missing_config_file_returns_defaults() {
        let result = AppConfig::load_from(Path::new("/nonexistent/config.toml"));
        let config = result.unwrap();
        assert_eq!(config.default_provider, "openai");
    }

    #[test]
    fn resolve_path_prefers_the_given_file() {
        let custom = Path::new("/etc/reagent/agent.toml");
        assert_eq!(AppConfig::resolve_path(Some(custom)), custom);
        assert_eq!(
            AppConfig::resolve_path(None),
            AppConfig::config_dir().join("config.toml")
        );
    }

    #[test]
    fn parses_partial_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(
            &path,
            r#"
default_provider = "gemini"
default_model = "gemini-1.5-flash"

[agent]
max_steps = 3
conflict_policy = "prefer_final"

[tools]
serp_api_key = "serp-test"
"#,
        )
        .unwrap();

        let config = AppConfig::load_from(&path).unwrap();
        assert_eq!(config.default_provider, "gemini");
        assert_eq!(config.agent.max_steps, 3);
        assert_eq!(config.agent.tool_timeout_secs, 30);
        assert_eq!(config.agent.conflict_policy, ConflictPolicy::PreferFinal);
        assert_eq!(config.tools.serp_api_key.as_deref(), Some("serp-test"));
        assert_eq!(config.tools.max_results, 3);
    }

    #[test]
    fn malformed_file_is_a_parse_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "agent = [not toml").unwrap();
        assert!(matches!(
            AppConfig::load_from(&path),
            Err(ConfigError::ParseError { .. })
        ));
    }

    #[test]
    fn env_overrides_apply_in_priority_order() {
        let mut config = AppConfig::default();
        config.apply_env_overrides(env(&[
            ("OPENAI_API_KEY", "sk-openai"),
            ("GEMINI_API_KEY", "gm-key"),
            ("REAGENT_MODEL", "gpt-4o"),
            ("REAGENT_MAX_STEPS", "5"),
            ("SERPAPI_API_KEY", "serp"),
        ]));
        assert_eq!(config.api_key.as_deref(), Some("sk-openai"));
        assert_eq!(config.default_model.as_deref(), Some("gpt-4o"));
        assert_eq!(config.agent.max_steps, 5);
        assert_eq!(config.tools.serp_api_key.as_deref(), Some("serp"));
    }

    #[test]
    fn gemini_provider_takes_the_gemini_key() {
        let mut config = AppConfig::default();
        config.apply_env_overrides(env(&[
            ("REAGENT_PROVIDER", "gemini"),
            ("OPENAI_API_KEY", "sk-openai"),
            ("GEMINI_API_KEY", "gm-key"),
        ]));
        assert_eq!(config.default_provider, "gemini");
        assert_eq!(config.api_key.as_deref(), Some("gm-key"));
        assert_eq!(config.default_model, None);
    }

    #[test]
    fn provider_from_file_selects_the_key_variable() {
        let mut config = AppConfig {
            default_provider: "openrouter".into(),
            ..AppConfig::default()
        };
        config.apply_env_overrides(env(&[
            ("OPENAI_API_KEY", "sk-openai"),
            ("OPENROUTER_API_KEY", "or-key"),
        ]));
        assert_eq!(config.api_key.as_deref(), Some("or-key"));
    }

    #[test]
    fn vendor_keys_are_not_sent_to_other_backends() {
        let mut config = AppConfig {
            default_provider: "groq".into(),
            ..AppConfig::default()
        };
        config.apply_env_overrides(env(&[
            ("OPENAI_API_KEY", "sk-openai"),
            ("GEMINI_API_KEY", "gm-key"),
        ]));
        assert_eq!(config.api_key, None);

        config.apply_env_overrides(env(&[("REAGENT_API_KEY", "groq-key")]));
        assert_eq!(config.api_key.as_deref(), Some("groq-key"));
    }

    #[test]
    fn reagent_key_wins_over_vendor_key() {
        let mut config = AppConfig::default();
        config.apply_env_overrides(env(&[
            ("REAGENT_API_KEY", "rg-key"),
            ("OPENAI_API_KEY", "sk-openai"),
        ]));
        assert_eq!(config.api_key.as_deref(), Some("rg-key"));
    }

    #[test]
    fn has_api_key_checks_the_default_provider() {
        let mut config = AppConfig::default();
        assert!(!config.has_api_key());
        config.providers.insert(
            "openai".into(),
            ProviderConfig {
                api_key: Some("sk".into()),
                api_url: None,
                default_model: None,
            },
        );
        assert!(config.has_api_key());
    }

    #[test]
    fn env_does_not_replace_file_api_key() {
        let mut config = AppConfig {
            api_key: Some("from-file".into()),
            ..AppConfig::default()
        };
        config.apply_env_overrides(env(&[("REAGENT_API_KEY", "from-env"), ("REAGENT_MAX_STEPS", "lots")]));
        assert_eq!(config.api_key.as_deref(), Some("from-file"));
        assert_eq!(config.agent.max_steps, 8);
    }

    #[test]
    fn debug_redacts_secrets() {
        let mut config = AppConfig {
            api_key: Some("sk-secret".into()),
            ..AppConfig::default()
        };
        config.tools.serp_api_key = Some("serp-secret".into());
        let debug = format!("{config:?}");
        assert!(!debug.contains("sk-secret"));
        assert!(!debug.contains("serp-secret"));
        assert!(debug.contains("[REDACTED]"));
    }

    #[test]
    fn default_toml_generation() {
        let toml_str = AppConfig::default_toml();
        assert!(toml_str.contains("default_provider = \"openai\""));
        assert!(!toml_str.contains("default_model"));
        assert!(toml_str.contains("max_steps = 8"));
    }

    #[test]
    fn timeouts_as_durations() {
        let agent = AgentConfig::default();
        assert_eq!(agent.model_timeout(), Duration::from_secs(60));
        assert_eq!(agent.tool_timeout(), Duration::from_secs(30));
    }
}
