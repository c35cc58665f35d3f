//! Built-in tool implementations for reagent.
//!
//! Tools give the agent access to information it was not trained on:
//! encyclopedia lookups and live web search. Each takes a single string
//! and returns a single string observation.

pub mod google;
pub mod wikipedia;

use reagent_config::ToolsConfig;
use reagent_core::tool::ToolRegistry;
use std::sync::Arc;
use std::time::Duration;

pub use google::GoogleSearchTool;
pub use wikipedia::WikipediaTool;

const USER_AGENT: &str = concat!("reagent/", env!("CARGO_PKG_VERSION"));

pub(crate) fn http_client(timeout: Duration) -> reqwest::Client {
    reqwest::Client::builder()
        .timeout(timeout)
        .user_agent(USER_AGENT)
        .build()
        .unwrap_or_default()
}

/// Create a tool registry with the built-in tools.
///
/// `wikipedia` is always registered. `google` needs a SerpAPI key and is
/// skipped without one.
pub fn default_registry(config: &ToolsConfig) -> ToolRegistry {
    let timeout = Duration::from_secs(config.timeout_secs);
    let mut registry = ToolRegistry::new();

    registry.register(Arc::new(WikipediaTool::new(
        &config.wikipedia_url,
        config.max_results,
        timeout,
    )));

    match &config.serp_api_key {
        Some(key) => registry.register(Arc::new(GoogleSearchTool::new(
            &config.serp_url,
            key,
            config.max_results,
            timeout,
        ))),
        None => tracing::info!("No SerpAPI key configured, google tool disabled"),
    }

    registry
}
