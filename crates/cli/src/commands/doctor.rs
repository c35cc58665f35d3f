//! `reagent doctor`: Diagnose configuration and model backend health.

use reagent_config::AppConfig;
use std::fmt;
use std::path::Path;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Status {
    Pass,
    Warn,
    Fail,
}

#[derive(Debug)]
struct Check {
    status: Status,
    message: String,
}

impl Check {
    fn pass(message: impl Into<String>) -> Self {
        Self {
            status: Status::Pass,
            message: message.into(),
        }
    }

    fn warn(message: impl Into<String>) -> Self {
        Self {
            status: Status::Warn,
            message: message.into(),
        }
    }

    fn fail(message: impl Into<String>) -> Self {
        Self {
            status: Status::Fail,
            message: message.into(),
        }
    }
}

impl fmt::Display for Check {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mark = match self.status {
            Status::Pass => "ok  ",
            Status::Warn => "warn",
            Status::Fail => "FAIL",
        };
        write!(f, "[{mark}] {}", self.message)
    }
}

pub async fn run(path: &Path) -> Result<(), Box<dyn std::error::Error>> {
    println!("reagent doctor");
    println!("==============\n");

    let mut checks = Vec::new();
    match AppConfig::load(Some(path)) {
        Ok(config) => {
            if path.exists() {
                checks.push(Check::pass(format!("Config file valid: {}", path.display())));
            } else {
                checks.push(Check::warn(format!(
                    "No config file at {}, using defaults; run `reagent init`",
                    path.display()
                )));
            }
            checks.extend(config_checks(&config));
            if let Some(check) = backend_check(&config).await {
                checks.push(check);
            }
        }
        Err(e) => checks.push(Check::fail(format!("Config invalid: {e}"))),
    }

    for check in &checks {
        println!("  {check}");
    }

    let issues = checks.iter().filter(|c| c.status != Status::Pass).count();
    println!();
    if issues == 0 {
        println!("  All checks passed.");
    } else {
        println!("  {issues} issue(s) found. See above for details.");
    }

    Ok(())
}

/// Checks that need no network access.
fn config_checks(config: &AppConfig) -> Vec<Check> {
    let provider = config.default_provider.as_str();
    let mut checks = Vec::new();

    if config.has_api_key() {
        checks.push(Check::pass(format!("API key configured for {provider}")));
    } else if reagent_providers::is_local(provider) {
        checks.push(Check::pass(format!("{provider} runs locally, no API key needed")));
    } else {
        let hint = match reagent_config::provider_key_var(provider) {
            Some(var) => format!("REAGENT_API_KEY or {var}"),
            None => "REAGENT_API_KEY".into(),
        };
        checks.push(Check::fail(format!(
            "No API key for {provider}: set api_key in the config or {hint}"
        )));
    }

    checks.push(Check::pass(format!(
        "Model: {}",
        reagent_providers::model_name(config)
    )));

    let registry = reagent_tools::default_registry(&config.tools);
    checks.push(Check::pass(format!("Tools: {}", registry.names().join(", "))));
    if config.tools.serp_api_key.is_none() {
        checks.push(Check::warn(
            "google tool disabled: set SERPAPI_API_KEY or tools.serp_api_key",
        ));
    }

    checks
}

/// Ask the backend whether it is reachable. `None` when no provider can be
/// built; [`config_checks`] already reports why.
async fn backend_check(config: &AppConfig) -> Option<Check> {
    let provider = reagent_providers::build_from_config(config).ok()?;
    let name = &config.default_provider;

    let check = match tokio::time::timeout(config.agent.model_timeout(), provider.health_check())
        .await
    {
        Ok(Ok(true)) => Check::pass(format!("{name} backend reachable")),
        Ok(Ok(false)) => Check::fail(format!("{name} backend rejected the health check")),
        Ok(Err(e)) => Check::fail(format!("{name} backend unreachable: {e}")),
        Err(_) => Check::fail(format!(
            "{name} backend did not answer within {}s",
            config.agent.model_timeout_secs
        )),
    };
    Some(check)
}
