//! `reagent config`: Show the effective configuration.

use reagent_config::AppConfig;
use std::path::Path;

const REDACTED: &str = "[REDACTED]";

pub fn show(config: &AppConfig, path: &Path) -> Result<(), Box<dyn std::error::Error>> {
    println!("{}", render(config, path)?);
    Ok(())
}

/// The file the values came from, then the redacted TOML.
fn render(config: &AppConfig, path: &Path) -> Result<String, toml::ser::Error> {
    let source = if path.exists() { "" } else { " (not found, defaults)" };
    Ok(format!(
        "# {}{source}\n{}",
        path.display(),
        toml::to_string_pretty(&redacted(config))?
    ))
}

/// A copy of `config` with every secret replaced.
fn redacted(config: &AppConfig) -> AppConfig {
    let mut config = config.clone();
    let hide = |key: &mut Option<String>| {
        if key.is_some() {
            *key = Some(REDACTED.into());
        }
    };

    hide(&mut config.api_key);
    hide(&mut config.tools.serp_api_key);
    for provider in config.providers.values_mut() {
        hide(&mut provider.api_key);
    }
    config
}

#[cfg(test)]
mod tests {
    use super::*;
    use reagent_config::ProviderConfig;

    #[test]
    fn secrets_are_hidden() {
        let mut config = AppConfig {
            api_key: Some("sk-live".into()),
            ..AppConfig::default()
        };
        config.tools.serp_api_key = Some("serp-live".into());
        config.providers.insert(
            "gemini".into(),
            ProviderConfig {
                api_key: Some("gm-live".into()),
                api_url: None,
                default_model: None,
            },
        );

        let out = toml::to_string_pretty(&redacted(&config)).unwrap();
        assert!(!out.contains("sk-live"));
        assert!(!out.contains("serp-live"));
        assert!(!out.contains("gm-live"));
        assert!(out.contains(REDACTED));
    }

    #[test]
    fn header_names_the_loaded_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("agent.toml");
        std::fs::write(&path, "default_provider = \"ollama\"\n").unwrap();
        let config = AppConfig::load_from(&path).unwrap();

        let out = render(&config, &path).unwrap();
        let header = out.lines().next().unwrap();
        assert_eq!(header, format!("# {}", path.display()));
        assert!(out.contains("default_provider = \"ollama\""));
    }

    #[test]
    fn header_marks_a_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("absent.toml");

        let out = render(&AppConfig::default(), &path).unwrap();
        assert!(out.starts_with(&format!("# {} (not found, defaults)\n", path.display())));
    }

    #[test]
    fn unset_secrets_stay_unset() {
        let out = toml::to_string_pretty(&redacted(&AppConfig::default())).unwrap();
        assert!(!out.contains(REDACTED));
    }
}
