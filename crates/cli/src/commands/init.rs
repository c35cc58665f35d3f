//! `reagent init`: Write a default configuration file.

use reagent_config::AppConfig;
use std::path::Path;

pub fn run(path: &Path, force: bool) -> Result<(), Box<dyn std::error::Error>> {
    if write_default(path, force)? {
        println!("Created config at: {}", path.display());
        println!();
        println!("Next steps:");
        println!("  1. Set an API key: api_key in the file, REAGENT_API_KEY, or the vendor variable (OPENAI_API_KEY, GEMINI_API_KEY)");
        println!("  2. Optionally set SERPAPI_API_KEY to enable the google tool");
        println!("  3. Try it: reagent ask \"How tall is the Eiffel Tower?\" --trace");
    } else {
        println!("Config already exists at: {}", path.display());
        println!("   Edit it manually or re-run with --force.");
    }

    Ok(())
}

/// Write the default config. Returns `false` if a file exists and
/// `force` is off.
fn write_default(path: &Path, force: bool) -> std::io::Result<bool> {
    if path.exists() && !force {
        return Ok(false);
    }
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(path, AppConfig::default_toml())?;
    Ok(true)
}
