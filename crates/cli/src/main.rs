//! reagent CLI: the main entry point.
//!
//! Commands:
//! - `ask`     Answer one question and print the answer (and trace)
//! - `serve`   Start the HTTP gateway
//! - `init`    Write a default config file
//! - `config`  Show the effective configuration
//! - `doctor`  Check the configuration and the model backend

use clap::{Parser, Subcommand};
use reagent_config::{AppConfig, LogFormat, LoggingConfig};
use std::path::{Path, PathBuf};

mod commands;

#[derive(Parser)]
#[command(
    name = "reagent",
    about = "reagent: a ReAct agent that reasons with tools",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Config file (default: ~/.reagent/config.toml)
    #[arg(short, long, global = true, env = "REAGENT_CONFIG")]
    config: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Answer a single question
    Ask {
        /// The question
        query: String,

        /// Print the reasoning trace before the answer
        #[arg(short, long)]
        trace: bool,

        /// Print the full result as JSON
        #[arg(long)]
        json: bool,
    },

    /// Start the HTTP gateway server
    Serve {
        /// Override the port
        #[arg(short, long)]
        port: Option<u16>,
    },

    /// Write a default configuration file
    Init {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },

    /// Show the effective configuration (secrets redacted)
    Config,

    /// Diagnose configuration and model backend health
    Doctor,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let path = AppConfig::resolve_path(cli.config.as_deref());

    match cli.command {
        // `init` must work even when the existing file does not parse.
        Commands::Init { force } => {
            init_tracing(&LoggingConfig::default(), cli.verbose);
            commands::init::run(&path, force)?
        }
        Commands::Ask { query, trace, json } => {
            let config = load_config(&path, cli.verbose)?;
            commands::ask::run(config, &query, trace, json).await?
        }
        Commands::Serve { port } => {
            let config = load_config(&path, cli.verbose)?;
            commands::serve::run(config, port).await?
        }
        Commands::Config => {
            let config = load_config(&path, cli.verbose)?;
            commands::config_cmd::show(&config, &path)?
        }
        // Reports a broken config instead of failing on it.
        Commands::Doctor => {
            init_tracing(&LoggingConfig::default(), cli.verbose);
            commands::doctor::run(&path).await?
        }
    }

    Ok(())
}

/// Load configuration, then install logging as it describes.
fn load_config(path: &Path, verbose: bool) -> Result<AppConfig, String> {
    let config = AppConfig::load(Some(path)).map_err(|e| format!("Failed to load config: {e}"))?;
    init_tracing(&config.logging, verbose);
    Ok(config)
}

/// Install the global subscriber. `RUST_LOG` wins over the config level.
/// Logs go to stderr so `ask --json` output stays machine-readable.
fn init_tracing(logging: &LoggingConfig, verbose: bool) {
    let level = if verbose { "debug" } else { logging.level.as_str() };
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr);

    match logging.format {
        LogFormat::Json => builder.json().init(),
        LogFormat::Pretty => builder.init(),
    }
}
