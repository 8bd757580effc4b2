//! Majordome CLI — the main entry point.
//!
//! Commands:
//! - `ask`       — Run one request through the agent loop
//! - `chat`      — Interactive session, one fresh run per line
//! - `tools`     — List the built-in tool catalogue, or detail one tool
//! - `providers` — Show the provider fallback chain
//! - `config`    — Print the default configuration

use clap::{Parser, Subcommand};
use majordome_config::{AppConfig, ConfigError};
use tracing_subscriber::EnvFilter;

mod commands;

#[derive(Parser)]
#[command(
    name = "majordome",
    about = "Majordome — personal AI assistant",
    version,
    author
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Send a single request to the agent
    Ask {
        /// The request, in natural language
        message: String,

        /// Override the iteration ceiling for this run
        #[arg(long)]
        max_iterations: Option<u32>,

        /// Only use this entry of the provider chain
        #[arg(short, long)]
        provider: Option<String>,

        /// Replace the configured system prompt
        #[arg(long)]
        system: Option<String>,

        /// Print the outcome and transcript as JSON
        #[arg(long)]
        json: bool,
    },

    /// Start an interactive session
    Chat {
        /// Only use this entry of the provider chain
        #[arg(short, long)]
        provider: Option<String>,
    },

    /// List available tools
    Tools {
        /// Show the description and argument schema of one tool
        name: Option<String>,
    },

    /// Show the provider fallback chain
    Providers {
        /// Probe each backend for reachability
        #[arg(long)]
        check: bool,
    },

    /// Print the default configuration as TOML
    Config {
        /// Print the config file location instead
        #[arg(long)]
        path: bool,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let loaded = AppConfig::load();
    let json_logs = loaded.as_ref().is_ok_and(|c| c.logging.json);
    init_tracing(cli.verbose, json_logs);

    match cli.command {
        Commands::Ask {
            message,
            max_iterations,
            provider,
            system,
            json,
        } => {
            let args = commands::ask::AskArgs {
                message,
                max_iterations,
                provider,
                system,
                json,
            };
            commands::ask::run(&require(loaded)?, args).await?
        }
        Commands::Chat { provider } => commands::chat::run(&require(loaded)?, provider).await?,
        Commands::Tools { name } => commands::tools::run(&require(loaded)?, name.as_deref())?,
        Commands::Providers { check } => {
            commands::providers::run(&require(loaded)?, check).await?
        }
        // Works even when the file on disk is broken
        Commands::Config { path } => commands::config_cmd::run(path)?,
    }

    Ok(())
}

fn require(loaded: Result<AppConfig, ConfigError>) -> Result<AppConfig, String> {
    loaded.map_err(|e| format!("Failed to load config: {e}"))
}

/// Logs go to stderr so stdout carries only answers.
fn init_tracing(verbose: bool, json: bool) {
    let filter = if verbose { "debug" } else { "info" };
    let builder = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_target(false)
        .with_writer(std::io::stderr);

    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}
