//! Command-line interface.

pub mod commands;
pub mod output;
pub mod types;

use anyhow::{Context, Result};

pub use types::{Cli, Commands};

use crate::domain::models::AppConfig;
use crate::infrastructure::config::ConfigLoader;
use crate::infrastructure::logging::LoggerImpl;

/// Load configuration, install logging and dispatch the subcommand.
pub async fn execute(cli: Cli) -> Result<()> {
    let mut config = load_config(&cli)?;
    if let Some(level) = &cli.log_level {
        config.logging.level.clone_from(level);
    }

    // `config` only prints; keep its stdout free of log lines
    let _logger = match cli.command {
        Commands::Config(_) => None,
        _ => Some(LoggerImpl::init(&config.logging).context("Failed to initialize logging")?),
    };

    match cli.command {
        Commands::Run(args) => commands::run::execute(args, config, cli.json).await,
        Commands::Budgets(args) => commands::budgets::execute(&args, &config, cli.json),
        Commands::Config(args) => commands::config::execute(&args, &config, cli.json),
    }
}

fn load_config(cli: &Cli) -> Result<AppConfig> {
    match &cli.config {
        Some(path) => ConfigLoader::load_from_file(path),
        None => ConfigLoader::load(),
    }
}

/// Print an error in the selected output mode.
pub fn handle_error(err: &anyhow::Error, json_mode: bool) {
    if json_mode {
        let chain: Vec<String> = err.chain().map(ToString::to_string).collect();
        let body = serde_json::json!({ "error": err.to_string(), "causes": chain });
        eprintln!("{}", serde_json::to_string_pretty(&body).unwrap_or_default());
    } else {
        eprintln!("Error: {err:#}");
    }
}
