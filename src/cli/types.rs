//! CLI type definitions
//!
//! This module contains clap command structures that define the CLI interface.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use super::commands::{budgets::BudgetsArgs, config::ConfigArgs, run::RunArgs};

#[derive(Parser, Debug)]
#[command(name = "tickwise")]
#[command(about = "tickwise - budgeted, tick-driven process scheduler", long_about = None)]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Output in JSON format
    #[arg(short, long, global = true)]
    pub json: bool,

    /// Configuration file (defaults to .tickwise/config.yaml and .tickwise/local.yaml)
    #[arg(short, long, global = true, env = "TICKWISE_CONFIG")]
    pub config: Option<PathBuf>,

    /// Override the configured log level
    #[arg(long, global = true)]
    pub log_level: Option<String>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Drive the kernel with a simulated host
    Run(RunArgs),

    /// Show adaptive budgets for a workload size and reserve
    Budgets(BudgetsArgs),

    /// Print the effective configuration
    Config(ConfigArgs),
}
