//! `tickwise config`: print the effective configuration.

use anyhow::Result;
use clap::Args;
use serde::Serialize;

use crate::cli::output::{output, CommandOutput};
use crate::domain::models::AppConfig;

#[derive(Args, Debug)]
pub struct ConfigArgs {
    /// Only validate; print nothing on success
    #[arg(long)]
    pub check: bool,
}

#[derive(Debug, Serialize)]
#[serde(transparent)]
pub struct ConfigOutput {
    pub config: AppConfig,
}

impl CommandOutput for ConfigOutput {
    fn to_human(&self) -> String {
        serde_yaml::to_string(&self.config)
            .unwrap_or_else(|err| format!("# failed to render configuration: {err}"))
    }
}

/// The configuration was validated while loading.
pub fn execute(args: &ConfigArgs, config: &AppConfig, json_mode: bool) -> Result<()> {
    if args.check {
        return Ok(());
    }
    output(
        &ConfigOutput {
            config: config.clone(),
        },
        json_mode,
    );
    Ok(())
}
