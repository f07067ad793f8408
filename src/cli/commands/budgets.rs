//! `tickwise budgets`: adaptive budget table for a workload size and reserve.

use anyhow::Result;
use clap::Args;
use serde::Serialize;

use crate::cli::output::table::BudgetRow;
use crate::cli::output::{output, CommandOutput, TableFormatter};
use crate::domain::models::{AdaptiveBudgetConfig, AppConfig, FrequencyCategory};
use crate::services::adaptive_budget::{adaptive_budget, reserve_multiplier, room_scaling_multiplier};

#[derive(Args, Debug)]
pub struct BudgetsArgs {
    /// Active workload domains (defaults to host.domain_count)
    #[arg(short, long)]
    pub domains: Option<u32>,

    /// Banked reserve (defaults to host.initial_reserve)
    #[arg(short, long)]
    pub reserve: Option<u32>,
}

#[derive(Debug, Serialize)]
pub struct BudgetsOutput {
    pub domains: u32,
    pub reserve: u32,
    pub limit_ms: f64,
    pub rows: Vec<BudgetRow>,
}

impl BudgetsOutput {
    pub fn compute(domains: u32, reserve: u32, limit_ms: f64, config: &AdaptiveBudgetConfig) -> Self {
        let scale = room_scaling_multiplier(domains, config);
        let reserve_mul = reserve_multiplier(reserve, config);
        let rows = FrequencyCategory::ALL
            .into_iter()
            .map(|category| {
                let budget = adaptive_budget(category, domains, reserve, config);
                BudgetRow {
                    category,
                    base: config.base_frequency_budgets.get(category),
                    scale_multiplier: scale,
                    reserve_multiplier: reserve_mul,
                    budget,
                    budget_ms: budget * limit_ms,
                }
            })
            .collect();

        Self {
            domains,
            reserve,
            limit_ms,
            rows,
        }
    }
}

impl CommandOutput for BudgetsOutput {
    fn to_human(&self) -> String {
        format!(
            "Adaptive budgets for {} domain(s), reserve {}, limit {:.1} ms\n{}",
            self.domains,
            self.reserve,
            self.limit_ms,
            TableFormatter::new().format_budgets(&self.rows)
        )
    }
}

pub fn execute(args: &BudgetsArgs, config: &AppConfig, json_mode: bool) -> Result<()> {
    let result = BudgetsOutput::compute(
        args.domains.unwrap_or(config.host.domain_count),
        args.reserve.unwrap_or(config.host.initial_reserve),
        config.host.cpu_limit_ms,
        &config.adaptive,
    );
    output(&result, json_mode);
    Ok(())
}
