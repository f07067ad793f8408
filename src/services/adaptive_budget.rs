//! Adaptive budget calculator.
//!
//! Stateless functions deriving the per-category budget fractions from two
//! host signals: the number of active workload domains and the banked
//! reserve.
//!
//! ```text
//! budget = clamp(base[category] * scale(domains) * reserve(banked), 0.01, 1.0)
//! ```
//!
//! The scale multiplier grows logarithmically, so doubling the domain count
//! never doubles the budget. The reserve multiplier is a step function that
//! spends more when the bank is full and conserves when it runs dry.

use std::collections::HashMap;

use crate::domain::models::{AdaptiveBudgetConfig, CategoryBudgets, FrequencyCategory, PerCategory};

/// Lower bound of any produced budget fraction.
pub const MIN_BUDGET: f64 = 0.01;

/// Upper bound of any produced budget fraction.
pub const MAX_BUDGET: f64 = 1.0;

/// Workload-scale multiplier in `[1.0, max_multiplier]`.
pub fn room_scaling_multiplier(domains: u32, config: &AdaptiveBudgetConfig) -> f64 {
    let scaling = &config.room_scaling;
    let min_scale = f64::from(scaling.min_scale.max(1));
    let count = f64::from(domains).max(min_scale);

    let multiplier = 1.0 + (count / min_scale).ln() / scaling.log_base.ln();
    multiplier.clamp(1.0, scaling.max_multiplier.max(1.0))
}

/// Reserve-level multiplier.
pub fn reserve_multiplier(reserve: u32, config: &AdaptiveBudgetConfig) -> f64 {
    let steps = &config.reserve_multipliers;
    if reserve >= steps.high_threshold {
        steps.high_multiplier
    } else if reserve < steps.critical_threshold {
        steps.critical_multiplier
    } else if reserve < steps.low_threshold {
        steps.low_multiplier
    } else {
        1.0
    }
}

/// Budget fraction for one category.
pub fn adaptive_budget(
    category: FrequencyCategory,
    domains: u32,
    reserve: u32,
    config: &AdaptiveBudgetConfig,
) -> f64 {
    let base = config.base_frequency_budgets.get(category);
    let budget = base * room_scaling_multiplier(domains, config) * reserve_multiplier(reserve, config);
    budget.clamp(MIN_BUDGET, MAX_BUDGET)
}

/// Budget fractions for every category.
pub fn adaptive_budgets(
    domains: u32,
    reserve: u32,
    config: &AdaptiveBudgetConfig,
) -> HashMap<FrequencyCategory, f64> {
    FrequencyCategory::ALL
        .into_iter()
        .map(|category| (category, adaptive_budget(category, domains, reserve, config)))
        .collect()
}

/// Same as [`adaptive_budgets`], in the kernel's per-category layout.
pub fn category_budgets(domains: u32, reserve: u32, config: &AdaptiveBudgetConfig) -> CategoryBudgets {
    PerCategory {
        high: adaptive_budget(FrequencyCategory::High, domains, reserve, config),
        medium: adaptive_budget(FrequencyCategory::Medium, domains, reserve, config),
        low: adaptive_budget(FrequencyCategory::Low, domains, reserve, config),
    }
}
