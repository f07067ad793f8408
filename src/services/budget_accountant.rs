//! Per-epoch execution budget accounting.
//!
//! Pure query surface over a host reading. The usable budget is the
//! ceiling scaled by `target_utilization`, minus a reserve of
//! `reserved_fraction` of that already-reduced figure which the kernel
//! never spends:
//!
//! ```text
//! remaining = limit * tu - used - limit * tu * rf
//! ```

use crate::domain::models::SchedulerConfig;

/// Computes remaining usable execution time from `(used, limit)` readings.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BudgetAccountant {
    target_utilization: f64,
    reserved_fraction: f64,
}

impl Default for BudgetAccountant {
    fn default() -> Self {
        Self::from_config(&SchedulerConfig::default())
    }
}

impl BudgetAccountant {
    pub fn new(target_utilization: f64, reserved_fraction: f64) -> Self {
        Self {
            target_utilization,
            reserved_fraction,
        }
    }

    pub fn from_config(config: &SchedulerConfig) -> Self {
        Self::new(config.target_utilization, config.reserved_fraction)
    }

    /// Part of the ceiling the kernel aims to use.
    pub fn usable_limit(&self, limit: f64) -> f64 {
        limit * self.target_utilization
    }

    /// Part of the usable limit held back as a safety margin.
    pub fn reserve_margin(&self, limit: f64) -> f64 {
        self.usable_limit(limit) * self.reserved_fraction
    }

    /// Execution time still available this epoch. Negative once overspent.
    pub fn remaining_budget(&self, used: f64, limit: f64) -> f64 {
        self.usable_limit(limit) - used - self.reserve_margin(limit)
    }

    pub fn has_budget(&self, used: f64, limit: f64) -> bool {
        self.remaining_budget(used, limit) > 0.0
    }

    /// Share of the ceiling granted to one frequency category.
    pub fn category_limit(&self, limit: f64, fraction: f64) -> f64 {
        limit * fraction
    }
}
