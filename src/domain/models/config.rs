use serde::{Deserialize, Serialize};

use super::process::{FrequencyCategory, Priority};

/// Main configuration structure for tickwise
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct AppConfig {
    /// Kernel configuration
    #[serde(default)]
    pub scheduler: SchedulerConfig,

    /// Adaptive budget calculator configuration
    #[serde(default)]
    pub adaptive: AdaptiveBudgetConfig,

    /// Simulated host configuration
    #[serde(default)]
    pub host: HostConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,

    /// Static process table registered at startup
    #[serde(default)]
    pub processes: Vec<ProcessSpec>,
}

/// A value per frequency category.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct PerCategory<T> {
    pub high: T,
    pub medium: T,
    pub low: T,
}

impl<T: Copy> PerCategory<T> {
    pub fn get(&self, category: FrequencyCategory) -> T {
        match category {
            FrequencyCategory::High => self.high,
            FrequencyCategory::Medium => self.medium,
            FrequencyCategory::Low => self.low,
        }
    }

    pub fn set(&mut self, category: FrequencyCategory, value: T) {
        match category {
            FrequencyCategory::High => self.high = value,
            FrequencyCategory::Medium => self.medium = value,
            FrequencyCategory::Low => self.low = value,
        }
    }
}

/// Budget fractions of the per-epoch ceiling, per frequency category.
pub type CategoryBudgets = PerCategory<f64>;

/// Default re-run intervals in epochs, per frequency category.
pub type CategoryIntervals = PerCategory<u64>;

const fn default_category_budgets() -> CategoryBudgets {
    PerCategory {
        high: 0.25,
        medium: 0.06,
        low: 0.05,
    }
}

const fn default_category_intervals() -> CategoryIntervals {
    PerCategory {
        high: 1,
        medium: 5,
        low: 20,
    }
}

/// Scheduler kernel configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct SchedulerConfig {
    /// Initial budget fraction per frequency category
    #[serde(default = "default_category_budgets")]
    pub frequency_budgets: CategoryBudgets,

    /// Default re-run interval per frequency category
    #[serde(default = "default_category_intervals")]
    pub frequency_intervals: CategoryIntervals,

    /// Category applied to processes registered without any schedule
    #[serde(default)]
    pub default_frequency: FrequencyCategory,

    /// Fraction of the per-epoch ceiling the kernel aims to use
    #[serde(default = "default_target_utilization")]
    pub target_utilization: f64,

    /// Fraction of the targeted budget that is never spent
    #[serde(default = "default_reserved_fraction")]
    pub reserved_fraction: f64,

    #[serde(default = "default_true")]
    pub enable_priority_decay: bool,

    /// Boost added per consecutive budget skip
    #[serde(default = "default_priority_decay_rate")]
    pub priority_decay_rate: f64,

    /// Upper bound of the decay boost
    #[serde(default = "default_max_priority_boost")]
    pub max_priority_boost: f64,

    /// Recompute category budgets at the start of every epoch
    #[serde(default)]
    pub adaptive_budgets: bool,

    #[serde(default)]
    pub circuit_breaker: CircuitBreakerConfig,
}

const fn default_target_utilization() -> f64 {
    0.98
}

const fn default_reserved_fraction() -> f64 {
    0.02
}

const fn default_true() -> bool {
    true
}

const fn default_priority_decay_rate() -> f64 {
    5.0
}

const fn default_max_priority_boost() -> f64 {
    50.0
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            frequency_budgets: default_category_budgets(),
            frequency_intervals: default_category_intervals(),
            default_frequency: FrequencyCategory::default(),
            target_utilization: default_target_utilization(),
            reserved_fraction: default_reserved_fraction(),
            enable_priority_decay: true,
            priority_decay_rate: default_priority_decay_rate(),
            max_priority_boost: default_max_priority_boost(),
            adaptive_budgets: false,
            circuit_breaker: CircuitBreakerConfig::default(),
        }
    }
}

/// Circuit breaker configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct CircuitBreakerConfig {
    /// Consecutive failures before a temporary suspension
    #[serde(default = "default_failure_threshold")]
    pub failure_threshold: u32,

    /// Consecutive failures before a permanent suspension
    #[serde(default = "default_permanent_threshold")]
    pub permanent_threshold: u32,

    /// Suspension length at the failure threshold, doubled per extra failure
    #[serde(default = "default_base_backoff_epochs")]
    pub base_backoff_epochs: u64,

    #[serde(default = "default_max_backoff_epochs")]
    pub max_backoff_epochs: u64,

    /// Smoothing weight of the health score
    #[serde(default = "default_health_smoothing")]
    pub health_smoothing: f64,
}

const fn default_failure_threshold() -> u32 {
    3
}

const fn default_permanent_threshold() -> u32 {
    10
}

const fn default_base_backoff_epochs() -> u64 {
    10
}

const fn default_max_backoff_epochs() -> u64 {
    5000
}

const fn default_health_smoothing() -> f64 {
    0.1
}

impl Default for CircuitBreakerConfig {
    fn default() -> Self {
        Self {
            failure_threshold: default_failure_threshold(),
            permanent_threshold: default_permanent_threshold(),
            base_backoff_epochs: default_base_backoff_epochs(),
            max_backoff_epochs: default_max_backoff_epochs(),
            health_smoothing: default_health_smoothing(),
        }
    }
}

/// Adaptive budget calculator configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct AdaptiveBudgetConfig {
    /// Baseline fraction of the per-epoch budget per category
    #[serde(default = "default_category_budgets")]
    pub base_frequency_budgets: CategoryBudgets,

    #[serde(default)]
    pub room_scaling: RoomScaling,

    #[serde(default)]
    pub reserve_multipliers: ReserveMultipliers,
}

impl Default for AdaptiveBudgetConfig {
    fn default() -> Self {
        Self {
            base_frequency_budgets: default_category_budgets(),
            room_scaling: RoomScaling::default(),
            reserve_multipliers: ReserveMultipliers::default(),
        }
    }
}

/// Logarithmic workload-scale parameters
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct RoomScaling {
    #[serde(default = "default_min_scale")]
    pub min_scale: u32,

    #[serde(default = "default_log_base")]
    pub log_base: f64,

    #[serde(default = "default_max_multiplier")]
    pub max_multiplier: f64,
}

const fn default_min_scale() -> u32 {
    1
}

const fn default_log_base() -> f64 {
    20.0
}

const fn default_max_multiplier() -> f64 {
    2.5
}

impl Default for RoomScaling {
    fn default() -> Self {
        Self {
            min_scale: default_min_scale(),
            log_base: default_log_base(),
            max_multiplier: default_max_multiplier(),
        }
    }
}

/// Step function over the banked reserve
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct ReserveMultipliers {
    #[serde(default = "default_high_threshold")]
    pub high_threshold: u32,

    #[serde(default = "default_low_threshold")]
    pub low_threshold: u32,

    #[serde(default = "default_critical_threshold")]
    pub critical_threshold: u32,

    #[serde(default = "default_high_multiplier")]
    pub high_multiplier: f64,

    #[serde(default = "default_low_multiplier")]
    pub low_multiplier: f64,

    #[serde(default = "default_critical_multiplier")]
    pub critical_multiplier: f64,
}

const fn default_high_threshold() -> u32 {
    9000
}

const fn default_low_threshold() -> u32 {
    2000
}

const fn default_critical_threshold() -> u32 {
    500
}

const fn default_high_multiplier() -> f64 {
    1.2
}

const fn default_low_multiplier() -> f64 {
    0.6
}

const fn default_critical_multiplier() -> f64 {
    0.3
}

impl Default for ReserveMultipliers {
    fn default() -> Self {
        Self {
            high_threshold: default_high_threshold(),
            low_threshold: default_low_threshold(),
            critical_threshold: default_critical_threshold(),
            high_multiplier: default_high_multiplier(),
            low_multiplier: default_low_multiplier(),
            critical_multiplier: default_critical_multiplier(),
        }
    }
}

/// Simulated host configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct HostConfig {
    /// Per-epoch execution ceiling in milliseconds
    #[serde(default = "default_cpu_limit_ms")]
    pub cpu_limit_ms: f64,

    /// Reserve banked before the first epoch
    #[serde(default = "default_initial_reserve")]
    pub initial_reserve: u32,

    /// Upper bound of the banked reserve
    #[serde(default = "default_reserve_cap")]
    pub reserve_cap: u32,

    /// Wall-clock pause between epochs
    #[serde(default = "default_tick_ms")]
    pub tick_ms: u64,

    /// Number of active workload domains reported to the kernel
    #[serde(default = "default_domain_count")]
    pub domain_count: u32,

    /// Snapshot file; persistence is disabled when unset
    #[serde(skip_serializing_if = "Option::is_none")]
    pub state_path: Option<String>,
}

const fn default_cpu_limit_ms() -> f64 {
    20.0
}

const fn default_initial_reserve() -> u32 {
    5000
}

const fn default_reserve_cap() -> u32 {
    10_000
}

const fn default_tick_ms() -> u64 {
    50
}

const fn default_domain_count() -> u32 {
    1
}

impl Default for HostConfig {
    fn default() -> Self {
        Self {
            cpu_limit_ms: default_cpu_limit_ms(),
            initial_reserve: default_initial_reserve(),
            reserve_cap: default_reserve_cap(),
            tick_ms: default_tick_ms(),
            domain_count: default_domain_count(),
            state_path: None,
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct LoggingConfig {
    /// Log level: trace, debug, info, warn, error
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Log format: json or pretty
    #[serde(default = "default_log_format")]
    pub format: String,

    /// Directory for rolling log files
    #[serde(skip_serializing_if = "Option::is_none")]
    pub log_dir: Option<String>,

    /// File rotation: daily, hourly or never
    #[serde(default = "default_log_rotation")]
    pub rotation: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "pretty".to_string()
}

fn default_log_rotation() -> String {
    "daily".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
            log_dir: None,
            rotation: default_log_rotation(),
        }
    }
}

/// Synthetic process entry of the static process table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct ProcessSpec {
    pub id: String,

    #[serde(default)]
    pub name: Option<String>,

    #[serde(default)]
    pub priority: Priority,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub frequency: Option<FrequencyCategory>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub interval: Option<u64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tick_modulo: Option<i64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tick_offset: Option<i64>,

    /// Simulated work per invocation in milliseconds
    #[serde(default)]
    pub cost_ms: u64,

    /// Fail on every epoch divisible by this value
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fail_every: Option<u64>,
}
