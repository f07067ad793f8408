use std::path::Path;

use anyhow::{Context, Result};
use figment::providers::{Env, Format, Serialized, Yaml};
use figment::Figment;
use thiserror::Error;

use crate::domain::models::{AppConfig, CategoryBudgets, FrequencyCategory};

/// Configuration error types
#[derive(Error, Debug, PartialEq)]
pub enum ConfigError {
    #[error("Invalid target_utilization: {0}. Must be in (0, 1]")]
    InvalidTargetUtilization(f64),

    #[error("Invalid reserved_fraction: {0}. Must be in [0, 1)")]
    InvalidReservedFraction(f64),

    #[error("Invalid {field} budget for {category}: {value}. Must be in (0, 1]")]
    InvalidBudget {
        field: &'static str,
        category: FrequencyCategory,
        value: f64,
    },

    #[error("Invalid interval for {0}: must be at least 1 epoch")]
    ZeroInterval(FrequencyCategory),

    #[error("Invalid priority decay: rate {rate} and max boost {max_boost} must not be negative")]
    InvalidDecay { rate: f64, max_boost: f64 },

    #[error(
        "Invalid circuit breaker thresholds: failure_threshold ({0}) must be at least 1 and below permanent_threshold ({1})"
    )]
    InvalidBreakerThresholds(u32, u32),

    #[error(
        "Invalid backoff configuration: base_backoff_epochs ({0}) must be at least 1 and not above max_backoff_epochs ({1})"
    )]
    InvalidBackoff(u64, u64),

    #[error("Invalid health_smoothing: {0}. Must be in (0, 1]")]
    InvalidHealthSmoothing(f64),

    #[error("Invalid room scaling: min_scale {min_scale}, log_base {log_base}, max_multiplier {max_multiplier}")]
    InvalidRoomScaling {
        min_scale: u32,
        log_base: f64,
        max_multiplier: f64,
    },

    #[error(
        "Invalid reserve thresholds: expected critical ({critical}) <= low ({low}) <= high ({high})"
    )]
    UnorderedReserveThresholds { critical: u32, low: u32, high: u32 },

    #[error("Invalid cpu_limit_ms: {0}. Must be positive")]
    InvalidCpuLimit(f64),

    #[error("Invalid tick_ms: must be at least 1")]
    ZeroTick,

    #[error("Invalid log level: {0}. Must be one of: trace, debug, info, warn, error")]
    InvalidLogLevel(String),

    #[error("Invalid log format: {0}. Must be one of: json, pretty")]
    InvalidLogFormat(String),

    #[error("Invalid log rotation: {0}. Must be one of: daily, hourly, never")]
    InvalidLogRotation(String),
}

/// Configuration loader with hierarchical merging
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load configuration with hierarchical merging
    ///
    /// Precedence (lowest to highest):
    /// 1. Programmatic defaults (Serialized)
    /// 2. .tickwise/config.yaml (project config)
    /// 3. .tickwise/local.yaml (local overrides, optional)
    /// 4. Environment variables (TICKWISE_* prefix, `__` separates nested keys)
    pub fn load() -> Result<AppConfig> {
        let config: AppConfig = Figment::new()
            .merge(Serialized::defaults(AppConfig::default()))
            .merge(Yaml::file(".tickwise/config.yaml"))
            .merge(Yaml::file(".tickwise/local.yaml"))
            .merge(Env::prefixed("TICKWISE_").split("__"))
            .extract()
            .context("Failed to extract configuration from figment")?;

        Self::validate(&config)?;
        Ok(config)
    }

    /// Load configuration from a specific file, still honoring environment
    /// overrides
    pub fn load_from_file(path: impl AsRef<Path>) -> Result<AppConfig> {
        let path = path.as_ref();
        anyhow::ensure!(path.exists(), "Config file not found: {}", path.display());

        let config: AppConfig = Figment::new()
            .merge(Serialized::defaults(AppConfig::default()))
            .merge(Yaml::file(path))
            .merge(Env::prefixed("TICKWISE_").split("__"))
            .extract()
            .with_context(|| format!("Failed to load config from {}", path.display()))?;

        Self::validate(&config)?;
        Ok(config)
    }

    /// Validate configuration after loading
    pub fn validate(config: &AppConfig) -> Result<(), ConfigError> {
        let scheduler = &config.scheduler;

        if !(scheduler.target_utilization > 0.0 && scheduler.target_utilization <= 1.0) {
            return Err(ConfigError::InvalidTargetUtilization(scheduler.target_utilization));
        }
        if !(0.0..1.0).contains(&scheduler.reserved_fraction) {
            return Err(ConfigError::InvalidReservedFraction(scheduler.reserved_fraction));
        }

        validate_budgets("frequency", &scheduler.frequency_budgets)?;
        validate_budgets("base", &config.adaptive.base_frequency_budgets)?;

        for category in FrequencyCategory::ALL {
            if scheduler.frequency_intervals.get(category) == 0 {
                return Err(ConfigError::ZeroInterval(category));
            }
        }

        if scheduler.priority_decay_rate < 0.0 || scheduler.max_priority_boost < 0.0 {
            return Err(ConfigError::InvalidDecay {
                rate: scheduler.priority_decay_rate,
                max_boost: scheduler.max_priority_boost,
            });
        }

        // Validate circuit breaker
        let breaker = &scheduler.circuit_breaker;
        if breaker.failure_threshold == 0 || breaker.failure_threshold >= breaker.permanent_threshold {
            return Err(ConfigError::InvalidBreakerThresholds(
                breaker.failure_threshold,
                breaker.permanent_threshold,
            ));
        }
        if breaker.base_backoff_epochs == 0 || breaker.base_backoff_epochs > breaker.max_backoff_epochs {
            return Err(ConfigError::InvalidBackoff(
                breaker.base_backoff_epochs,
                breaker.max_backoff_epochs,
            ));
        }
        if !(breaker.health_smoothing > 0.0 && breaker.health_smoothing <= 1.0) {
            return Err(ConfigError::InvalidHealthSmoothing(breaker.health_smoothing));
        }

        // Validate adaptive budget config
        let scaling = &config.adaptive.room_scaling;
        if scaling.min_scale == 0 || scaling.log_base <= 1.0 || scaling.max_multiplier < 1.0 {
            return Err(ConfigError::InvalidRoomScaling {
                min_scale: scaling.min_scale,
                log_base: scaling.log_base,
                max_multiplier: scaling.max_multiplier,
            });
        }

        let reserve = &config.adaptive.reserve_multipliers;
        if reserve.critical_threshold > reserve.low_threshold || reserve.low_threshold > reserve.high_threshold {
            return Err(ConfigError::UnorderedReserveThresholds {
                critical: reserve.critical_threshold,
                low: reserve.low_threshold,
                high: reserve.high_threshold,
            });
        }

        // Validate host config
        if config.host.cpu_limit_ms <= 0.0 {
            return Err(ConfigError::InvalidCpuLimit(config.host.cpu_limit_ms));
        }
        if config.host.tick_ms == 0 {
            return Err(ConfigError::ZeroTick);
        }

        // Validate logging config
        let valid_log_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_log_levels.contains(&config.logging.level.as_str()) {
            return Err(ConfigError::InvalidLogLevel(config.logging.level.clone()));
        }

        let valid_log_formats = ["json", "pretty"];
        if !valid_log_formats.contains(&config.logging.format.as_str()) {
            return Err(ConfigError::InvalidLogFormat(config.logging.format.clone()));
        }

        let valid_rotations = ["daily", "hourly", "never"];
        if !valid_rotations.contains(&config.logging.rotation.as_str()) {
            return Err(ConfigError::InvalidLogRotation(config.logging.rotation.clone()));
        }

        Ok(())
    }
}

fn validate_budgets(field: &'static str, budgets: &CategoryBudgets) -> Result<(), ConfigError> {
    for category in FrequencyCategory::ALL {
        let value = budgets.get(category);
        if !(value > 0.0 && value <= 1.0) {
            return Err(ConfigError::InvalidBudget {
                field,
                category,
                value,
            });
        }
    }
    Ok(())
}
