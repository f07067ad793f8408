use crate::domain::models::{Priority, SchedulerConfig};

/// Service for calculating effective process priorities
///
/// Priority formula: weight(priority) + min(consecutive_cpu_skips * rate, max_boost)
///
/// A process that keeps losing the budget race climbs past processes with a
/// higher static priority until it runs; the boost drops back to zero as
/// soon as it executes.
#[derive(Debug, Clone)]
pub struct PriorityDecayEngine {
    enabled: bool,
    rate: f64,
    max_boost: f64,
}

impl Default for PriorityDecayEngine {
    fn default() -> Self {
        Self::from_config(&SchedulerConfig::default())
    }
}

impl PriorityDecayEngine {
    /// Create an engine with custom weights
    pub fn new(enabled: bool, rate: f64, max_boost: f64) -> Self {
        Self {
            enabled,
            rate,
            max_boost,
        }
    }

    pub fn from_config(config: &SchedulerConfig) -> Self {
        Self::new(
            config.enable_priority_decay,
            config.priority_decay_rate,
            config.max_priority_boost,
        )
    }

    /// Boost earned by `consecutive_cpu_skips` budget skips
    pub fn boost(&self, consecutive_cpu_skips: u32) -> f64 {
        if !self.enabled {
            return 0.0;
        }
        (f64::from(consecutive_cpu_skips) * self.rate).min(self.max_boost)
    }

    /// Calculate the effective priority of a process
    pub fn effective_priority(&self, priority: Priority, consecutive_cpu_skips: u32) -> f64 {
        f64::from(priority.weight()) + self.boost(consecutive_cpu_skips)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_skips_is_static_priority() {
        let engine = PriorityDecayEngine::new(true, 5.0, 50.0);
        assert_eq!(engine.effective_priority(Priority::Low, 0), 25.0);
        assert_eq!(engine.effective_priority(Priority::Critical, 0), 100.0);
    }

    #[test]
    fn test_boost_grows_with_skips() {
        let engine = PriorityDecayEngine::new(true, 5.0, 50.0);
        assert_eq!(engine.effective_priority(Priority::Low, 4), 45.0);
        assert_eq!(engine.effective_priority(Priority::Low, 6), 55.0);
    }

    #[test]
    fn test_boost_is_capped() {
        let engine = PriorityDecayEngine::new(true, 5.0, 50.0);
        assert_eq!(engine.boost(1000), 50.0);
        assert_eq!(engine.effective_priority(Priority::Low, 1000), 75.0);
    }

    #[test]
    fn test_starved_low_overtakes_medium() {
        let engine = PriorityDecayEngine::new(true, 10.0, 60.0);
        let starved = engine.effective_priority(Priority::Low, 3);
        let fresh = engine.effective_priority(Priority::Medium, 0);
        assert!(starved > fresh);
    }

    #[test]
    fn test_disabled_engine_ignores_skips() {
        let engine = PriorityDecayEngine::new(false, 5.0, 50.0);
        assert_eq!(engine.effective_priority(Priority::Medium, 20), 50.0);
    }
}
