//! Circuit breaker for repeatedly failing processes.
//!
//! Counts consecutive failures per process and suspends the process for a
//! growing number of epochs once the failure threshold is reached. At the
//! permanent threshold the suspension never lifts on its own; only an
//! explicit resume clears it.
//!
//! Backoff for `n` consecutive failures between the two thresholds:
//!
//! ```text
//! backoff(n) = min(base_backoff_epochs * 2^(n - failure_threshold), max_backoff_epochs)
//! ```
//!
//! A process whose suspension has expired is probed on its next run; since
//! its consecutive failure count is kept, one more failure suspends it
//! again with a longer backoff.

use chrono::Utc;

use crate::domain::models::{CircuitBreakerConfig, ProcessState, ProcessStats, SuspendedUntil};

/// Health outcome recorded for a successful invocation.
const HEALTH_SUCCESS: f64 = 100.0;

/// Health outcome recorded for a failed invocation.
const HEALTH_FAILURE: f64 = 0.0;

/// Result of consulting the breaker before scheduling a process.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CircuitCheckResult {
    /// Process may be scheduled.
    Allowed,
    /// Suspension expired this epoch; the process is back to idle.
    Resumed,
    /// Process is suspended.
    Blocked { until: SuspendedUntil },
}

impl CircuitCheckResult {
    pub fn is_allowed(&self) -> bool {
        matches!(self, Self::Allowed | Self::Resumed)
    }

    pub fn is_blocked(&self) -> bool {
        matches!(self, Self::Blocked { .. })
    }
}

/// Transition triggered by a recorded failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BreakerTrip {
    /// Below the threshold; the process stays eligible.
    None,
    /// Temporarily suspended.
    Suspended { until: u64, backoff: u64 },
    /// Suspended until manually resumed.
    Permanent,
}

/// Stateless policy applied to each process's statistics.
#[derive(Debug, Clone, Default)]
pub struct CircuitBreaker {
    config: CircuitBreakerConfig,
}

impl CircuitBreaker {
    pub fn new(config: CircuitBreakerConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &CircuitBreakerConfig {
        &self.config
    }

    /// Suspension length for `consecutive_errors` failures, `None` below the
    /// failure threshold or at the permanent threshold.
    pub fn backoff_epochs(&self, consecutive_errors: u32) -> Option<u64> {
        if consecutive_errors < self.config.failure_threshold
            || consecutive_errors >= self.config.permanent_threshold
        {
            return None;
        }
        let exponent = (consecutive_errors - self.config.failure_threshold).min(63);
        let backoff = self
            .config
            .base_backoff_epochs
            .max(1)
            .saturating_mul(1_u64 << exponent);
        Some(backoff.min(self.config.max_backoff_epochs.max(1)))
    }

    /// Check whether a process may be scheduled at `epoch`, lifting an
    /// expired temporary suspension.
    pub fn check(&self, stats: &mut ProcessStats, epoch: u64) -> CircuitCheckResult {
        if !stats.is_suspended() {
            return CircuitCheckResult::Allowed;
        }

        match stats.suspended_until {
            Some(until) if until.has_elapsed(epoch) => {
                stats.lift_suspension();
                CircuitCheckResult::Resumed
            }
            Some(until) => CircuitCheckResult::Blocked { until },
            // Suspended without an end is treated as permanent.
            None => CircuitCheckResult::Blocked {
                until: SuspendedUntil::Forever,
            },
        }
    }

    /// Record a successful invocation.
    pub fn record_success(&self, stats: &mut ProcessStats) {
        stats.consecutive_errors = 0;
        stats.state = ProcessState::Idle;
        stats.update_health(HEALTH_SUCCESS, self.config.health_smoothing);
    }

    /// Record a failed invocation at `epoch` and apply the resulting
    /// transition.
    pub fn record_failure(&self, stats: &mut ProcessStats, epoch: u64, error: &str) -> BreakerTrip {
        stats.error_count += 1;
        stats.consecutive_errors += 1;
        stats.state = ProcessState::Error;
        stats.last_error = Some(error.to_string());
        stats.last_error_at = Some(Utc::now());
        stats.update_health(HEALTH_FAILURE, self.config.health_smoothing);

        let failures = stats.consecutive_errors;
        if failures >= self.config.permanent_threshold {
            stats.suspend(
                SuspendedUntil::Forever,
                format!("{failures} consecutive failures, manual resume required (last error: {error})"),
            );
            return BreakerTrip::Permanent;
        }

        match self.backoff_epochs(failures) {
            Some(backoff) => {
                let until = epoch.saturating_add(backoff);
                stats.suspend(
                    SuspendedUntil::Epoch(until),
                    format!("{failures} consecutive failures, backing off {backoff} epochs (last error: {error})"),
                );
                BreakerTrip::Suspended { until, backoff }
            }
            None => BreakerTrip::None,
        }
    }
}
