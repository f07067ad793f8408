//! Per-process runtime statistics.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Lifecycle state of a process.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProcessState {
    /// Ready to be scheduled.
    #[default]
    Idle,
    /// Currently being invoked.
    Running,
    /// Last invocation failed; still eligible.
    Error,
    /// Excluded from scheduling until the suspension ends.
    Suspended,
}

impl ProcessState {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Running => "running",
            Self::Error => "error",
            Self::Suspended => "suspended",
        }
    }
}

/// End of a suspension.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SuspendedUntil {
    /// Lifted automatically once the kernel reaches this epoch.
    Epoch(u64),
    /// Only lifted by an explicit resume.
    Forever,
}

impl SuspendedUntil {
    /// Whether the suspension has ended at `epoch`.
    pub fn has_elapsed(&self, epoch: u64) -> bool {
        match self {
            Self::Epoch(until) => epoch >= *until,
            Self::Forever => false,
        }
    }

    pub fn description(&self) -> String {
        match self {
            Self::Epoch(until) => format!("epoch {until}"),
            Self::Forever => "forever".to_string(),
        }
    }
}

/// Mutable statistics kept for exactly one registered process.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProcessStats {
    pub state: ProcessState,
    pub run_count: u64,
    /// Epochs skipped because the schedule was not due.
    pub skipped_count: u64,
    /// Consecutive epochs the process was ready but the budget ran out.
    pub consecutive_cpu_skips: u32,
    pub error_count: u64,
    pub consecutive_errors: u32,
    pub total_cpu: f64,
    pub avg_cpu: f64,
    pub max_cpu: f64,
    pub last_run_tick: Option<u64>,
    /// Smoothed success rate in `[0, 100]`.
    pub health_score: f64,
    pub suspended_until: Option<SuspendedUntil>,
    pub suspension_reason: Option<String>,
    /// Invocations whose cost exceeded the category budget.
    #[serde(default)]
    pub budget_overruns: u64,
    #[serde(default)]
    pub last_error: Option<String>,
    #[serde(default)]
    pub last_error_at: Option<DateTime<Utc>>,
}

impl Default for ProcessStats {
    fn default() -> Self {
        Self {
            state: ProcessState::Idle,
            run_count: 0,
            skipped_count: 0,
            consecutive_cpu_skips: 0,
            error_count: 0,
            consecutive_errors: 0,
            total_cpu: 0.0,
            avg_cpu: 0.0,
            max_cpu: 0.0,
            last_run_tick: None,
            health_score: 100.0,
            suspended_until: None,
            suspension_reason: None,
            budget_overruns: 0,
            last_error: None,
            last_error_at: None,
        }
    }
}

impl ProcessStats {
    /// Fold one measured invocation into the cpu counters.
    pub fn record_cpu(&mut self, cpu: f64) {
        self.run_count += 1;
        self.total_cpu += cpu;
        self.avg_cpu = self.total_cpu / self.run_count as f64;
        if cpu > self.max_cpu {
            self.max_cpu = cpu;
        }
    }

    /// Exponentially smoothed health update; `outcome` is 100 or 0.
    pub fn update_health(&mut self, outcome: f64, weight: f64) {
        self.health_score = (self.health_score * (1.0 - weight) + outcome * weight).clamp(0.0, 100.0);
    }

    pub fn is_suspended(&self) -> bool {
        self.state == ProcessState::Suspended
    }

    /// Enter the suspended state.
    pub fn suspend(&mut self, until: SuspendedUntil, reason: impl Into<String>) {
        self.state = ProcessState::Suspended;
        self.suspended_until = Some(until);
        self.suspension_reason = Some(reason.into());
    }

    /// Leave the suspended state. Failure counters are kept.
    pub fn lift_suspension(&mut self) {
        self.state = ProcessState::Idle;
        self.suspended_until = None;
        self.suspension_reason = None;
    }
}
