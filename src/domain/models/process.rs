//! Process descriptor domain model.
//!
//! A [`ProcessDescriptor`] is one registered unit of work: identity, static
//! priority, scheduling rule and the [`Process`] capability the kernel
//! invokes. The business logic behind the capability is opaque to the
//! kernel.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Static priority level of a process.
///
/// Levels are closed and ordered; each carries a fixed weight used as the
/// base of the effective priority.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Priority {
    Low,
    #[default]
    Medium,
    High,
    Critical,
}

impl Priority {
    /// Numeric weight of the level.
    pub const fn weight(self) -> u32 {
        match self {
            Self::Critical => 100,
            Self::High => 75,
            Self::Medium => 50,
            Self::Low => 25,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
            Self::Critical => "critical",
        }
    }

    #[allow(clippy::should_implement_trait)]
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "low" => Some(Self::Low),
            "medium" => Some(Self::Medium),
            "high" => Some(Self::High),
            "critical" => Some(Self::Critical),
            _ => None,
        }
    }
}

/// Frequency category of a process.
///
/// Selects the default re-run interval and the share of the per-epoch
/// budget the process is expected to stay within.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FrequencyCategory {
    High,
    #[default]
    Medium,
    Low,
}

impl FrequencyCategory {
    /// All categories, highest frequency first.
    pub const ALL: [Self; 3] = [Self::High, Self::Medium, Self::Low];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::High => "high",
            Self::Medium => "medium",
            Self::Low => "low",
        }
    }

    #[allow(clippy::should_implement_trait)]
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "high" => Some(Self::High),
            "medium" => Some(Self::Medium),
            "low" => Some(Self::Low),
            _ => None,
        }
    }
}

impl fmt::Display for FrequencyCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Context handed to a process for the duration of one invocation.
#[derive(Debug, Clone, Copy)]
pub struct EpochContext {
    /// Epoch being executed.
    pub epoch: u64,
    /// Execution time still usable this epoch before the call started.
    pub remaining_budget: f64,
    /// Budget share of the process's frequency category for this epoch.
    pub category_budget: f64,
}

/// Capability invoked by the dispatcher.
///
/// Returning `Err` (or panicking) counts as an execution failure and is
/// recorded by the circuit breaker; it never reaches the host.
pub trait Process {
    fn execute(&mut self, ctx: &EpochContext) -> anyhow::Result<()>;
}

impl<F> Process for F
where
    F: FnMut(&EpochContext) -> anyhow::Result<()>,
{
    fn execute(&mut self, ctx: &EpochContext) -> anyhow::Result<()> {
        self(ctx)
    }
}

/// Schedule rule resolved at registration time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ScheduleRule {
    /// Due once `epoch - last_run >= every`, or when never run.
    Interval { every: u64 },
    /// Due exactly when `(epoch + offset) % modulo == 0`.
    Modulo { modulo: u64, offset: u64 },
}

impl ScheduleRule {
    /// Whether the rule allows a run at `epoch`.
    pub fn is_due(&self, epoch: u64, last_run: Option<u64>) -> bool {
        match *self {
            Self::Interval { every } => {
                last_run.map_or(true, |last| epoch.saturating_sub(last) >= every)
            }
            Self::Modulo { modulo, offset } => (epoch + offset) % modulo == 0,
        }
    }

    /// Human-readable description of the rule.
    pub fn description(&self) -> String {
        match self {
            Self::Interval { every: 1 } => "every epoch".to_string(),
            Self::Interval { every } => format!("every {every} epochs"),
            Self::Modulo { modulo, offset } => format!("(epoch + {offset}) mod {modulo} == 0"),
        }
    }
}

/// A registered unit of work.
///
/// Schedule fields are kept as supplied by the caller; the registry
/// validates them and resolves a [`ScheduleRule`].
pub struct ProcessDescriptor {
    pub id: String,
    pub name: String,
    pub priority: Priority,
    pub frequency: Option<FrequencyCategory>,
    /// Explicit interval override, in epochs.
    pub interval: Option<u64>,
    pub tick_modulo: Option<i64>,
    pub tick_offset: Option<i64>,
    pub(crate) execute: Box<dyn Process>,
}

impl fmt::Debug for ProcessDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProcessDescriptor")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("priority", &self.priority)
            .field("frequency", &self.frequency)
            .field("interval", &self.interval)
            .field("tick_modulo", &self.tick_modulo)
            .field("tick_offset", &self.tick_offset)
            .finish_non_exhaustive()
    }
}

impl ProcessDescriptor {
    /// Create a descriptor with medium priority and the default schedule.
    pub fn new(id: impl Into<String>, name: impl Into<String>, process: impl Process + 'static) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            priority: Priority::Medium,
            frequency: None,
            interval: None,
            tick_modulo: None,
            tick_offset: None,
            execute: Box::new(process),
        }
    }

    /// Create a descriptor from a closure.
    pub fn from_fn<F>(id: impl Into<String>, name: impl Into<String>, f: F) -> Self
    where
        F: FnMut(&EpochContext) -> anyhow::Result<()> + 'static,
    {
        Self::new(id, name, f)
    }

    // Builder methods
    pub fn with_priority(mut self, priority: Priority) -> Self {
        self.priority = priority;
        self
    }

    pub fn with_frequency(mut self, frequency: FrequencyCategory) -> Self {
        self.frequency = Some(frequency);
        self
    }

    pub fn with_interval(mut self, every: u64) -> Self {
        self.interval = Some(every);
        self
    }

    pub fn with_tick_modulo(mut self, modulo: i64, offset: i64) -> Self {
        self.tick_modulo = Some(modulo);
        self.tick_offset = Some(offset);
        self
    }
}
