use serde::{Deserialize, Serialize};

/// How one invocation ended.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum DispatchOutcome {
    Succeeded,
    Failed { error: String },
}

impl DispatchOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Succeeded)
    }
}

/// Emitted by the dispatcher after every invocation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DispatchEvent {
    pub epoch: u64,
    pub process_id: String,
    pub outcome: DispatchOutcome,
    /// Measured execution time of the invocation.
    pub cpu: f64,
    /// Whether `cpu` exceeded the budget of the process's category.
    pub over_budget: bool,
}

/// Consumer of dispatch events, kept outside the kernel so telemetry
/// concerns never leak into scheduling.
pub trait DispatchObserver {
    fn on_dispatch(&self, event: &DispatchEvent);
}
