use serde::{Deserialize, Serialize};

use super::snapshot::CursorState;

/// Outcome of one `run()`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EpochReport {
    pub epoch: u64,
    /// Invoked process ids, in invocation order.
    pub executed: Vec<String>,
    /// Subset of `executed` whose invocation failed.
    pub failed: Vec<String>,
    /// Ready processes left unexecuted because the budget ran out.
    pub budget_skipped: Vec<String>,
    /// Processes whose expired suspension was lifted this epoch.
    pub resumed: Vec<String>,
    pub not_due: usize,
    pub suspended: usize,
    /// Meter reading consumed by the dispatch loop.
    pub cpu_used: f64,
    pub cursor: CursorState,
}

impl EpochReport {
    pub fn new(epoch: u64) -> Self {
        Self {
            epoch,
            ..Default::default()
        }
    }

    pub fn budget_exhausted(&self) -> bool {
        !self.budget_skipped.is_empty()
    }

    pub fn succeeded(&self) -> usize {
        self.executed.len() - self.failed.len()
    }
}
