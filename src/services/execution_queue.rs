//! Per-epoch execution queue.
//!
//! Built fresh at the start of every epoch from the registry: suspended
//! processes are dropped (an expired suspension is lifted first), processes
//! whose schedule is not due have their skip counter bumped, and the rest
//! are ranked by effective priority. Ties keep registration order.
//!
//! The queue is addressed through a wrap-around cursor that survives
//! rebuilds. When the process the cursor pointed at is still queued the
//! cursor follows it to its new position; otherwise the old index is kept
//! if it is still in range and reset to 0 when it is not.

use std::cmp::Ordering;

use crate::domain::models::CursorState;
use crate::services::circuit_breaker::{CircuitBreaker, CircuitCheckResult};
use crate::services::priority_decay::PriorityDecayEngine;
use crate::services::registry::ProcessRegistry;

/// One ranked, ready process.
#[derive(Debug, Clone, PartialEq)]
pub struct QueueEntry {
    pub id: String,
    pub effective_priority: f64,
    pub seq: u64,
}

/// What the build pass observed besides the ready set.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QueueBuildSummary {
    pub not_due: usize,
    pub suspended: usize,
    /// Ids whose temporary suspension expired during this pass.
    pub resumed: Vec<String>,
}

#[derive(Debug, Clone, Default)]
pub struct ExecutionQueue {
    entries: Vec<QueueEntry>,
    cursor: Option<usize>,
}

impl ExecutionQueue {
    /// Build the queue for `epoch`, updating skip counters and lifting
    /// expired suspensions in the registry as a side effect.
    pub fn build(
        registry: &mut ProcessRegistry,
        epoch: u64,
        decay: &PriorityDecayEngine,
        breaker: &CircuitBreaker,
    ) -> (Self, QueueBuildSummary) {
        let mut summary = QueueBuildSummary::default();
        let mut entries = Vec::with_capacity(registry.len());

        for process in registry.list_mut() {
            match breaker.check(&mut process.stats, epoch) {
                CircuitCheckResult::Blocked { .. } => {
                    summary.suspended += 1;
                    continue;
                }
                CircuitCheckResult::Resumed => summary.resumed.push(process.id.clone()),
                CircuitCheckResult::Allowed => {}
            }

            if !process.rule.is_due(epoch, process.stats.last_run_tick) {
                process.stats.skipped_count += 1;
                summary.not_due += 1;
                continue;
            }

            entries.push(QueueEntry {
                id: process.id.clone(),
                effective_priority: decay
                    .effective_priority(process.priority, process.stats.consecutive_cpu_skips),
                seq: process.seq,
            });
        }

        (Self::from_entries(entries), summary)
    }

    /// Rank arbitrary entries. The cursor starts at the head.
    pub fn from_entries(mut entries: Vec<QueueEntry>) -> Self {
        entries.sort_by(rank);
        let cursor = if entries.is_empty() { None } else { Some(0) };
        Self { entries, cursor }
    }

    /// Position the cursor from the state persisted after the last epoch.
    pub fn resolve_cursor(&mut self, persisted: &CursorState) {
        if self.entries.is_empty() {
            self.cursor = None;
            return;
        }

        let followed = persisted
            .process_id
            .as_deref()
            .and_then(|id| self.position(id));

        self.cursor = Some(followed.unwrap_or(if persisted.index < self.entries.len() {
            persisted.index
        } else {
            0
        }));
    }

    pub fn cursor(&self) -> Option<usize> {
        self.cursor
    }

    /// Move the cursor one step, wrapping to the head after the last entry.
    pub fn advance(&mut self) {
        if let Some(index) = self.cursor {
            self.cursor = Some((index + 1) % self.entries.len());
        }
    }

    /// Cursor in its persisted form.
    pub fn cursor_state(&self) -> CursorState {
        match self.cursor {
            Some(index) => CursorState {
                index,
                process_id: self.id_at(index).map(str::to_string),
            },
            None => CursorState::default(),
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entries(&self) -> &[QueueEntry] {
        &self.entries
    }

    pub fn id_at(&self, index: usize) -> Option<&str> {
        self.entries.get(index).map(|entry| entry.id.as_str())
    }

    pub fn position(&self, id: &str) -> Option<usize> {
        self.entries.iter().position(|entry| entry.id == id)
    }
}

/// Descending effective priority, then ascending registration order.
fn rank(a: &QueueEntry, b: &QueueEntry) -> Ordering {
    b.effective_priority
        .total_cmp(&a.effective_priority)
        .then_with(|| a.seq.cmp(&b.seq))
}
