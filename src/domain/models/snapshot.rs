//! Persisted kernel state.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::stats::ProcessStats;

/// Position of the wrap-around cursor.
///
/// The id lets the cursor follow its process when the queue is reordered;
/// the index is the fallback when that process is no longer queued.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CursorState {
    pub index: usize,
    pub process_id: Option<String>,
}

/// Everything that survives a host restart: the cursor and the statistics
/// table keyed by process id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KernelSnapshot {
    pub instance_id: Uuid,
    pub saved_at: DateTime<Utc>,
    /// Last epoch the kernel executed.
    pub epoch: Option<u64>,
    pub cursor: CursorState,
    pub stats: HashMap<String, ProcessStats>,
}
