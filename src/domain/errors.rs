//! Domain errors for the tickwise scheduler kernel.

use thiserror::Error;

/// Rejection of a process registration.
///
/// Returned synchronously by `register_process`; the registry is left
/// unchanged.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("Process id cannot be empty")]
    EmptyId,

    #[error("Process already registered: {0}")]
    DuplicateId(String),

    #[error("Invalid tick_modulo {modulo} for process {id}: must be a positive integer")]
    InvalidTickModulo { id: String, modulo: i64 },

    #[error("Invalid tick_offset {offset} for process {id}: must satisfy 0 <= offset < {modulo}")]
    InvalidTickOffset { id: String, offset: i64, modulo: i64 },

    #[error("Invalid interval for process {0}: must be at least 1 epoch")]
    ZeroInterval(String),

    #[error("Conflicting schedule for process {0}: interval and tick_modulo are mutually exclusive")]
    ConflictingSchedule(String),
}

/// Errors raised by snapshot persistence adapters.
#[derive(Debug, Error)]
pub enum StateStoreError {
    #[error("Failed to access state file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to (de)serialize snapshot: {0}")]
    Serialization(#[from] serde_json::Error),
}
