//! Domain layer for the tickwise scheduler kernel
//!
//! This module contains the process model, configuration types, error
//! types and the ports the kernel consumes from its host.

pub mod errors;
pub mod models;
pub mod ports;

// Re-export error types for convenient access
pub use errors::{StateStoreError, ValidationError};
