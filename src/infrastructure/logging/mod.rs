//! Logging infrastructure
//!
//! Structured logging using tracing and tracing-subscriber:
//! - Global subscriber with pretty or JSON output
//! - Optional rotating JSON log file
//! - Adapters for the kernel's logger port

pub mod config;
pub mod logger;
pub mod tracing_logger;

pub use config::{LogFormat, RotationPolicy};
pub use logger::LoggerImpl;
pub use tracing_logger::{LogEntry, MemoryLogger, TracingLogger};
