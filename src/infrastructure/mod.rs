//! Infrastructure layer module
//!
//! Adapters and external integrations:
//! - Configuration management
//! - Logging infrastructure
//! - Host adapters (clocks, meters, workload providers)
//! - Snapshot persistence
//! - Dispatch telemetry
//!
//! Infrastructure implementations satisfy the port traits defined in the domain layer.

pub mod config;
pub mod host;
pub mod logging;
pub mod persistence;
pub mod telemetry;

// Re-export commonly used items
pub use config::{ConfigError, ConfigLoader};
pub use host::{FixedWorkload, InstantMeter, ManualClock, ManualMeter, ManualWorkload};
pub use logging::{LoggerImpl, MemoryLogger, TracingLogger};
pub use persistence::{JsonFileStore, MemoryStore};
pub use telemetry::ChannelObserver;
