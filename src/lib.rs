//! Tickwise - tick-driven process scheduler kernel
//!
//! Tickwise runs registered processes once per epoch under a shared
//! execution budget. Each epoch it builds a priority queue of the processes
//! that are due, resumes from where the previous epoch ran out of budget,
//! and isolates failing processes behind an exponential-backoff circuit
//! breaker.
//!
//! # Architecture
//!
//! - **Domain Layer** (`domain`): process model, configuration and host ports
//! - **Service Layer** (`services`): registry, budgets, queue and the kernel
//! - **Infrastructure Layer** (`infrastructure`): config loading, logging,
//!   host adapters, snapshot persistence and telemetry
//! - **CLI Layer** (`cli`): simulated host and budget inspection
//!
//! # Example
//!
//! ```
//! use tickwise::{Kernel, Priority, ProcessDescriptor, SchedulerConfig};
//!
//! let mut kernel = Kernel::new(SchedulerConfig::default());
//! kernel
//!     .register_process(
//!         ProcessDescriptor::from_fn("spawn", "Spawner", |_ctx| Ok(()))
//!             .with_priority(Priority::Critical),
//!     )
//!     .unwrap();
//!
//! let report = kernel.run();
//! assert_eq!(report.executed, vec!["spawn".to_string()]);
//! ```

pub mod cli;
pub mod domain;
pub mod infrastructure;
pub mod services;

// Re-export commonly used types for convenience
pub use domain::models::{
    AdaptiveBudgetConfig, AppConfig, CategoryBudgets, CircuitBreakerConfig, CursorState,
    EpochContext, EpochReport, FrequencyCategory, KernelSnapshot, Priority, Process,
    ProcessDescriptor, ProcessState, ProcessStats, ScheduleRule, SchedulerConfig, SuspendedUntil,
};
pub use domain::ports::{
    Clock, DispatchEvent, DispatchObserver, DispatchOutcome, Level, Logger, ResourceMeter,
    StateStore, WorkloadScaleProvider,
};
pub use domain::{StateStoreError, ValidationError};
pub use infrastructure::config::{ConfigError, ConfigLoader};
pub use services::{adaptive_budget, adaptive_budgets, Kernel, ProcessView};
