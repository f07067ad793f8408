pub mod config;
pub mod process;
pub mod report;
pub mod snapshot;
pub mod stats;

pub use config::{
    AdaptiveBudgetConfig, AppConfig, CategoryBudgets, CategoryIntervals, CircuitBreakerConfig,
    HostConfig, LoggingConfig, PerCategory, ProcessSpec, ReserveMultipliers, RoomScaling,
    SchedulerConfig,
};
pub use process::{
    EpochContext, FrequencyCategory, Priority, Process, ProcessDescriptor, ScheduleRule,
};
pub use report::EpochReport;
pub use snapshot::{CursorState, KernelSnapshot};
pub use stats::{ProcessState, ProcessStats, SuspendedUntil};
