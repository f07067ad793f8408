//! Ports (interfaces) the kernel consumes from its host.
//!
//! Concrete adapters live in the infrastructure layer.

pub mod host;
pub mod logger;
pub mod state_store;
pub mod telemetry;

pub use host::{Clock, ResourceMeter, WorkloadScaleProvider};
pub use logger::{Level, Logger};
pub use state_store::StateStore;
pub use telemetry::{DispatchEvent, DispatchObserver, DispatchOutcome};
