//! Host capability ports.
//!
//! The kernel reads time, execution-cost and workload signals exclusively
//! through these traits so it can run against a live host, a simulated one
//! or a test double.

/// Source of the current epoch number.
pub trait Clock {
    fn current_epoch(&self) -> u64;
}

/// Execution-time accounting provided by the host.
///
/// All values are in the host's execution-time unit (milliseconds for the
/// bundled wall-clock meter).
pub trait ResourceMeter {
    /// Execution time consumed so far this epoch.
    fn used(&self) -> f64;

    /// Hard per-epoch ceiling.
    fn limit(&self) -> f64;

    /// Banked surplus carried over from previous epochs.
    fn reserve(&self) -> u32;

    /// Called by the kernel before anything else in `run()`.
    fn begin_epoch(&self) {}

    /// Called by the kernel after the dispatch loop ends.
    fn end_epoch(&self) {}
}

/// Reports the number of active workload domains.
pub trait WorkloadScaleProvider {
    fn domain_count(&self) -> u32;
}
