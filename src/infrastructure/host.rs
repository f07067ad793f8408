//! Host adapters.
//!
//! Manual implementations of the host ports for tests and embedding, and a
//! wall-clock meter used by the simulated host in the binary. Manual
//! adapters share their state between clones so a test can keep a handle
//! while the kernel owns another.

use std::sync::atomic::{AtomicU32, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Instant;

use crate::domain::ports::{Clock, ResourceMeter, WorkloadScaleProvider};

/// Externally driven epoch counter.
#[derive(Debug, Clone, Default)]
pub struct ManualClock {
    epoch: Arc<AtomicU64>,
}

impl ManualClock {
    pub fn new(start: u64) -> Self {
        Self {
            epoch: Arc::new(AtomicU64::new(start)),
        }
    }

    pub fn set(&self, epoch: u64) {
        self.epoch.store(epoch, Ordering::SeqCst);
    }

    pub fn advance(&self, epochs: u64) -> u64 {
        self.epoch.fetch_add(epochs, Ordering::SeqCst) + epochs
    }
}

impl Clock for ManualClock {
    fn current_epoch(&self) -> u64 {
        self.epoch.load(Ordering::SeqCst)
    }
}

#[derive(Debug)]
struct MeterReadings {
    used: AtomicU64,
    limit: AtomicU64,
    reserve: AtomicU32,
}

/// Meter whose readings only change when told to.
///
/// Processes under test call [`ManualMeter::add`] to simulate their cost.
/// The epoch hooks are no-ops; reset usage with [`ManualMeter::set_used`].
#[derive(Debug, Clone)]
pub struct ManualMeter {
    readings: Arc<MeterReadings>,
}

impl Default for ManualMeter {
    fn default() -> Self {
        Self::new(100.0)
    }
}

impl ManualMeter {
    pub fn new(limit: f64) -> Self {
        Self {
            readings: Arc::new(MeterReadings {
                used: AtomicU64::new(0.0_f64.to_bits()),
                limit: AtomicU64::new(limit.to_bits()),
                reserve: AtomicU32::new(0),
            }),
        }
    }

    pub fn with_reserve(self, reserve: u32) -> Self {
        self.set_reserve(reserve);
        self
    }

    /// Charge `cost` against the current epoch.
    pub fn add(&self, cost: f64) {
        // Single writer in practice; the CAS loop keeps clones consistent.
        let _ = self
            .readings
            .used
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |bits| {
                Some((f64::from_bits(bits) + cost).to_bits())
            });
    }

    pub fn set_used(&self, used: f64) {
        self.readings.used.store(used.to_bits(), Ordering::SeqCst);
    }

    pub fn set_limit(&self, limit: f64) {
        self.readings.limit.store(limit.to_bits(), Ordering::SeqCst);
    }

    pub fn set_reserve(&self, reserve: u32) {
        self.readings.reserve.store(reserve, Ordering::SeqCst);
    }
}

impl ResourceMeter for ManualMeter {
    fn used(&self) -> f64 {
        f64::from_bits(self.readings.used.load(Ordering::SeqCst))
    }

    fn limit(&self) -> f64 {
        f64::from_bits(self.readings.limit.load(Ordering::SeqCst))
    }

    fn reserve(&self) -> u32 {
        self.readings.reserve.load(Ordering::SeqCst)
    }
}

#[derive(Debug)]
struct InstantState {
    epoch_started: Option<Instant>,
    /// Last `used()` reading taken when the epoch ended.
    last_used: f64,
    reserve: f64,
}

/// Wall-clock meter in milliseconds.
///
/// Usage is the time elapsed since `begin_epoch`. At `end_epoch` the unused
/// part of the limit is banked into the reserve (capped), and an overrun is
/// drawn from it.
#[derive(Debug, Clone)]
pub struct InstantMeter {
    limit_ms: f64,
    reserve_cap: u32,
    state: Arc<Mutex<InstantState>>,
}

impl InstantMeter {
    pub fn new(limit_ms: f64, initial_reserve: u32, reserve_cap: u32) -> Self {
        Self {
            limit_ms,
            reserve_cap,
            state: Arc::new(Mutex::new(InstantState {
                epoch_started: None,
                last_used: 0.0,
                reserve: f64::from(initial_reserve.min(reserve_cap)),
            })),
        }
    }

    /// Usage of the most recently finished epoch.
    pub fn last_used(&self) -> f64 {
        self.lock().last_used
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, InstantState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl ResourceMeter for InstantMeter {
    fn used(&self) -> f64 {
        self.lock()
            .epoch_started
            .map_or(0.0, |started| started.elapsed().as_secs_f64() * 1000.0)
    }

    fn limit(&self) -> f64 {
        self.limit_ms
    }

    fn reserve(&self) -> u32 {
        self.lock().reserve.max(0.0) as u32
    }

    fn begin_epoch(&self) {
        self.lock().epoch_started = Some(Instant::now());
    }

    fn end_epoch(&self) {
        let used = self.used();
        let mut state = self.lock();
        state.epoch_started = None;
        state.last_used = used;
        state.reserve = (state.reserve + self.limit_ms - used).clamp(0.0, f64::from(self.reserve_cap));
    }
}

/// Constant workload size.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FixedWorkload(pub u32);

impl Default for FixedWorkload {
    fn default() -> Self {
        Self(1)
    }
}

impl WorkloadScaleProvider for FixedWorkload {
    fn domain_count(&self) -> u32 {
        self.0
    }
}

/// Workload size adjustable through any clone.
#[derive(Debug, Clone, Default)]
pub struct ManualWorkload {
    domains: Arc<AtomicU32>,
}

impl ManualWorkload {
    pub fn new(domains: u32) -> Self {
        Self {
            domains: Arc::new(AtomicU32::new(domains)),
        }
    }

    pub fn set(&self, domains: u32) {
        self.domains.store(domains, Ordering::SeqCst);
    }
}

impl WorkloadScaleProvider for ManualWorkload {
    fn domain_count(&self) -> u32 {
        self.domains.load(Ordering::SeqCst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_manual_clock_shared() {
        let clock = ManualClock::new(1000);
        let handle = clock.clone();
        assert_eq!(handle.advance(5), 1005);
        assert_eq!(clock.current_epoch(), 1005);
        handle.set(7);
        assert_eq!(clock.current_epoch(), 7);
    }

    #[test]
    fn test_manual_meter_defaults() {
        let meter = ManualMeter::default();
        assert!((meter.limit() - 100.0).abs() < f64::EPSILON);
        assert!(meter.used().abs() < f64::EPSILON);
        assert_eq!(meter.reserve(), 0);
    }

    #[test]
    fn test_manual_meter_add_through_clone() {
        let meter = ManualMeter::new(20.0).with_reserve(5000);
        let handle = meter.clone();
        handle.add(2.5);
        handle.add(1.5);
        assert!((meter.used() - 4.0).abs() < 1e-12);
        assert_eq!(meter.reserve(), 5000);
        meter.set_used(0.0);
        assert!(handle.used().abs() < f64::EPSILON);
    }

    #[test]
    fn test_instant_meter_banks_unused_time() {
        let meter = InstantMeter::new(50.0, 100, 10_000);
        assert!(meter.used().abs() < f64::EPSILON);

        meter.begin_epoch();
        meter.end_epoch();
        // nearly the whole 50 ms limit was unused
        assert!(meter.reserve() >= 140);
        assert!(meter.reserve() <= 150);
        assert!(meter.used().abs() < f64::EPSILON);
    }

    #[test]
    fn test_instant_meter_reserve_capped() {
        let meter = InstantMeter::new(50.0, 9_990, 10_000);
        meter.begin_epoch();
        meter.end_epoch();
        assert_eq!(meter.reserve(), 10_000);
    }

    #[test]
    fn test_workloads() {
        assert_eq!(FixedWorkload::default().domain_count(), 1);
        let workload = ManualWorkload::new(3);
        workload.clone().set(12);
        assert_eq!(workload.domain_count(), 12);
    }
}
