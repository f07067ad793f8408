//! Scheduler kernel.
//!
//! One [`Kernel::run`] executes one epoch:
//!
//! 1. resolve the epoch (injected [`Clock`] or an internal counter) and
//!    optionally refresh the per-category budgets
//! 2. rebuild the [`ExecutionQueue`] and position the persisted cursor
//! 3. starting at the cursor, invoke each queued process while the budget
//!    lasts, recording the outcome in its statistics and the circuit breaker
//! 4. persist the cursor, and the snapshot when a store is injected
//!
//! The dispatch loop stops at the first process it cannot afford. That
//! process gets its budget-skip counter bumped and the cursor stays on it,
//! so it leads the next epoch. An epoch that completes its lap leaves the
//! cursor at the head of the queue.
//!
//! Process failures (an `Err` or a panic) are contained here and never
//! surface from `run()`.

use std::any::Any;
use std::panic::{self, AssertUnwindSafe};

use chrono::Utc;
use serde_json::json;
use tracing::instrument;
use uuid::Uuid;

use crate::domain::errors::{StateStoreError, ValidationError};
use crate::domain::models::{
    AdaptiveBudgetConfig, CategoryBudgets, CursorState, EpochContext, EpochReport, KernelSnapshot,
    ProcessDescriptor, ProcessState, SchedulerConfig, SuspendedUntil,
};
use crate::domain::ports::{
    Clock, DispatchEvent, DispatchObserver, DispatchOutcome, Logger, ResourceMeter, StateStore,
    WorkloadScaleProvider,
};
use crate::infrastructure::host::{FixedWorkload, ManualMeter};
use crate::infrastructure::logging::TracingLogger;
use crate::services::adaptive_budget;
use crate::services::budget_accountant::BudgetAccountant;
use crate::services::circuit_breaker::{BreakerTrip, CircuitBreaker};
use crate::services::execution_queue::ExecutionQueue;
use crate::services::priority_decay::PriorityDecayEngine;
use crate::services::registry::{ProcessRegistry, ProcessView};

/// Where epoch numbers come from.
enum EpochSource {
    /// Counts `run()` calls, starting at `next`.
    Internal { next: u64 },
    External(Box<dyn Clock>),
}

/// Single-threaded, budgeted process scheduler.
pub struct Kernel {
    instance_id: Uuid,
    config: SchedulerConfig,
    adaptive: AdaptiveBudgetConfig,
    registry: ProcessRegistry,
    accountant: BudgetAccountant,
    decay: PriorityDecayEngine,
    breaker: CircuitBreaker,
    budgets: CategoryBudgets,
    epochs: EpochSource,
    last_epoch: Option<u64>,
    cursor: CursorState,
    meter: Box<dyn ResourceMeter>,
    workload: Box<dyn WorkloadScaleProvider>,
    logger: Box<dyn Logger>,
    store: Option<Box<dyn StateStore>>,
    observers: Vec<Box<dyn DispatchObserver>>,
}

impl Kernel {
    /// Kernel with an internal epoch counter, a [`ManualMeter`] of limit
    /// 100, a single workload domain and the [`TracingLogger`].
    pub fn new(config: SchedulerConfig) -> Self {
        Self {
            instance_id: Uuid::new_v4(),
            registry: ProcessRegistry::new(config.frequency_intervals, config.default_frequency),
            accountant: BudgetAccountant::from_config(&config),
            decay: PriorityDecayEngine::from_config(&config),
            breaker: CircuitBreaker::new(config.circuit_breaker.clone()),
            budgets: config.frequency_budgets,
            adaptive: AdaptiveBudgetConfig::default(),
            config,
            epochs: EpochSource::Internal { next: 0 },
            last_epoch: None,
            cursor: CursorState::default(),
            meter: Box::new(ManualMeter::default()),
            workload: Box::new(FixedWorkload::default()),
            logger: Box::new(TracingLogger::new()),
            store: None,
            observers: Vec::new(),
        }
    }

    // Builder methods
    pub fn with_clock(mut self, clock: impl Clock + 'static) -> Self {
        self.epochs = EpochSource::External(Box::new(clock));
        self
    }

    pub fn with_meter(mut self, meter: impl ResourceMeter + 'static) -> Self {
        self.meter = Box::new(meter);
        self
    }

    pub fn with_logger(mut self, logger: impl Logger + 'static) -> Self {
        self.logger = Box::new(logger);
        self
    }

    pub fn with_workload(mut self, workload: impl WorkloadScaleProvider + 'static) -> Self {
        self.workload = Box::new(workload);
        self
    }

    pub fn with_adaptive_config(mut self, adaptive: AdaptiveBudgetConfig) -> Self {
        self.adaptive = adaptive;
        self
    }

    pub fn with_state_store(mut self, store: impl StateStore + 'static) -> Self {
        self.store = Some(Box::new(store));
        self
    }

    pub fn with_observer(mut self, observer: impl DispatchObserver + 'static) -> Self {
        self.observers.push(Box::new(observer));
        self
    }

    pub fn instance_id(&self) -> Uuid {
        self.instance_id
    }

    pub fn config(&self) -> &SchedulerConfig {
        &self.config
    }

    // Registration

    pub fn register_process(&mut self, descriptor: ProcessDescriptor) -> Result<(), ValidationError> {
        let id = descriptor.id.clone();
        match self.registry.register(descriptor) {
            Ok(()) => {
                let process = self.registry.get(&id).map(|p| p.view());
                self.logger.debug(
                    "process registered",
                    json!({
                        "process_id": id,
                        "priority": process.as_ref().map(|p| p.priority.as_str()),
                        "schedule": process.as_ref().map(|p| p.schedule.description()),
                    }),
                );
                Ok(())
            }
            Err(err) => {
                self.logger
                    .warn("process rejected", json!({ "process_id": id, "error": err.to_string() }));
                Err(err)
            }
        }
    }

    /// Remove a process and its statistics.
    pub fn unregister_process(&mut self, id: &str) -> bool {
        let removed = self.registry.unregister(id);
        if removed {
            self.logger.debug("process unregistered", json!({ "process_id": id }));
        }
        removed
    }

    pub fn get_process(&self, id: &str) -> Option<ProcessView> {
        self.registry.get(id).map(|process| process.view())
    }

    /// All processes in registration order.
    pub fn list_processes(&self) -> Vec<ProcessView> {
        self.registry.list().into_iter().map(|process| process.view()).collect()
    }

    /// Exclude a process from scheduling until [`Kernel::resume_process`].
    pub fn suspend_process(&mut self, id: &str) -> bool {
        let Some(process) = self.registry.get_mut(id) else {
            return false;
        };
        process.stats.suspend(SuspendedUntil::Forever, "suspended manually");
        self.logger.info("process suspended", json!({ "process_id": id, "manual": true }));
        true
    }

    /// Lift any suspension. Failure counters are left untouched, so a
    /// process resumed after repeated failures trips again on its next
    /// failure.
    pub fn resume_process(&mut self, id: &str) -> bool {
        let Some(process) = self.registry.get_mut(id) else {
            return false;
        };
        if process.stats.is_suspended() {
            process.stats.lift_suspension();
            self.logger.info(
                "process resumed",
                json!({
                    "process_id": id,
                    "consecutive_errors": process.stats.consecutive_errors,
                }),
            );
        }
        true
    }

    // Budget

    pub fn has_budget(&self) -> bool {
        self.accountant.has_budget(self.meter.used(), self.meter.limit())
    }

    pub fn remaining_budget(&self) -> f64 {
        self.accountant.remaining_budget(self.meter.used(), self.meter.limit())
    }

    /// Active per-category budget fractions.
    pub fn category_budgets(&self) -> CategoryBudgets {
        self.budgets
    }

    /// Recompute the per-category budgets from the current workload size
    /// and banked reserve.
    pub fn refresh_budgets(&mut self) -> CategoryBudgets {
        let domains = self.workload.domain_count();
        let reserve = self.meter.reserve();
        self.budgets = adaptive_budget::category_budgets(domains, reserve, &self.adaptive);
        self.logger.debug(
            "budgets refreshed",
            json!({
                "domains": domains,
                "reserve": reserve,
                "high": self.budgets.high,
                "medium": self.budgets.medium,
                "low": self.budgets.low,
            }),
        );
        self.budgets
    }

    // Execution

    /// Epoch of the most recent `run()`.
    pub fn epoch(&self) -> Option<u64> {
        self.last_epoch
    }

    pub fn cursor(&self) -> &CursorState {
        &self.cursor
    }

    fn next_epoch(&mut self) -> u64 {
        match &mut self.epochs {
            EpochSource::Internal { next } => {
                let epoch = *next;
                *next += 1;
                epoch
            }
            EpochSource::External(clock) => clock.current_epoch(),
        }
    }

    /// Execute one epoch.
    #[instrument(skip(self), fields(kernel = %self.instance_id, epoch = tracing::field::Empty))]
    pub fn run(&mut self) -> EpochReport {
        let epoch = self.next_epoch();
        tracing::Span::current().record("epoch", epoch);

        self.meter.begin_epoch();
        if self.config.adaptive_budgets {
            self.refresh_budgets();
        }

        let (mut queue, summary) =
            ExecutionQueue::build(&mut self.registry, epoch, &self.decay, &self.breaker);
        queue.resolve_cursor(&self.cursor);

        for id in &summary.resumed {
            self.logger
                .info("suspension expired", json!({ "process_id": id, "epoch": epoch }));
        }

        let mut report = EpochReport::new(epoch);
        report.not_due = summary.not_due;
        report.suspended = summary.suspended;
        report.resumed = summary.resumed;

        let started = self.meter.used();
        let exhausted = self.dispatch(&mut queue, epoch, &mut report);
        report.cpu_used = (self.meter.used() - started).max(0.0);

        self.cursor = if exhausted {
            queue.cursor_state()
        } else {
            CursorState::default()
        };
        report.cursor = self.cursor.clone();
        self.meter.end_epoch();
        self.last_epoch = Some(epoch);

        if let Err(err) = self.persist() {
            self.logger
                .error("failed to save kernel state", json!({ "epoch": epoch, "error": err.to_string() }));
        }

        self.logger.debug(
            "epoch finished",
            json!({
                "epoch": epoch,
                "executed": report.executed.len(),
                "failed": report.failed.len(),
                "budget_skipped": report.budget_skipped.len(),
                "cpu_used": report.cpu_used,
            }),
        );
        report
    }

    /// Drain at most one lap of `queue` from its cursor. Returns whether the
    /// budget ran out before the lap was complete.
    fn dispatch(&mut self, queue: &mut ExecutionQueue, epoch: u64, report: &mut EpochReport) -> bool {
        let len = queue.len();
        let mut dispatched = 0;

        while dispatched < len {
            let Some(index) = queue.cursor() else {
                break;
            };

            if !self.has_budget() {
                // Only the process at the cursor is charged a skip; the rest
                // of the lap is reported but keeps its counters.
                if let Some(process) = queue.id_at(index).and_then(|id| self.registry.get_mut(id)) {
                    process.stats.consecutive_cpu_skips += 1;
                }
                report.budget_skipped.extend(
                    (0..len - dispatched)
                        .filter_map(|offset| queue.id_at((index + offset) % len))
                        .map(str::to_string),
                );
                self.logger.debug(
                    "budget exhausted",
                    json!({
                        "epoch": epoch,
                        "remaining": self.remaining_budget(),
                        "skipped": report.budget_skipped.len(),
                    }),
                );
                return true;
            }

            let Some(id) = queue.id_at(index).map(str::to_string) else {
                break;
            };
            self.invoke(&id, epoch, report);
            queue.advance();
            dispatched += 1;
        }
        false
    }

    /// Invoke one process inside the failure boundary.
    fn invoke(&mut self, id: &str, epoch: u64, report: &mut EpochReport) {
        let remaining = self.remaining_budget();
        let limit = self.meter.limit();
        let Some(process) = self.registry.get_mut(id) else {
            return;
        };

        let category_budget = self
            .accountant
            .category_limit(limit, self.budgets.get(process.frequency));
        let ctx = EpochContext {
            epoch,
            remaining_budget: remaining,
            category_budget,
        };

        process.stats.state = ProcessState::Running;
        let before = self.meter.used();
        let result = panic::catch_unwind(AssertUnwindSafe(|| process.process.execute(&ctx)));
        let cpu = (self.meter.used() - before).max(0.0);

        let outcome = match result {
            Ok(Ok(())) => DispatchOutcome::Succeeded,
            Ok(Err(err)) => DispatchOutcome::Failed {
                error: format!("{err:#}"),
            },
            Err(payload) => DispatchOutcome::Failed {
                error: format!("panicked: {}", panic_message(payload.as_ref())),
            },
        };

        process.stats.record_cpu(cpu);
        process.stats.last_run_tick = Some(epoch);
        process.stats.consecutive_cpu_skips = 0;

        let over_budget = cpu > category_budget;
        if over_budget {
            process.stats.budget_overruns += 1;
            self.logger.warn(
                "process exceeded its category budget",
                json!({
                    "process_id": id,
                    "epoch": epoch,
                    "cpu": cpu,
                    "category": process.frequency.as_str(),
                    "category_budget": category_budget,
                }),
            );
        }

        report.executed.push(id.to_string());
        match &outcome {
            DispatchOutcome::Succeeded => self.breaker.record_success(&mut process.stats),
            DispatchOutcome::Failed { error } => {
                report.failed.push(id.to_string());
                self.logger.error(
                    "process failed",
                    json!({
                        "process_id": id,
                        "epoch": epoch,
                        "error": error,
                        "consecutive_errors": process.stats.consecutive_errors + 1,
                    }),
                );

                match self.breaker.record_failure(&mut process.stats, epoch, error) {
                    BreakerTrip::None => {}
                    BreakerTrip::Suspended { until, backoff } => self.logger.warn(
                        "process suspended",
                        json!({
                            "process_id": id,
                            "until": until,
                            "backoff": backoff,
                            "consecutive_errors": process.stats.consecutive_errors,
                        }),
                    ),
                    BreakerTrip::Permanent => self.logger.error(
                        "process suspended permanently",
                        json!({
                            "process_id": id,
                            "consecutive_errors": process.stats.consecutive_errors,
                            "reason": process.stats.suspension_reason,
                        }),
                    ),
                }
            }
        }

        let event = DispatchEvent {
            epoch,
            process_id: id.to_string(),
            outcome,
            cpu,
            over_budget,
        };
        for observer in &self.observers {
            observer.on_dispatch(&event);
        }
    }

    // Persistence

    /// Cursor and statistics table.
    pub fn snapshot(&self) -> KernelSnapshot {
        KernelSnapshot {
            instance_id: self.instance_id,
            saved_at: Utc::now(),
            epoch: self.last_epoch,
            cursor: self.cursor.clone(),
            stats: self
                .registry
                .list()
                .into_iter()
                .map(|process| (process.id.clone(), process.stats.clone()))
                .collect(),
        }
    }

    /// Apply a snapshot. Statistics are restored for registered processes
    /// only; the number applied is returned.
    pub fn restore(&mut self, snapshot: KernelSnapshot) -> usize {
        let mut applied = 0;
        let mut dropped = Vec::new();
        for (id, stats) in snapshot.stats {
            match self.registry.get_mut(&id) {
                Some(process) => {
                    process.stats = stats;
                    applied += 1;
                }
                None => dropped.push(id),
            }
        }
        if !dropped.is_empty() {
            dropped.sort();
            self.logger.warn(
                "dropped statistics of unregistered processes",
                json!({ "process_ids": dropped }),
            );
        }

        self.cursor = snapshot.cursor;
        self.last_epoch = snapshot.epoch;
        if let (EpochSource::Internal { next }, Some(epoch)) = (&mut self.epochs, snapshot.epoch) {
            *next = epoch + 1;
        }

        self.logger.info(
            "kernel state restored",
            json!({
                "applied": applied,
                "epoch": snapshot.epoch,
                "saved_by": snapshot.instance_id.to_string(),
            }),
        );
        applied
    }

    /// Load and apply the stored snapshot. Returns whether one was found.
    ///
    /// # Errors
    /// Returns the store's error when loading fails.
    pub fn load_state(&mut self) -> Result<bool, StateStoreError> {
        let Some(store) = self.store.as_ref() else {
            return Ok(false);
        };
        match store.load()? {
            Some(snapshot) => {
                self.restore(snapshot);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// Save a snapshot to the injected store, if any.
    ///
    /// # Errors
    /// Returns the store's error when saving fails.
    pub fn persist(&self) -> Result<(), StateStoreError> {
        match &self.store {
            Some(store) => store.save(&self.snapshot()),
            None => Ok(()),
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic payload".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::models::{FrequencyCategory, Priority};
    use crate::domain::ports::Level;
    use crate::infrastructure::logging::MemoryLogger;
    use std::cell::RefCell;
    use std::rc::Rc;

    fn kernel() -> (Kernel, ManualMeter, MemoryLogger) {
        let meter = ManualMeter::new(100.0);
        let logger = MemoryLogger::new();
        let kernel = Kernel::new(SchedulerConfig::default())
            .with_meter(meter.clone())
            .with_logger(logger.clone());
        (kernel, meter, logger)
    }

    fn costly(id: &str, priority: Priority, meter: &ManualMeter, cost: f64) -> ProcessDescriptor {
        let meter = meter.clone();
        ProcessDescriptor::from_fn(id, id, move |_| {
            meter.add(cost);
            Ok(())
        })
        .with_priority(priority)
        .with_frequency(FrequencyCategory::High)
    }

    #[test]
    fn test_budget_skip_keeps_cursor() {
        let (mut kernel, meter, _) = kernel();
        for (id, priority) in [("a", Priority::Critical), ("b", Priority::High), ("c", Priority::Medium)] {
            kernel.register_process(costly(id, priority, &meter, 40.0)).unwrap();
        }

        let report = kernel.run();
        assert_eq!(report.executed, vec!["a", "b", "c"]);
        // only after "c" ran is the budget gone
        assert!(report.budget_skipped.is_empty());

        meter.set_used(60.0);
        let report = kernel.run();
        assert_eq!(report.executed, vec!["a"]);
        assert_eq!(report.budget_skipped, vec!["b", "c"]);
        assert_eq!(kernel.cursor().process_id.as_deref(), Some("b"));
        assert_eq!(kernel.get_process("b").unwrap().stats.consecutive_cpu_skips, 1);
        // only the process at the cursor is charged
        assert_eq!(kernel.get_process("c").unwrap().stats.consecutive_cpu_skips, 0);
    }

    #[test]
    fn test_cursor_leads_next_epoch() {
        let (mut kernel, meter, _) = kernel();
        for (id, priority) in [("a", Priority::Critical), ("b", Priority::High), ("c", Priority::Medium)] {
            kernel.register_process(costly(id, priority, &meter, 30.0)).unwrap();
        }

        let report = kernel.run();
        assert_eq!(report.executed, vec!["a", "b", "c"]);

        meter.set_used(0.0);
        kernel.run();
        meter.set_used(0.0);
        // a completed lap leaves the cursor at the head
        assert_eq!(kernel.cursor(), &CursorState::default());

        meter.set_used(50.0);
        let report = kernel.run();
        assert_eq!(report.executed, vec!["a", "b"]);
        assert_eq!(report.budget_skipped, vec!["c"]);

        meter.set_used(0.0);
        let report = kernel.run();
        // "c" is first in line even though it has the lowest static priority
        assert_eq!(report.executed.first().map(String::as_str), Some("c"));
        assert_eq!(kernel.get_process("c").unwrap().stats.consecutive_cpu_skips, 0);
    }

    #[test]
    fn test_no_budget_runs_nothing() {
        let (mut kernel, meter, logger) = kernel();
        kernel.register_process(costly("a", Priority::Low, &meter, 1.0)).unwrap();
        meter.set_used(99.0);

        let report = kernel.run();
        assert!(report.executed.is_empty());
        assert!(report.budget_exhausted());
        assert_eq!(kernel.get_process("a").unwrap().stats.run_count, 0);
        assert_eq!(logger.find(Level::Debug, "budget exhausted").len(), 1);
    }

    #[test]
    fn test_error_and_panic_are_contained() {
        let (mut kernel, _, logger) = kernel();
        kernel
            .register_process(
                ProcessDescriptor::from_fn("err", "err", |_| Err(anyhow::anyhow!("broken pipe")))
                    .with_frequency(FrequencyCategory::High),
            )
            .unwrap();
        kernel
            .register_process(
                ProcessDescriptor::from_fn("panic", "panic", |_| panic!("index out of bounds"))
                    .with_frequency(FrequencyCategory::High),
            )
            .unwrap();
        kernel
            .register_process(
                ProcessDescriptor::from_fn("ok", "ok", |_| Ok(())).with_frequency(FrequencyCategory::High),
            )
            .unwrap();

        let report = kernel.run();
        assert_eq!(report.executed.len(), 3);
        assert_eq!(report.failed, vec!["err", "panic"]);

        let panicked = kernel.get_process("panic").unwrap();
        assert_eq!(panicked.stats.state, ProcessState::Error);
        assert!(panicked.stats.last_error.as_deref().unwrap().contains("index out of bounds"));
        assert_eq!(
            kernel.get_process("err").unwrap().stats.last_error.as_deref(),
            Some("broken pipe")
        );
        assert_eq!(kernel.get_process("ok").unwrap().stats.state, ProcessState::Idle);
        assert_eq!(logger.find(Level::Error, "process failed").len(), 2);
    }

    #[test]
    fn test_category_overrun_is_soft() {
        let (mut kernel, meter, logger) = kernel();
        // high category: 25% of 100
        kernel.register_process(costly("hog", Priority::High, &meter, 30.0)).unwrap();
        kernel.register_process(costly("next", Priority::Low, &meter, 1.0)).unwrap();

        let report = kernel.run();
        assert_eq!(report.executed, vec!["hog", "next"]);
        assert_eq!(kernel.get_process("hog").unwrap().stats.budget_overruns, 1);
        assert_eq!(kernel.get_process("next").unwrap().stats.budget_overruns, 0);
        assert_eq!(logger.find(Level::Warn, "category budget").len(), 1);
    }

    #[test]
    fn test_context_carries_budgets() {
        let (mut kernel, _, _) = kernel();
        let seen = Rc::new(RefCell::new(None));
        let sink = Rc::clone(&seen);
        kernel
            .register_process(
                ProcessDescriptor::from_fn("probe", "probe", move |ctx| {
                    *sink.borrow_mut() = Some(*ctx);
                    Ok(())
                })
                .with_frequency(FrequencyCategory::Low),
            )
            .unwrap();

        kernel.run();
        let ctx = seen.borrow().unwrap();
        assert_eq!(ctx.epoch, 0);
        assert!((ctx.remaining_budget - 96.04).abs() < 1e-9);
        assert!((ctx.category_budget - 5.0).abs() < 1e-9);
    }

    #[test]
    fn test_internal_epochs_count_runs() {
        let (mut kernel, _, _) = kernel();
        assert_eq!(kernel.epoch(), None);
        assert_eq!(kernel.run().epoch, 0);
        assert_eq!(kernel.run().epoch, 1);
        assert_eq!(kernel.epoch(), Some(1));
    }

    #[test]
    fn test_suspend_unknown_process() {
        let (mut kernel, _, _) = kernel();
        assert!(!kernel.suspend_process("ghost"));
        assert!(!kernel.resume_process("ghost"));
        assert!(!kernel.unregister_process("ghost"));
    }

    #[test]
    fn test_rejected_registration_is_logged() {
        let (mut kernel, meter, logger) = kernel();
        kernel.register_process(costly("a", Priority::Low, &meter, 1.0)).unwrap();
        assert!(kernel.register_process(costly("a", Priority::Low, &meter, 1.0)).is_err());
        assert_eq!(logger.find(Level::Warn, "process rejected").len(), 1);
    }

    #[test]
    fn test_panic_message_variants() {
        assert_eq!(panic_message(&"static"), "static");
        assert_eq!(panic_message(&String::from("owned")), "owned");
        assert_eq!(panic_message(&42_u8), "unknown panic payload");
    }
}
