//! End-to-end scheduling behavior of the kernel through its public API.

use std::cell::RefCell;
use std::rc::Rc;
use std::sync::{Arc, Mutex};

use tickwise::domain::ports::{DispatchEvent, DispatchObserver, StateStore};
use tickwise::infrastructure::{
    JsonFileStore, ManualClock, ManualMeter, ManualWorkload, MemoryLogger, MemoryStore,
};
use tickwise::{
    FrequencyCategory, Kernel, Priority, ProcessDescriptor, ProcessState, SchedulerConfig,
    SuspendedUntil, ValidationError,
};

type Trace = Rc<RefCell<Vec<(u64, String)>>>;

fn quiet_kernel() -> (Kernel, ManualMeter) {
    let meter = ManualMeter::new(100.0);
    let kernel = Kernel::new(SchedulerConfig::default())
        .with_meter(meter.clone())
        .with_logger(MemoryLogger::new());
    (kernel, meter)
}

/// Descriptor that appends `(epoch, id)` to `trace` on every run.
fn traced(id: &str, trace: &Trace) -> ProcessDescriptor {
    let trace = Rc::clone(trace);
    let name = id.to_string();
    ProcessDescriptor::from_fn(id, id, move |ctx| {
        trace.borrow_mut().push((ctx.epoch, name.clone()));
        Ok(())
    })
}

fn failing(id: &str) -> ProcessDescriptor {
    ProcessDescriptor::from_fn(id, id, |ctx| Err(anyhow::anyhow!("lost contact at epoch {}", ctx.epoch)))
        .with_frequency(FrequencyCategory::High)
}

fn epochs_of(trace: &Trace, id: &str) -> Vec<u64> {
    trace
        .borrow()
        .iter()
        .filter(|(_, name)| name == id)
        .map(|(epoch, _)| *epoch)
        .collect()
}

#[test]
fn test_priority_order_with_ample_budget() {
    let (mut kernel, _) = quiet_kernel();
    let trace: Trace = Rc::default();

    for (id, priority) in [
        ("low", Priority::Low),
        ("critical", Priority::Critical),
        ("medium", Priority::Medium),
        ("high", Priority::High),
    ] {
        kernel
            .register_process(
                traced(id, &trace)
                    .with_priority(priority)
                    .with_frequency(FrequencyCategory::High),
            )
            .unwrap();
    }

    let report = kernel.run();
    assert_eq!(report.executed, vec!["critical", "high", "medium", "low"]);
    let order: Vec<String> = trace.borrow().iter().map(|(_, id)| id.clone()).collect();
    assert_eq!(order, vec!["critical", "high", "medium", "low"]);
}

#[test]
fn test_equal_priority_runs_in_registration_order() {
    let (mut kernel, _) = quiet_kernel();
    let trace: Trace = Rc::default();
    for id in ["first", "second", "third"] {
        kernel
            .register_process(traced(id, &trace).with_frequency(FrequencyCategory::High))
            .unwrap();
    }

    let report = kernel.run();
    assert_eq!(report.executed, vec!["first", "second", "third"]);
}

#[test]
fn test_budget_readings() {
    let (kernel, meter) = quiet_kernel();

    meter.set_used(30.0);
    assert!((kernel.remaining_budget() - 66.04).abs() < 1e-9);

    meter.set_used(97.0);
    assert!(!kernel.has_budget());

    meter.set_used(50.0);
    assert!(kernel.has_budget());
}

#[test]
fn test_interval_schedule() {
    let (mut kernel, _) = quiet_kernel();
    let trace: Trace = Rc::default();
    kernel
        .register_process(
            traced("archive", &trace)
                .with_frequency(FrequencyCategory::Low)
                .with_interval(100),
        )
        .unwrap();

    for _ in 0..=100 {
        kernel.run();
    }

    assert_eq!(epochs_of(&trace, "archive"), vec![0, 100]);
    let stats = kernel.get_process("archive").unwrap().stats;
    assert_eq!(stats.run_count, 2);
    assert_eq!(stats.skipped_count, 99);
}

#[test]
fn test_modulo_schedule_on_external_clock() {
    let clock = ManualClock::new(1000);
    let mut kernel = Kernel::new(SchedulerConfig::default())
        .with_clock(clock.clone())
        .with_logger(MemoryLogger::new());
    let trace: Trace = Rc::default();
    kernel
        .register_process(traced("census", &trace).with_tick_modulo(5, 2))
        .unwrap();

    for epoch in 1000..1020 {
        clock.set(epoch);
        assert_eq!(kernel.run().epoch, epoch);
    }

    assert_eq!(epochs_of(&trace, "census"), vec![1003, 1008, 1013, 1018]);
}

#[test]
fn test_invalid_modulo_is_rejected() {
    let (mut kernel, _) = quiet_kernel();

    let err = kernel
        .register_process(ProcessDescriptor::from_fn("a", "a", |_| Ok(())).with_tick_modulo(5, 5))
        .unwrap_err();
    assert_eq!(
        err,
        ValidationError::InvalidTickOffset {
            id: "a".to_string(),
            offset: 5,
            modulo: 5
        }
    );

    let err = kernel
        .register_process(ProcessDescriptor::from_fn("b", "b", |_| Ok(())).with_tick_modulo(-3, 0))
        .unwrap_err();
    assert!(err.to_string().contains("tick_modulo -3"));

    assert!(kernel.list_processes().is_empty());
}

#[test]
fn test_three_failures_suspend_then_success_resets() {
    let (mut kernel, _) = quiet_kernel();
    let fail = Rc::new(RefCell::new(true));
    let toggle = Rc::clone(&fail);
    kernel
        .register_process(
            ProcessDescriptor::from_fn("flaky", "flaky", move |_| {
                if *toggle.borrow() {
                    anyhow::bail!("timeout");
                }
                Ok(())
            })
            .with_frequency(FrequencyCategory::High),
        )
        .unwrap();

    for _ in 0..3 {
        kernel.run();
    }
    let stats = kernel.get_process("flaky").unwrap().stats;
    assert_eq!(stats.state, ProcessState::Suspended);
    assert_eq!(stats.consecutive_errors, 3);
    match stats.suspended_until {
        Some(SuspendedUntil::Epoch(until)) => assert!(until > 2, "until {until}"),
        other => panic!("unexpected suspension {other:?}"),
    }

    // suspended processes are not invoked
    let report = kernel.run();
    assert!(report.executed.is_empty());
    assert_eq!(report.suspended, 1);

    *fail.borrow_mut() = false;
    assert!(kernel.resume_process("flaky"));
    kernel.run();
    let stats = kernel.get_process("flaky").unwrap().stats;
    assert_eq!(stats.consecutive_errors, 0);
    assert_eq!(stats.state, ProcessState::Idle);
    assert_eq!(stats.error_count, 3);
}

#[test]
fn test_suspension_expires_on_its_own() {
    let clock = ManualClock::new(0);
    let mut kernel = Kernel::new(SchedulerConfig::default())
        .with_clock(clock.clone())
        .with_logger(MemoryLogger::new());
    kernel.register_process(failing("beacon")).unwrap();

    for epoch in 0..3 {
        clock.set(epoch);
        kernel.run();
    }
    let Some(SuspendedUntil::Epoch(until)) = kernel.get_process("beacon").unwrap().stats.suspended_until
    else {
        panic!("expected a temporary suspension");
    };

    clock.set(until - 1);
    assert!(kernel.run().executed.is_empty());

    clock.set(until);
    let report = kernel.run();
    assert_eq!(report.resumed, vec!["beacon"]);
    assert_eq!(report.executed, vec!["beacon"]);
}

#[test]
fn test_ten_failures_suspend_forever() {
    let (mut kernel, _) = quiet_kernel();
    kernel.register_process(failing("doomed")).unwrap();

    let mut failures = 0;
    while failures < 10 {
        let report = kernel.run();
        failures += report.failed.len();
        let stats = kernel.get_process("doomed").unwrap().stats;
        if stats.is_suspended() && failures < 10 {
            assert!(matches!(stats.suspended_until, Some(SuspendedUntil::Epoch(_))));
            kernel.resume_process("doomed");
        }
    }

    let stats = kernel.get_process("doomed").unwrap().stats;
    assert_eq!(stats.consecutive_errors, 10);
    assert_eq!(stats.state, ProcessState::Suspended);
    assert_eq!(stats.suspended_until, Some(SuspendedUntil::Forever));

    for _ in 0..50 {
        assert!(kernel.run().executed.is_empty());
    }
    assert_eq!(kernel.get_process("doomed").unwrap().stats.state, ProcessState::Suspended);
}

#[test]
fn test_get_process_is_idempotent() {
    let (mut kernel, meter) = quiet_kernel();
    let cost = meter.clone();
    kernel
        .register_process(
            ProcessDescriptor::from_fn("worker", "worker", move |_| {
                cost.add(3.0);
                Ok(())
            })
            .with_frequency(FrequencyCategory::High),
        )
        .unwrap();
    kernel.run();

    let first = kernel.get_process("worker").unwrap();
    let second = kernel.get_process("worker").unwrap();
    assert_eq!(first, second);
    assert!((first.stats.total_cpu - 3.0).abs() < 1e-9);
}

#[test]
fn test_manual_suspend_resume_round_trip() {
    let (mut kernel, _) = quiet_kernel();
    let trace: Trace = Rc::default();
    kernel
        .register_process(traced("hauler", &trace).with_interval(2))
        .unwrap();

    kernel.run(); // epoch 0
    assert!(kernel.suspend_process("hauler"));
    assert_eq!(
        kernel.get_process("hauler").unwrap().stats.suspended_until,
        Some(SuspendedUntil::Forever)
    );
    kernel.run(); // epoch 1
    kernel.run(); // epoch 2, due but suspended

    assert!(kernel.resume_process("hauler"));
    assert_eq!(kernel.get_process("hauler").unwrap().stats.state, ProcessState::Idle);
    kernel.run(); // epoch 3, due again
    kernel.run(); // epoch 4, only one epoch since the last run

    assert_eq!(epochs_of(&trace, "hauler"), vec![0, 3]);
    assert_eq!(kernel.get_process("hauler").unwrap().stats.consecutive_errors, 0);
}

#[test]
fn test_starved_process_leads_after_budget_skips() {
    let (mut kernel, meter) = quiet_kernel();
    let trace: Trace = Rc::default();
    for (id, priority) in [("core", Priority::Critical), ("extra", Priority::Low)] {
        let meter = meter.clone();
        let trace = Rc::clone(&trace);
        let name = id.to_string();
        kernel
            .register_process(
                ProcessDescriptor::from_fn(id, id, move |ctx| {
                    meter.add(97.0);
                    trace.borrow_mut().push((ctx.epoch, name.clone()));
                    Ok(())
                })
                .with_priority(priority)
                .with_frequency(FrequencyCategory::High),
            )
            .unwrap();
    }

    meter.set_used(0.0);
    let report = kernel.run();
    assert_eq!(report.executed, vec!["core"]);
    assert_eq!(report.budget_skipped, vec!["extra"]);

    meter.set_used(0.0);
    let report = kernel.run();
    assert_eq!(report.executed, vec!["extra"]);
    assert_eq!(epochs_of(&trace, "extra"), vec![1]);
}

#[test]
fn test_priority_order_returns_after_exhausted_epoch() {
    let (mut kernel, meter) = quiet_kernel();
    for (id, priority) in [("a", Priority::Critical), ("b", Priority::High), ("c", Priority::Medium)] {
        let cost = meter.clone();
        kernel
            .register_process(
                ProcessDescriptor::from_fn(id, id, move |_| {
                    cost.add(40.0);
                    Ok(())
                })
                .with_priority(priority)
                .with_frequency(FrequencyCategory::High),
            )
            .unwrap();
    }

    meter.set_used(60.0);
    let report = kernel.run();
    assert_eq!(report.executed, vec!["a"]);
    assert_eq!(report.budget_skipped, vec!["b", "c"]);
    assert_eq!(kernel.get_process("b").unwrap().stats.consecutive_cpu_skips, 1);
    assert_eq!(kernel.get_process("c").unwrap().stats.consecutive_cpu_skips, 0);

    // the skipped process leads once, then the lap is whole again
    meter.set_limit(1_000.0);
    meter.set_used(0.0);
    assert_eq!(kernel.run().executed, vec!["b", "c", "a"]);

    for _ in 0..3 {
        meter.set_used(0.0);
        assert_eq!(kernel.run().executed, vec!["a", "b", "c"]);
    }
    assert_eq!(kernel.cursor().process_id, None);
}

#[test]
fn test_snapshot_restores_into_new_kernel() {
    let store = MemoryStore::new();
    let (kernel, _) = quiet_kernel();
    let mut kernel = kernel.with_state_store(store.clone());
    kernel.register_process(failing("relay")).unwrap();
    kernel
        .register_process(ProcessDescriptor::from_fn("ok", "ok", |_| Ok(())).with_frequency(FrequencyCategory::High))
        .unwrap();
    kernel.run();
    kernel.run();

    let saved = store.latest().expect("snapshot saved after run");
    assert_eq!(saved.epoch, Some(1));

    let mut restored = Kernel::new(SchedulerConfig::default())
        .with_logger(MemoryLogger::new())
        .with_state_store(store);
    restored.register_process(failing("relay")).unwrap();
    assert!(restored.load_state().unwrap());

    assert_eq!(restored.epoch(), Some(1));
    assert_eq!(restored.get_process("relay").unwrap().stats.consecutive_errors, 2);
    assert!(restored.get_process("ok").is_none());
    assert_eq!(restored.run().epoch, 2);
}

#[test]
fn test_json_file_store_round_trip() {
    let dir = tempfile::TempDir::new().unwrap();
    let path = dir.path().join("state").join("kernel.json");

    let mut kernel = Kernel::new(SchedulerConfig::default())
        .with_logger(MemoryLogger::new())
        .with_state_store(JsonFileStore::new(&path));
    kernel
        .register_process(ProcessDescriptor::from_fn("scout", "scout", |_| Ok(())).with_frequency(FrequencyCategory::High))
        .unwrap();
    kernel.run();
    kernel.run();
    kernel.run();
    assert!(path.exists());

    let snapshot = JsonFileStore::new(&path).load().unwrap().unwrap();
    assert_eq!(snapshot.epoch, Some(2));
    assert_eq!(snapshot.stats["scout"].run_count, 3);
    assert_eq!(snapshot.instance_id, kernel.instance_id());
}

#[derive(Clone, Default)]
struct Recorder(Arc<Mutex<Vec<DispatchEvent>>>);

impl DispatchObserver for Recorder {
    fn on_dispatch(&self, event: &DispatchEvent) {
        self.0.lock().unwrap().push(event.clone());
    }
}

#[test]
fn test_observer_sees_every_invocation() {
    let recorder = Recorder::default();
    let (kernel, _) = quiet_kernel();
    let mut kernel = kernel.with_observer(recorder.clone());
    kernel
        .register_process(ProcessDescriptor::from_fn("ok", "ok", |_| Ok(())).with_frequency(FrequencyCategory::High))
        .unwrap();
    kernel.register_process(failing("bad")).unwrap();

    kernel.run();
    kernel.run();

    let events = recorder.0.lock().unwrap();
    assert_eq!(events.len(), 4);
    assert_eq!(events.iter().filter(|e| !e.outcome.is_success()).count(), 2);
    assert!(events.iter().all(|e| !e.over_budget));
    assert_eq!(events[2].epoch, 1);
}

#[test]
fn test_adaptive_refresh_follows_workload() {
    let workload = ManualWorkload::new(1);
    let meter = ManualMeter::new(100.0).with_reserve(5000);
    let config = SchedulerConfig {
        adaptive_budgets: true,
        ..SchedulerConfig::default()
    };
    let mut kernel = Kernel::new(config)
        .with_meter(meter.clone())
        .with_workload(workload.clone())
        .with_logger(MemoryLogger::new());

    kernel.run();
    let baseline = kernel.category_budgets();
    assert!((baseline.high - 0.25).abs() < 1e-12);

    workload.set(8);
    kernel.run();
    let scaled = kernel.category_budgets();
    assert!(scaled.high > baseline.high);
    assert!(scaled.low > baseline.low);

    meter.set_reserve(100);
    kernel.run();
    assert!(kernel.category_budgets().high < scaled.high);
}

#[test]
fn test_static_budgets_without_adaptive_refresh() {
    let workload = ManualWorkload::new(50);
    let mut kernel = Kernel::new(SchedulerConfig::default())
        .with_workload(workload)
        .with_logger(MemoryLogger::new());
    kernel.run();
    assert_eq!(kernel.category_budgets(), SchedulerConfig::default().frequency_budgets);
}
