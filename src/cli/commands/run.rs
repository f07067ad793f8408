//! `tickwise run`: drive the kernel from a simulated host.
//!
//! Each tick of a tokio interval is one epoch, executed under
//! `block_in_place`, so the host needs the multi-threaded runtime. Execution
//! time is measured on the wall clock by an [`InstantMeter`], and the
//! configured process table is registered as synthetic processes that sleep
//! for their cost and can fail on a fixed cadence.

use std::path::PathBuf;
use std::thread;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Args;
use serde::Serialize;
use tokio::sync::mpsc;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::cli::output::{output, CommandOutput, TableFormatter};
use crate::domain::models::{
    AppConfig, CategoryBudgets, EpochContext, EpochReport, FrequencyCategory, Priority, Process,
    ProcessDescriptor, ProcessSpec,
};
use crate::domain::ports::{DispatchEvent, ResourceMeter};
use crate::infrastructure::host::{FixedWorkload, InstantMeter};
use crate::infrastructure::persistence::JsonFileStore;
use crate::infrastructure::telemetry::ChannelObserver;
use crate::services::{Kernel, ProcessView};

#[derive(Args, Debug)]
pub struct RunArgs {
    /// Number of epochs to run; runs until Ctrl-C when omitted
    #[arg(short, long)]
    pub epochs: Option<u64>,

    /// Epoch length in milliseconds (overrides host.tick_ms)
    #[arg(long)]
    pub tick_ms: Option<u64>,

    /// Snapshot file (overrides host.state_path)
    #[arg(long)]
    pub state: Option<PathBuf>,

    /// Recompute category budgets at the start of every epoch
    #[arg(long)]
    pub adaptive: bool,
}

/// Process that simulates a fixed amount of work.
#[derive(Debug, Clone)]
pub struct SyntheticProcess {
    cost: Duration,
    fail_every: Option<u64>,
}

impl SyntheticProcess {
    pub fn new(cost: Duration, fail_every: Option<u64>) -> Self {
        Self { cost, fail_every }
    }

    pub fn from_spec(spec: &ProcessSpec) -> Self {
        Self::new(Duration::from_millis(spec.cost_ms), spec.fail_every)
    }
}

impl Process for SyntheticProcess {
    fn execute(&mut self, ctx: &EpochContext) -> Result<()> {
        if !self.cost.is_zero() {
            thread::sleep(self.cost);
        }
        if let Some(every) = self.fail_every.filter(|every| *every > 0) {
            if ctx.epoch % every == 0 {
                anyhow::bail!("simulated failure at epoch {}", ctx.epoch);
            }
        }
        Ok(())
    }
}

/// Descriptor for one entry of the configured process table.
pub fn descriptor_from_spec(spec: &ProcessSpec) -> ProcessDescriptor {
    let name = spec.name.clone().unwrap_or_else(|| spec.id.clone());
    let mut descriptor = ProcessDescriptor::new(spec.id.clone(), name, SyntheticProcess::from_spec(spec))
        .with_priority(spec.priority);
    descriptor.frequency = spec.frequency;
    descriptor.interval = spec.interval;
    descriptor.tick_modulo = spec.tick_modulo;
    descriptor.tick_offset = spec.tick_offset;
    descriptor
}

/// Table used when the configuration defines no processes.
pub fn demo_processes() -> Vec<ProcessSpec> {
    let spec = |id: &str, priority, frequency, cost_ms| ProcessSpec {
        id: id.to_string(),
        name: None,
        priority,
        frequency: Some(frequency),
        interval: None,
        tick_modulo: None,
        tick_offset: None,
        cost_ms,
        fail_every: None,
    };

    vec![
        spec("spawner", Priority::Critical, FrequencyCategory::High, 2),
        spec("defense", Priority::High, FrequencyCategory::High, 3),
        spec("logistics", Priority::Medium, FrequencyCategory::Medium, 4),
        spec("construction", Priority::Low, FrequencyCategory::Medium, 6),
        ProcessSpec {
            fail_every: Some(3),
            ..spec("market", Priority::Low, FrequencyCategory::Low, 1)
        },
        ProcessSpec {
            tick_modulo: Some(10),
            tick_offset: Some(3),
            ..spec("stats", Priority::Medium, FrequencyCategory::Low, 1)
        },
    ]
}

/// Totals folded from the dispatch event stream.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct DispatchTotals {
    pub invocations: u64,
    pub failures: u64,
    pub over_budget: u64,
    pub cpu_ms: f64,
}

impl DispatchTotals {
    fn record(&mut self, event: &DispatchEvent) {
        self.invocations += 1;
        self.cpu_ms += event.cpu;
        if !event.outcome.is_success() {
            self.failures += 1;
        }
        if event.over_budget {
            self.over_budget += 1;
        }
    }
}

async fn collect_events(mut rx: mpsc::UnboundedReceiver<DispatchEvent>) -> DispatchTotals {
    let mut totals = DispatchTotals::default();
    while let Some(event) = rx.recv().await {
        if event.over_budget {
            debug!(process_id = %event.process_id, cpu_ms = event.cpu, "over category budget");
        }
        totals.record(&event);
    }
    totals
}

/// Totals folded from epoch reports.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct EpochTotals {
    pub epochs: u64,
    pub executed: u64,
    pub failed: u64,
    pub budget_skipped: u64,
    pub exhausted_epochs: u64,
}

impl EpochTotals {
    fn record(&mut self, report: &EpochReport) {
        self.epochs += 1;
        self.executed += report.executed.len() as u64;
        self.failed += report.failed.len() as u64;
        self.budget_skipped += report.budget_skipped.len() as u64;
        if report.budget_exhausted() {
            self.exhausted_epochs += 1;
        }
    }
}

#[derive(Debug, Serialize)]
pub struct RunOutput {
    pub instance_id: Uuid,
    pub last_epoch: Option<u64>,
    pub totals: EpochTotals,
    pub events: DispatchTotals,
    pub reserve: u32,
    pub budgets: CategoryBudgets,
    pub processes: Vec<ProcessView>,
}

impl CommandOutput for RunOutput {
    fn to_human(&self) -> String {
        let formatter = TableFormatter::new();
        let mut lines = vec![
            format!(
                "Ran {} epoch(s) (last epoch {}), kernel {}",
                self.totals.epochs,
                self.last_epoch.map_or_else(|| "-".to_string(), |e| e.to_string()),
                self.instance_id
            ),
            format!(
                "Invocations: {} ({} failed, {} over category budget), budget skips: {} in {} epoch(s)",
                self.events.invocations,
                self.events.failures,
                self.events.over_budget,
                self.totals.budget_skipped,
                self.totals.exhausted_epochs
            ),
            format!(
                "Reserve: {}, budgets high/medium/low: {:.3}/{:.3}/{:.3}",
                self.reserve, self.budgets.high, self.budgets.medium, self.budgets.low
            ),
            formatter.format_processes(&self.processes),
        ];
        if let Some(suspended) = formatter.format_suspensions(&self.processes) {
            lines.push("Suspended:".to_string());
            lines.push(suspended);
        }
        lines.join("\n")
    }
}

pub async fn execute(args: RunArgs, mut config: AppConfig, json_mode: bool) -> Result<()> {
    config.scheduler.adaptive_budgets |= args.adaptive;
    let tick_ms = args.tick_ms.unwrap_or(config.host.tick_ms).max(1);
    let state_path = args
        .state
        .or_else(|| config.host.state_path.as_ref().map(PathBuf::from));

    let meter = InstantMeter::new(
        config.host.cpu_limit_ms,
        config.host.initial_reserve,
        config.host.reserve_cap,
    );
    let (observer, rx) = ChannelObserver::channel();
    let collector = tokio::spawn(collect_events(rx));

    let mut kernel = Kernel::new(config.scheduler.clone())
        .with_meter(meter.clone())
        .with_workload(FixedWorkload(config.host.domain_count))
        .with_adaptive_config(config.adaptive.clone())
        .with_observer(observer);
    if let Some(path) = &state_path {
        kernel = kernel.with_state_store(JsonFileStore::new(path));
    }

    let specs = if config.processes.is_empty() {
        info!("no processes configured, using the demo table");
        demo_processes()
    } else {
        config.processes.clone()
    };
    for spec in &specs {
        kernel
            .register_process(descriptor_from_spec(spec))
            .with_context(|| format!("Invalid process '{}'", spec.id))?;
    }

    if kernel.load_state().context("Failed to load kernel state")? {
        info!(epoch = ?kernel.epoch(), "resumed from saved state");
    }

    info!(
        kernel = %kernel.instance_id(),
        processes = specs.len(),
        tick_ms,
        epochs = ?args.epochs,
        "starting simulated host"
    );

    let mut ticker = tokio::time::interval(Duration::from_millis(tick_ms));
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    let shutdown = tokio::signal::ctrl_c();
    tokio::pin!(shutdown);

    let mut totals = EpochTotals::default();
    loop {
        if args.epochs.is_some_and(|limit| totals.epochs >= limit) {
            break;
        }
        tokio::select! {
            _ = ticker.tick() => {
                // Processes block the thread while they run; other tasks on
                // this worker are handed off until the epoch returns.
                let report = tokio::task::block_in_place(|| kernel.run());
                debug!(
                    epoch = report.epoch,
                    executed = report.executed.len(),
                    failed = report.failed.len(),
                    budget_skipped = report.budget_skipped.len(),
                    cpu_ms = report.cpu_used,
                    "epoch complete"
                );
                totals.record(&report);
            }
            result = &mut shutdown => {
                if let Err(err) = result {
                    warn!(error = %err, "failed to listen for ctrl-c");
                }
                info!("interrupted");
                break;
            }
        }
    }

    let result = RunOutput {
        instance_id: kernel.instance_id(),
        last_epoch: kernel.epoch(),
        totals,
        events: DispatchTotals::default(),
        reserve: meter.reserve(),
        budgets: kernel.category_budgets(),
        processes: kernel.list_processes(),
    };
    // Dropping the kernel closes the event channel.
    drop(kernel);
    let events = collector.await.context("Telemetry task failed")?;

    output(&RunOutput { events, ..result }, json_mode);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ports::DispatchOutcome;

    fn ctx(epoch: u64) -> EpochContext {
        EpochContext {
            epoch,
            remaining_budget: 10.0,
            category_budget: 5.0,
        }
    }

    #[test]
    fn test_synthetic_failure_cadence() {
        let mut process = SyntheticProcess::new(Duration::ZERO, Some(3));
        assert!(process.execute(&ctx(1)).is_ok());
        assert!(process.execute(&ctx(2)).is_ok());
        let err = process.execute(&ctx(3)).unwrap_err();
        assert!(err.to_string().contains("epoch 3"));
    }

    #[test]
    fn test_zero_fail_every_never_fails() {
        let mut process = SyntheticProcess::new(Duration::ZERO, Some(0));
        assert!(process.execute(&ctx(0)).is_ok());
    }

    #[test]
    fn test_demo_table_registers() {
        let mut kernel = Kernel::new(AppConfig::default().scheduler);
        for spec in demo_processes() {
            kernel.register_process(descriptor_from_spec(&spec)).unwrap();
        }
        let stats = kernel.get_process("stats").unwrap();
        assert_eq!(stats.schedule.description(), "(epoch + 3) mod 10 == 0");
        assert_eq!(kernel.list_processes().len(), 6);
    }

    #[test]
    fn test_totals_from_events() {
        let mut totals = DispatchTotals::default();
        totals.record(&DispatchEvent {
            epoch: 1,
            process_id: "a".to_string(),
            outcome: DispatchOutcome::Failed {
                error: "boom".to_string(),
            },
            cpu: 2.0,
            over_budget: true,
        });
        assert_eq!(totals.invocations, 1);
        assert_eq!(totals.failures, 1);
        assert_eq!(totals.over_budget, 1);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_run_fixed_epochs_with_state() {
        let dir = tempfile::TempDir::new().unwrap();
        let state = dir.path().join("state.json");
        let config = AppConfig::default();

        execute(
            RunArgs {
                epochs: Some(3),
                tick_ms: Some(1),
                state: Some(state.clone()),
                adaptive: true,
            },
            config,
            true,
        )
        .await
        .unwrap();

        let saved: crate::domain::models::KernelSnapshot =
            serde_json::from_str(&std::fs::read_to_string(&state).unwrap()).unwrap();
        assert_eq!(saved.epoch, Some(2));
        assert_eq!(saved.stats.len(), 6);
    }
}
