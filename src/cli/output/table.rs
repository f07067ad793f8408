//! Table output formatting for CLI commands
//!
//! Process statistics and budget tables rendered with comfy-table.
//! Honors `NO_COLOR` and dumb terminals.

use crate::domain::models::{FrequencyCategory, ProcessState};
use crate::services::ProcessView;
use comfy_table::{presets, Attribute, Cell, CellAlignment, Color, ContentArrangement, Table};
use std::env;

use super::truncate;

/// One row of the budget table.
#[derive(Debug, Clone, serde::Serialize)]
pub struct BudgetRow {
    pub category: FrequencyCategory,
    pub base: f64,
    pub scale_multiplier: f64,
    pub reserve_multiplier: f64,
    pub budget: f64,
    /// Budget in host time units for the configured per-epoch limit.
    pub budget_ms: f64,
}

/// Table formatter for CLI output
pub struct TableFormatter {
    /// Whether to use colors in output
    use_colors: bool,
    /// Maximum width for tables (None = auto)
    max_width: Option<u16>,
}

impl TableFormatter {
    pub fn new() -> Self {
        Self {
            use_colors: supports_color(),
            max_width: None,
        }
    }

    pub fn with_config(use_colors: bool, max_width: Option<u16>) -> Self {
        Self {
            use_colors,
            max_width,
        }
    }

    /// Format process statistics
    pub fn format_processes(&self, processes: &[ProcessView]) -> String {
        let mut table = self.create_base_table();

        table.set_header(
            [
                "ID", "Priority", "Schedule", "State", "Runs", "Skips", "CPU skips", "Errors",
                "Avg CPU", "Max CPU", "Health",
            ]
            .into_iter()
            .map(|title| Cell::new(title).add_attribute(Attribute::Bold)),
        );

        for process in processes {
            let stats = &process.stats;
            let state_cell = if self.use_colors {
                Cell::new(stats.state.as_str()).fg(state_color(stats.state))
            } else {
                Cell::new(format!("{} {}", state_icon(stats.state), stats.state.as_str()))
            };

            let health_cell = Cell::new(format!("{:.0}", stats.health_score))
                .set_alignment(CellAlignment::Right);
            let health_cell = if self.use_colors {
                health_cell.fg(health_color(stats.health_score))
            } else {
                health_cell
            };

            table.add_row(vec![
                Cell::new(truncate(&process.id, 24)),
                Cell::new(process.priority.as_str()),
                Cell::new(process.schedule.description()),
                state_cell,
                numeric(stats.run_count.to_string()),
                numeric(stats.skipped_count.to_string()),
                numeric(stats.consecutive_cpu_skips.to_string()),
                numeric(stats.error_count.to_string()),
                numeric(format!("{:.2}", stats.avg_cpu)),
                numeric(format!("{:.2}", stats.max_cpu)),
                health_cell,
            ]);
        }

        table.to_string()
    }

    /// Format suspended processes with their reason, empty when none are
    pub fn format_suspensions(&self, processes: &[ProcessView]) -> Option<String> {
        let suspended: Vec<&ProcessView> = processes
            .iter()
            .filter(|p| p.stats.state == ProcessState::Suspended)
            .collect();
        if suspended.is_empty() {
            return None;
        }

        let mut table = self.create_base_table();
        table.set_header(vec![
            Cell::new("ID").add_attribute(Attribute::Bold),
            Cell::new("Until").add_attribute(Attribute::Bold),
            Cell::new("Reason").add_attribute(Attribute::Bold),
        ]);
        for process in suspended {
            let until = process
                .stats
                .suspended_until
                .map_or_else(|| "-".to_string(), |until| until.description());
            table.add_row(vec![
                Cell::new(&process.id),
                Cell::new(until),
                Cell::new(process.stats.suspension_reason.as_deref().unwrap_or("-")),
            ]);
        }
        Some(table.to_string())
    }

    /// Format adaptive budget rows
    pub fn format_budgets(&self, rows: &[BudgetRow]) -> String {
        let mut table = self.create_base_table();
        table.set_header(
            ["Category", "Base", "Scale x", "Reserve x", "Budget", "Budget (ms)"]
                .into_iter()
                .map(|title| Cell::new(title).add_attribute(Attribute::Bold)),
        );

        for row in rows {
            let budget = numeric(format!("{:.4}", row.budget));
            let budget = if self.use_colors {
                budget.fg(Color::Cyan)
            } else {
                budget
            };
            table.add_row(vec![
                Cell::new(row.category.as_str()),
                numeric(format!("{:.2}", row.base)),
                numeric(format!("{:.3}", row.scale_multiplier)),
                numeric(format!("{:.1}", row.reserve_multiplier)),
                budget,
                numeric(format!("{:.2}", row.budget_ms)),
            ]);
        }
        table.to_string()
    }

    /// Create a base table with common settings
    fn create_base_table(&self) -> Table {
        let mut table = Table::new();
        table
            .load_preset(presets::UTF8_FULL)
            .set_content_arrangement(ContentArrangement::Dynamic);

        if let Some(width) = self.max_width {
            table.set_width(width);
        }

        table
    }
}

impl Default for TableFormatter {
    fn default() -> Self {
        Self::new()
    }
}

fn numeric(text: String) -> Cell {
    Cell::new(text).set_alignment(CellAlignment::Right)
}

/// Check if color output is supported
fn supports_color() -> bool {
    if env::var("NO_COLOR").is_ok() {
        return false;
    }

    if let Ok(term) = env::var("TERM") {
        if term == "dumb" {
            return false;
        }
    }

    true
}

fn state_color(state: ProcessState) -> Color {
    match state {
        ProcessState::Idle => Color::Green,
        ProcessState::Running => Color::Blue,
        ProcessState::Error => Color::Yellow,
        ProcessState::Suspended => Color::Red,
    }
}

fn state_icon(state: ProcessState) -> &'static str {
    match state {
        ProcessState::Idle => "○",
        ProcessState::Running => "▶",
        ProcessState::Error => "!",
        ProcessState::Suspended => "✗",
    }
}

fn health_color(health: f64) -> Color {
    if health >= 80.0 {
        Color::Green
    } else if health >= 40.0 {
        Color::Yellow
    } else {
        Color::Red
    }
}
