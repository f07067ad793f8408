//! CLI command implementations.

pub mod budgets;
pub mod config;
pub mod run;
