pub mod adaptive_budget;
pub mod budget_accountant;
pub mod circuit_breaker;
pub mod execution_queue;
pub mod kernel;
pub mod priority_decay;
pub mod registry;

pub use adaptive_budget::{
    adaptive_budget, adaptive_budgets, category_budgets, reserve_multiplier, room_scaling_multiplier,
};
pub use budget_accountant::BudgetAccountant;
pub use circuit_breaker::{BreakerTrip, CircuitBreaker, CircuitCheckResult};
pub use execution_queue::{ExecutionQueue, QueueBuildSummary, QueueEntry};
pub use kernel::Kernel;
pub use priority_decay::PriorityDecayEngine;
pub use registry::{ProcessRegistry, ProcessView, RegisteredProcess};
