//! Orquestador de workflows: builder, política, corrida y reporte.

mod builder;
mod core;
mod policy;
mod report;

pub use builder::{validate, OrchestratorBuilder};
pub use self::core::{RunOptions, WorkflowOrchestrator};
pub use policy::{ExecutionPolicy, LoggingPolicy, OrchestratorPolicy, SecurityPolicy};
pub use report::{HaltReason, RunReport, RunStatus};
