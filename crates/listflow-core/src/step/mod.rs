//! Steps: definición declarativa, contrato de handler y resultados.
//!
//! - `StepDefinition` / `WorkflowConfig`: lo que se carga desde JSON.
//! - `StepHandler` / `HandlerRegistry`: la lógica pluggable.
//! - `StepOutcome`: lo que el orquestador reporta por step.

pub mod definition;
pub mod handler;
mod outcome;

pub use definition::{OnError, OutputSpec, PathExpr, Precondition, PreconditionRule, StepDefinition, WorkflowConfig};
pub use handler::{FnHandler, HandlerError, HandlerRegistry, StepHandler};
pub use outcome::{SkipReason, StepOutcome};
