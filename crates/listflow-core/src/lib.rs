//! listflow-core: orquestador declarativo de workflows.
//!
//! Sin IO de archivos: el store versionado, el run-state en disco y la base
//! de conocimiento viven en `listflow-persistence` y se conectan mediante
//! los traits `ArtifactSink`, `InsightSink` y `RunStateStore`.
pub mod constants;
pub mod contract;
pub mod engine;
pub mod errors;
pub mod event;
pub mod hashing;
pub mod model;
pub mod resolve;
pub mod rules;
pub mod services;
pub mod session;
pub mod state;
pub mod step;

pub use contract::{ContractValidator, ContractViolation, Schema};
pub use engine::{HaltReason, OrchestratorBuilder, OrchestratorPolicy, RunOptions, RunReport, RunStatus,
                 WorkflowOrchestrator};
pub use errors::{CoreEngineError, FailureClass};
pub use event::{EventStore, InMemoryEventStore, RunEvent, RunEventKind};
pub use model::{ArtifactData, Context, ContextSnapshot, Insight, SavedArtifact};
pub use resolve::{ProfileManager, ReferenceResolver};
pub use rules::RuleEngine;
pub use services::{ArtifactSink, InsightSink, ServiceError, SharedServices};
pub use session::{BudgetScope, RunFlag, SessionGuard, SessionPolicy, SessionStatus};
pub use state::{InMemoryRunStateStore, RunState, RunStateStore, ShrinkGuardPolicy, ShrinkPermit, StateWriteOutcome};
pub use step::{HandlerError, HandlerRegistry, OnError, StepDefinition, StepHandler, StepOutcome, WorkflowConfig};
