//! Estado reanudable de una corrida (run-state) y su guarda de achique.

pub mod types;

pub use types::{
    InMemoryRunStateStore, RunState, RunStateStore, ShrinkGuardPolicy, ShrinkPermit, ShrinkReport, StateWriteOutcome,
    ViolationAction,
};
