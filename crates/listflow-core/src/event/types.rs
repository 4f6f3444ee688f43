//! Eventos de una corrida y estructura `RunEvent`.
//!
//! Cada `run()` del orquestador emite una secuencia append-only. El primer
//! evento de un `run_id` es siempre `RunStarted`; el último es `RunCompleted`
//! o `RunHalted`.
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::errors::FailureClass;
use crate::step::SkipReason;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum RunEventKind {
    /// Fija la definición usada y desde qué step arranca (0 salvo resume).
    RunStarted {
        workflow_id: String,
        definition_hash: String,
        step_count: usize,
        start_index: usize,
        resumed: bool,
    },
    StepStarted { step_index: usize, step_id: String },
    StepSkipped { step_index: usize, step_id: String, reason: SkipReason },
    /// `output_hash`: SHA-256 canónico de la salida absorbida.
    StepFinished {
        step_index: usize,
        step_id: String,
        output_hash: String,
        context_key: Option<String>,
    },
    StepFailed {
        step_index: usize,
        step_id: String,
        class: FailureClass,
        error: String,
    },
    FallbackRouted { from_step: String, to_step: String },
    RunHalted { reason: String },
    /// Hash de los `output_hash` ordenados + `definition_hash` + versión del motor.
    RunCompleted { run_fingerprint: String },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunEvent {
    pub seq: u64, // asignado por el store (orden append)
    pub run_id: Uuid,
    pub kind: RunEventKind,
    pub ts: DateTime<Utc>, // metadato, no entra en fingerprints
}
