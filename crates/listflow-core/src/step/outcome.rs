use serde::{Deserialize, Serialize};

use crate::errors::FailureClass;

/// Por qué un step no se ejecutó.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
    Precondition,
    Ruleset(String),
}

/// Resultado observable de un step dentro de una corrida.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum StepOutcome {
    /// Ejecutado; `output_hash` es el SHA-256 canónico de la salida.
    Completed { step_id: String, output_hash: String },
    Skipped { step_id: String, reason: SkipReason },
    /// Falló y la política lo resolvió (fail_soft / fallback / stop).
    Failed { step_id: String, class: FailureClass, error: String },
}

impl StepOutcome {
    pub fn step_id(&self) -> &str {
        match self {
            StepOutcome::Completed { step_id, .. }
            | StepOutcome::Skipped { step_id, .. }
            | StepOutcome::Failed { step_id, .. } => step_id,
        }
    }
}
