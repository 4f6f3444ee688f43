use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use crate::errors::FailureClass;
use crate::state::ShrinkReport;
use crate::step::StepOutcome;

/// Motivo de una detención suave. Ninguno de estos casos es un `Err` de
/// `run()`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum HaltReason {
    Timeout,
    MaxUpdates,
    StepFailed { step_id: String, class: FailureClass, error: String },
    Config { message: String },
    ShrinkGuard { report: ShrinkReport },
    FallbackLimit { limit: u32 },
}

impl fmt::Display for HaltReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HaltReason::Timeout => write!(f, "session timeout"),
            HaltReason::MaxUpdates => write!(f, "session update budget exhausted"),
            HaltReason::StepFailed { step_id, error, .. } => write!(f, "step '{step_id}' failed: {error}"),
            HaltReason::Config { message } => write!(f, "configuration error: {message}"),
            HaltReason::ShrinkGuard { report } => {
                write!(f,
                       "run state write blocked: {} -> {} bytes ({:.2}% shrink)",
                       report.old_bytes,
                       report.new_bytes,
                       report.shrink_ratio * 100.0)
            }
            HaltReason::FallbackLimit { limit } => write!(f, "more than {limit} fallback jumps"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum RunStatus {
    Completed,
    Halted { reason: HaltReason },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunReport {
    pub run_id: Uuid,
    pub workflow_id: String,
    pub status: RunStatus,
    /// Un registro por step visitado, en orden de visita (un step puede
    /// aparecer más de una vez tras un fallback).
    pub outcomes: Vec<StepOutcome>,
    /// Contexto final de la corrida.
    pub context: Value,
    /// Presente sólo si la corrida completó.
    pub run_fingerprint: Option<String>,
    /// Step desde el cual se reanudó, si hubo resume.
    pub resumed_after: Option<String>,
}

impl RunReport {
    pub fn is_completed(&self) -> bool {
        matches!(self.status, RunStatus::Completed)
    }

    pub fn halt_reason(&self) -> Option<&HaltReason> {
        match &self.status {
            RunStatus::Halted { reason } => Some(reason),
            RunStatus::Completed => None,
        }
    }

    pub fn executed(&self) -> Vec<&str> {
        self.filter(|o| matches!(o, StepOutcome::Completed { .. }))
    }

    pub fn skipped(&self) -> Vec<&str> {
        self.filter(|o| matches!(o, StepOutcome::Skipped { .. }))
    }

    pub fn failed(&self) -> Vec<&str> {
        self.filter(|o| matches!(o, StepOutcome::Failed { .. }))
    }

    fn filter(&self, pred: impl Fn(&StepOutcome) -> bool) -> Vec<&str> {
        self.outcomes.iter().filter(|o| pred(o)).map(StepOutcome::step_id).collect()
    }
}
