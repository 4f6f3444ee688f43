//! Estado persistible de una corrida y guarda contra escrituras que achican
//! el archivo.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::errors::CoreEngineError;
use crate::hashing::to_canonical_pretty;

/// Último step completado y el contexto acumulado hasta él.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RunState {
    #[serde(default)]
    pub last_completed_step_id: Option<String>,
    #[serde(default, alias = "uretim_verileri")]
    pub production_data: Value,
}

impl RunState {
    pub fn new(last_completed_step_id: impl Into<String>, production_data: Value) -> Self {
        Self { last_completed_step_id: Some(last_completed_step_id.into()),
               production_data }
    }

    /// Bytes tal como se escriben (JSON canónico indentado).
    pub fn encode(&self) -> Result<Vec<u8>, CoreEngineError> {
        let v = serde_json::to_value(self).map_err(|e| CoreEngineError::StateStore(e.to_string()))?;
        to_canonical_pretty(&v).map_err(|e| CoreEngineError::StateStore(e.to_string()))
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ViolationAction {
    /// Rechaza la escritura; el archivo anterior queda intacto.
    #[default]
    BlockAndRequestApproval,
    /// Escribe igual y registra un warning.
    Warn,
}

/// `threshold_percent` es una fracción del tamaño anterior (0.005 = 0.5 %).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShrinkGuardPolicy {
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    #[serde(default = "default_threshold_bytes")]
    pub threshold_bytes: u64,
    #[serde(default = "default_threshold_percent")]
    pub threshold_percent: f64,
    #[serde(default)]
    pub on_violation: ViolationAction,
    /// Permite que la primera escritura de una corrida nueva (sin resume)
    /// reemplace un estado previo más grande. Apagado: toda escritura pasa
    /// por la guarda.
    #[serde(default)]
    pub allow_fresh_run_reset: bool,
}

fn default_enabled() -> bool {
    true
}

fn default_threshold_bytes() -> u64 {
    4096
}

fn default_threshold_percent() -> f64 {
    0.005
}

impl Default for ShrinkGuardPolicy {
    fn default() -> Self {
        Self { enabled:               true,
               threshold_bytes:       default_threshold_bytes(),
               threshold_percent:     default_threshold_percent(),
               on_violation:          ViolationAction::BlockAndRequestApproval,
               allow_fresh_run_reset: false }
    }
}

/// Detalle de una reducción que superó algún umbral.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShrinkReport {
    pub old_bytes: u64,
    pub new_bytes: u64,
    pub shrink_bytes: u64,
    pub shrink_ratio: f64,
}

impl ShrinkGuardPolicy {
    /// `Some(report)` cuando `old - new > threshold_bytes` o
    /// `(old - new) / old > threshold_percent`. Archivo previo vacío o
    /// crecimiento: nunca se dispara.
    pub fn check(&self, old_bytes: u64, new_bytes: u64) -> Option<ShrinkReport> {
        if !self.enabled || old_bytes == 0 || new_bytes >= old_bytes {
            return None;
        }
        let shrink_bytes = old_bytes - new_bytes;
        let shrink_ratio = shrink_bytes as f64 / old_bytes as f64;
        if shrink_bytes > self.threshold_bytes || shrink_ratio > self.threshold_percent {
            Some(ShrinkReport { old_bytes,
                                new_bytes,
                                shrink_bytes,
                                shrink_ratio })
        } else {
            None
        }
    }
}

/// Autorización explícita para achicar el estado. Sólo se concede cuando la
/// política o el caller lo piden (`allow_fresh_run_reset`, `allow_shrink`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShrinkPermit {
    Denied,
    Granted,
}

#[derive(Debug, Clone, PartialEq)]
pub enum StateWriteOutcome {
    Written { bytes: u64 },
    Rejected(ShrinkReport),
}

/// Persistencia del `RunState`.
pub trait RunStateStore {
    fn load(&self) -> Result<Option<RunState>, CoreEngineError>;
    fn save(&mut self, state: &RunState, permit: ShrinkPermit) -> Result<StateWriteOutcome, CoreEngineError>;
}

/// Implementación en memoria con la misma guarda que la de archivo.
#[derive(Debug, Default)]
pub struct InMemoryRunStateStore {
    state: Option<RunState>,
    bytes: u64,
    guard: ShrinkGuardPolicy,
    writes: u64,
}

impl InMemoryRunStateStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_guard(guard: ShrinkGuardPolicy) -> Self {
        Self { guard, ..Self::default() }
    }

    pub fn current(&self) -> Option<&RunState> {
        self.state.as_ref()
    }

    pub fn writes(&self) -> u64 {
        self.writes
    }

    /// Siembra un estado previo sin pasar por la guarda.
    pub fn seed(&mut self, state: RunState) -> Result<(), CoreEngineError> {
        self.bytes = state.encode()?.len() as u64;
        self.state = Some(state);
        Ok(())
    }
}

impl RunStateStore for InMemoryRunStateStore {
    fn load(&self) -> Result<Option<RunState>, CoreEngineError> {
        Ok(self.state.clone())
    }

    fn save(&mut self, state: &RunState, permit: ShrinkPermit) -> Result<StateWriteOutcome, CoreEngineError> {
        let new_bytes = state.encode()?.len() as u64;
        if permit == ShrinkPermit::Denied {
            if let Some(report) = self.guard.check(self.bytes, new_bytes) {
                match self.guard.on_violation {
                    ViolationAction::BlockAndRequestApproval => return Ok(StateWriteOutcome::Rejected(report)),
                    ViolationAction::Warn => {
                        log::warn!("run state shrinks by {} bytes ({:.2}%)", report.shrink_bytes, report.shrink_ratio * 100.0)
                    }
                }
            }
        }
        self.state = Some(state.clone());
        self.bytes = new_bytes;
        self.writes += 1;
        Ok(StateWriteOutcome::Written { bytes: new_bytes })
    }
}
