//! Errores específicos del core.
//!
//! `CoreEngineError` agrupa las fallas que el orquestador puede reportar al
//! caller. Los resultados "suaves" (skips, halts por guardas de seguridad) no
//! son errores: viajan dentro de `RunReport`.

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq, Clone, Serialize, Deserialize)]
pub enum CoreEngineError {
    #[error("a run is already in progress")] Busy,
    #[error("configuration error: {0}")] Config(String),
    #[error("profile not found: {0}")] ProfileNotFound(String),
    #[error("handler not registered: {0}")] HandlerNotFound(String),
    #[error("handler fault: {0}")] HandlerFault(String),
    #[error("contract violation ({contract}): {diagnostic}")]
    ContractViolation { contract: String, diagnostic: String },
    #[error("state store error: {0}")] StateStore(String),
    #[error("invalid document {path}: {reason}")] InvalidDocument { path: String, reason: String },
}

/// Clase de falla de un step. Las tres comparten la misma política de
/// resolución (`stop` / `fail_soft` / `fallback_next`) pero se reportan por
/// separado.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureClass {
    /// El handler referenciado no existe en el registro.
    MissingHandler,
    /// El handler devolvió `Err` o hizo panic.
    HandlerFault,
    /// La salida no cumple el contrato declarado.
    ContractViolation,
}

/// Clasifica un `CoreEngineError` de step en su `FailureClass`.
pub fn classify_failure(err: &CoreEngineError) -> FailureClass {
    match err {
        CoreEngineError::HandlerNotFound(_) => FailureClass::MissingHandler,
        CoreEngineError::ContractViolation { .. } => FailureClass::ContractViolation,
        _ => FailureClass::HandlerFault,
    }
}
