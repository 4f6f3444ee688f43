//! Errores de persistencia.
//! Mapea errores de IO / serialización a variantes semánticas del store.

use std::io;
use std::path::{Path, PathBuf};

use listflow_core::services::ServiceError;
use listflow_core::CoreEngineError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PersistenceError {
    #[error("io error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
    #[error("unsupported payload: {0}")]
    UnsupportedPayload(String),
    #[error("invalid version pattern '{pattern}': {reason}")]
    InvalidPattern { pattern: String, reason: String },
    #[error("invalid logical path '{0}'")]
    InvalidPath(String),
    #[error("version collision for '{0}' (retryable)")]
    VersionCollision(String),
    #[error("lock busy: {0} (retryable)")]
    LockBusy(PathBuf),
    #[error("knowledge ttl out of range: {0} days")]
    InvalidTtl(i64),
}

impl PersistenceError {
    pub fn is_retryable(&self) -> bool {
        matches!(self, PersistenceError::VersionCollision(_) | PersistenceError::LockBusy(_))
    }
}

/// Adjunta la ruta a un `io::Error` (`.map_err(io_at(&path))`).
pub(crate) fn io_at(path: &Path) -> impl FnOnce(io::Error) -> PersistenceError + '_ {
    move |source| PersistenceError::Io { path: path.to_path_buf(),
                                         source }
}

impl From<PersistenceError> for ServiceError {
    fn from(e: PersistenceError) -> Self {
        ServiceError::Failed(e.to_string())
    }
}

impl From<PersistenceError> for CoreEngineError {
    fn from(e: PersistenceError) -> Self {
        CoreEngineError::StateStore(e.to_string())
    }
}
