use std::path::PathBuf;

use listflow_core::CoreEngineError;
use listflow_persistence::PersistenceError;
use thiserror::Error;

/// Errores de la capa de aplicación (bootstrap y carga de documentos).
#[derive(Debug, Error)]
pub enum AppError {
    #[error(transparent)]
    Core(#[from] CoreEngineError),
    #[error(transparent)]
    Persistence(#[from] PersistenceError),
    #[error("Error en IO ({path}): {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("JSON inválido en {path}: {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

impl AppError {
    /// Errores de configuración: documentos ilegibles o referencias
    /// cruzadas inválidas. El resto son fallas de entorno o de ejecución.
    pub fn is_config(&self) -> bool {
        match self {
            AppError::Json { .. } => true,
            AppError::Core(e) => matches!(e,
                                          CoreEngineError::Config(_)
                                          | CoreEngineError::ProfileNotFound(_)
                                          | CoreEngineError::InvalidDocument { .. }),
            AppError::Persistence(PersistenceError::InvalidPattern { .. } | PersistenceError::InvalidTtl(_)) => true,
            _ => false,
        }
    }

    pub fn is_busy(&self) -> bool {
        matches!(self, AppError::Core(CoreEngineError::Busy))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn io_variant_format() {
        let err = AppError::Io { path:   PathBuf::from("config/x.json"),
                                 source: std::io::Error::other("falló IO") };
        assert_eq!(err.to_string(), "Error en IO (config/x.json): falló IO");
        assert!(!err.is_config());
    }

    #[test]
    fn core_errors_are_transparent_and_classified() {
        let err: AppError = CoreEngineError::Config("step 'x' references unknown ruleset 'r'".into()).into();
        assert_eq!(err.to_string(), "configuration error: step 'x' references unknown ruleset 'r'");
        assert!(err.is_config());
        let busy: AppError = CoreEngineError::Busy.into();
        assert!(busy.is_busy());
        assert!(!busy.is_config());
    }
}
