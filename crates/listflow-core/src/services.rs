//! Servicios compartidos que el orquestador entrega a cada handler.
//!
//! El core sólo conoce los traits; `listflow-persistence` provee las
//! implementaciones en disco (store versionado y base de conocimiento).

use std::fmt;
use std::sync::Arc;

use serde_json::Value;
use thiserror::Error;

use crate::model::{ArtifactData, Insight, SavedArtifact};

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ServiceError {
    #[error("service not configured: {0}")] Unavailable(&'static str),
    #[error("service failure: {0}")] Failed(String),
}

/// Destino de artifacts versionados.
pub trait ArtifactSink: Send + Sync {
    /// Guarda una nueva versión; `actor`/`reason` presentes implican sidecar
    /// de metadata.
    fn save(&self, base_path: &str, data: ArtifactData, actor: Option<&str>, reason: Option<&str>)
            -> Result<SavedArtifact, ServiceError>;

    /// Contenido JSON de la última versión, si existe.
    fn load_latest_json(&self, base_path: &str) -> Result<Option<Value>, ServiceError>;
}

/// Destino de insights (base de conocimiento).
pub trait InsightSink: Send + Sync {
    fn add_insight(&self, key: &str, value: Value, source_id: &str, confidence: f64) -> Result<(), ServiceError>;

    fn latest_insight(&self, key: &str, include_expired: bool) -> Result<Option<Insight>, ServiceError>;
}

/// Conjunto de servicios opcional; un handler que necesita uno ausente
/// recibe `ServiceError::Unavailable`.
#[derive(Clone, Default)]
pub struct SharedServices {
    artifacts: Option<Arc<dyn ArtifactSink>>,
    insights: Option<Arc<dyn InsightSink>>,
}

impl SharedServices {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_artifacts(mut self, sink: Arc<dyn ArtifactSink>) -> Self {
        self.artifacts = Some(sink);
        self
    }

    pub fn with_insights(mut self, sink: Arc<dyn InsightSink>) -> Self {
        self.insights = Some(sink);
        self
    }

    pub fn artifacts(&self) -> Result<&dyn ArtifactSink, ServiceError> {
        self.artifacts.as_deref().ok_or(ServiceError::Unavailable("artifacts"))
    }

    pub fn insights(&self) -> Result<&dyn InsightSink, ServiceError> {
        self.insights.as_deref().ok_or(ServiceError::Unavailable("insights"))
    }
}

impl fmt::Debug for SharedServices {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SharedServices")
         .field("artifacts", &self.artifacts.is_some())
         .field("insights", &self.insights.is_some())
         .finish()
    }
}
