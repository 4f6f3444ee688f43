//! Payloads persistibles y resultado de un guardado versionado.
//!
//! El core no escribe archivos: sólo define la forma de los datos que un
//! handler o el orquestador entregan a un `ArtifactSink` y lo que éste
//! devuelve. La implementación en disco vive en `listflow-persistence`.
use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Contenido a versionar.
#[derive(Debug, Clone, PartialEq)]
pub enum ArtifactData {
    /// Estructura JSON; se canonicaliza antes de hashear.
    Json(Value),
    /// Texto UTF-8 tal cual.
    Text(String),
    /// Bytes crudos.
    Bytes(Vec<u8>),
}

impl ArtifactData {
    /// Extensión por defecto cuando el `base_path` lógico no trae una.
    pub fn default_extension(&self) -> &'static str {
        match self {
            ArtifactData::Json(_) => ".json",
            ArtifactData::Text(_) | ArtifactData::Bytes(_) => "",
        }
    }
}

impl From<Value> for ArtifactData {
    fn from(v: Value) -> Self {
        ArtifactData::Json(v)
    }
}

impl From<String> for ArtifactData {
    fn from(s: String) -> Self {
        ArtifactData::Text(s)
    }
}

impl From<&str> for ArtifactData {
    fn from(s: &str) -> Self {
        ArtifactData::Text(s.to_string())
    }
}

impl From<Vec<u8>> for ArtifactData {
    fn from(b: Vec<u8>) -> Self {
        ArtifactData::Bytes(b)
    }
}

/// Resultado de `save_new_version`: ruta física, versión y hash del
/// contenido escrito.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SavedArtifact {
    pub filepath: PathBuf,
    pub version: u64,
    pub sha256: String,
}

impl SavedArtifact {
    /// Primeros 12 hex del hash (segmento `{sha12}` del nombre de archivo).
    pub fn sha12(&self) -> &str {
        let end = self.sha256.len().min(12);
        &self.sha256[..end]
    }
}
