//! `save_artifact`: guarda `data` como nueva versión de `base_path`.
//!
//! Inputs: `base_path`, `data`, `format` (`json` por defecto, `text` para
//! strings), `actor` y `reason` opcionales (si alguno está presente se
//! escribe sidecar de metadata).

use listflow_core::model::ArtifactData;
use listflow_core::{ContextSnapshot, HandlerError, SharedServices, StepHandler};
use serde_json::{json, Value};

use crate::inputs::{optional_str, required, required_str};

#[derive(Debug, Default, Clone, Copy)]
pub struct SaveArtifactHandler;

impl StepHandler for SaveArtifactHandler {
    fn name(&self) -> &str {
        "save_artifact"
    }

    fn execute(&self, inputs: &Value, _ctx: &ContextSnapshot, services: &SharedServices)
               -> Result<Value, HandlerError> {
        let base_path = required_str(inputs, "base_path")?;
        let data = required(inputs, "data")?;
        let payload = match (optional_str(inputs, "format").unwrap_or("json"), data) {
            ("text", Value::String(s)) => ArtifactData::Text(s.clone()),
            ("text", other) => ArtifactData::Text(other.to_string()),
            ("json", v) => ArtifactData::Json(v.clone()),
            (fmt, _) => return Err(HandlerError::invalid_input("format", format!("unknown format '{fmt}'"))),
        };
        let saved = services.artifacts()?.save(base_path,
                                               payload,
                                               optional_str(inputs, "actor"),
                                               optional_str(inputs, "reason"))?;
        Ok(json!({
            "status": "saved",
            "filepath": saved.filepath.to_string_lossy(),
            "version": saved.version,
            "sha256": saved.sha256,
        }))
    }
}
