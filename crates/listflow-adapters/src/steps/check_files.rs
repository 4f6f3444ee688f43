//! `check_files`: valida que los archivos requeridos existan, no estén
//! vacíos y, si terminan en `.json`, contengan JSON válido.
//!
//! Inputs: `files` (rutas), `base_dir` opcional. Salida:
//! `{"status": "PASS" | "FAIL", "errors": [...], "checked": N}`. Un FAIL es
//! una condición esperada y no un error del handler.

use std::fs;
use std::path::{Path, PathBuf};

use listflow_core::{ContextSnapshot, HandlerError, SharedServices, StepHandler};
use serde_json::{json, Value};

use crate::inputs::{optional_str, required_array};

#[derive(Debug, Default, Clone, Copy)]
pub struct CheckFilesHandler;

fn check_one(path: &Path) -> Option<String> {
    let shown = path.display();
    let raw = match fs::read(path) {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Some(format!("missing: {shown}")),
        Err(e) => return Some(format!("unreadable: {shown}: {e}")),
    };
    if raw.iter().all(u8::is_ascii_whitespace) {
        return Some(format!("empty: {shown}"));
    }
    if path.extension().is_some_and(|e| e == "json") {
        if let Err(e) = serde_json::from_slice::<Value>(&raw) {
            return Some(format!("invalid JSON: {shown}: {e}"));
        }
    }
    None
}

impl StepHandler for CheckFilesHandler {
    fn name(&self) -> &str {
        "check_files"
    }

    fn execute(&self, inputs: &Value, _ctx: &ContextSnapshot, _services: &SharedServices)
               -> Result<Value, HandlerError> {
        let base = optional_str(inputs, "base_dir").map(PathBuf::from);
        let files = required_array(inputs, "files")?;
        let mut errors = Vec::new();
        for f in files {
            let rel = f.as_str()
                       .ok_or_else(|| HandlerError::invalid_input("files", format!("expected string paths, got {f}")))?;
            let path = match &base {
                Some(b) => b.join(rel),
                None => PathBuf::from(rel),
            };
            if let Some(err) = check_one(&path) {
                errors.push(err);
            }
        }
        let status = if errors.is_empty() { "PASS" } else { "FAIL" };
        if !errors.is_empty() {
            log::warn!("check_files: {} problem(s) found", errors.len());
        }
        Ok(json!({"status": status, "errors": errors, "checked": files.len()}))
    }
}
