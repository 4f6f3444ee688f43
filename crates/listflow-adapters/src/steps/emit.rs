//! `emit`: devuelve sus inputs tal cual (`null` se normaliza a `{}`).
//!
//! Sirve para sembrar valores constantes o para reagrupar referencias
//! (`$ref`, `$profile`) bajo una nueva `context_key`.

use listflow_core::{ContextSnapshot, HandlerError, SharedServices, StepHandler};
use serde_json::{json, Value};

#[derive(Debug, Default, Clone, Copy)]
pub struct EmitHandler;

impl StepHandler for EmitHandler {
    fn name(&self) -> &str {
        "emit"
    }

    fn execute(&self, inputs: &Value, _ctx: &ContextSnapshot, _services: &SharedServices)
               -> Result<Value, HandlerError> {
        Ok(match inputs {
            Value::Null => json!({}),
            other => other.clone(),
        })
    }
}
