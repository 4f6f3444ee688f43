#![allow(dead_code)]

use listflow_core::step::HandlerError;
use listflow_core::{HandlerRegistry, StepDefinition, WorkflowConfig};
use serde_json::{json, Value};

/// Registro con handlers de prueba:
/// - `echo`: devuelve sus inputs.
/// - `fail`: siempre `Err`.
/// - `panic`: hace panic.
/// - `text`: devuelve un string (útil para violar contratos de objeto).
pub fn test_registry() -> HandlerRegistry {
    let mut reg = HandlerRegistry::new();
    reg.register_fn("echo", |inputs, _, _| Ok(inputs.clone()))
       .register_fn("fail", |_, _, _| Err(HandlerError::new("deliberate failure")))
       .register_fn("panic", |_, _, _| panic!("kaboom"))
       .register_fn("text", |_, _, _| Ok(json!("plain text")));
    reg
}

pub fn echo(id: &str, inputs: Value) -> StepDefinition {
    StepDefinition::new(id, "echo").with_inputs(inputs).with_context_key(id)
}

pub fn workflow(steps: Vec<StepDefinition>) -> WorkflowConfig {
    WorkflowConfig::new("wf-test", steps)
}
