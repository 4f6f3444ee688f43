//! Lectura de campos de los inputs ya resueltos.

use listflow_core::HandlerError;
use serde_json::Value;

pub fn required_str<'a>(inputs: &'a Value, field: &str) -> Result<&'a str, HandlerError> {
    match inputs.get(field) {
        Some(Value::String(s)) if !s.is_empty() => Ok(s),
        Some(other) => Err(HandlerError::invalid_input(field, format!("expected non-empty string, got {other}"))),
        None => Err(HandlerError::invalid_input(field, "missing")),
    }
}

pub fn optional_str<'a>(inputs: &'a Value, field: &str) -> Option<&'a str> {
    inputs.get(field).and_then(Value::as_str)
}

pub fn required<'a>(inputs: &'a Value, field: &str) -> Result<&'a Value, HandlerError> {
    inputs.get(field).ok_or_else(|| HandlerError::invalid_input(field, "missing"))
}

pub fn optional_bool(inputs: &Value, field: &str, default: bool) -> bool {
    inputs.get(field).and_then(Value::as_bool).unwrap_or(default)
}

pub fn optional_f64(inputs: &Value, field: &str, default: f64) -> f64 {
    inputs.get(field).and_then(Value::as_f64).unwrap_or(default)
}

pub fn required_array<'a>(inputs: &'a Value, field: &str) -> Result<&'a Vec<Value>, HandlerError> {
    required(inputs, field)?.as_array()
                            .ok_or_else(|| HandlerError::invalid_input(field, "expected an array"))
}
