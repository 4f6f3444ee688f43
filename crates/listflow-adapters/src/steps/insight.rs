//! `record_insight` y `lookup_insight` sobre la base de conocimiento.

use listflow_core::{ContextSnapshot, HandlerError, SharedServices, StepHandler};
use serde_json::{json, Value};

use crate::inputs::{optional_bool, optional_f64, optional_str, required, required_str};

/// Inputs: `key`, `value`, `source_id` (default `"workflow"`), `confidence`
/// (default 1.0, acotada a `[0, 1]`).
#[derive(Debug, Default, Clone, Copy)]
pub struct RecordInsightHandler;

impl StepHandler for RecordInsightHandler {
    fn name(&self) -> &str {
        "record_insight"
    }

    fn execute(&self, inputs: &Value, _ctx: &ContextSnapshot, services: &SharedServices)
               -> Result<Value, HandlerError> {
        let key = required_str(inputs, "key")?;
        let value = required(inputs, "value")?.clone();
        let source_id = optional_str(inputs, "source_id").unwrap_or("workflow");
        let confidence = optional_f64(inputs, "confidence", 1.0);
        services.insights()?.add_insight(key, value, source_id, confidence)?;
        Ok(json!({"status": "recorded", "key": key}))
    }
}

/// Inputs: `key`, `include_expired` (default false). Un insight ausente no
/// es error: `{"status": "not_found"}`.
#[derive(Debug, Default, Clone, Copy)]
pub struct LookupInsightHandler;

impl StepHandler for LookupInsightHandler {
    fn name(&self) -> &str {
        "lookup_insight"
    }

    fn execute(&self, inputs: &Value, _ctx: &ContextSnapshot, services: &SharedServices)
               -> Result<Value, HandlerError> {
        let key = required_str(inputs, "key")?;
        let include_expired = optional_bool(inputs, "include_expired", false);
        match services.insights()?.latest_insight(key, include_expired)? {
            Some(insight) => Ok(json!({
                "status": "found",
                "key": insight.key,
                "value": insight.value,
                "source_id": insight.source_id,
                "confidence": insight.confidence,
                "timestamp": insight.timestamp.to_rfc3339(),
            })),
            None => Ok(json!({"status": "not_found", "key": key})),
        }
    }
}
