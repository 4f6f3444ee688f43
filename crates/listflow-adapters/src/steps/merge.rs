//! `merge`: fusión shallow de `sources` en orden (la última gana).

use listflow_core::resolve::merge_json;
use listflow_core::{ContextSnapshot, HandlerError, SharedServices, StepHandler};
use serde_json::{json, Value};

use crate::inputs::required_array;

#[derive(Debug, Default, Clone, Copy)]
pub struct MergeHandler;

impl StepHandler for MergeHandler {
    fn name(&self) -> &str {
        "merge"
    }

    fn execute(&self, inputs: &Value, _ctx: &ContextSnapshot, _services: &SharedServices)
               -> Result<Value, HandlerError> {
        let sources = required_array(inputs, "sources")?;
        let mut acc = json!({});
        for (i, src) in sources.iter().enumerate() {
            match src {
                Value::Object(_) => acc = merge_json(&acc, src),
                // referencia no resuelta
                Value::Null => log::warn!("merge: source #{i} is null; skipped"),
                other => {
                    return Err(HandlerError::invalid_input("sources", format!("item {i} is not an object: {other}")))
                }
            }
        }
        Ok(acc)
    }
}
