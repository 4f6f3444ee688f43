//! Merge determinista de objetos JSON.
//!
//! Merge "shallow": las claves de `overlay` reemplazan a las de `base`. Los
//! objetos anidados se reemplazan completos, no se combinan.

use serde_json::{Map, Value};

/// Cuando alguno de los dos valores no es objeto, `overlay` tiene precedencia.
pub fn merge_json(base: &Value, overlay: &Value) -> Value {
    match (base, overlay) {
        (Value::Object(mb), Value::Object(mo)) => Value::Object(merge_maps(mb, mo)),
        (_, other) => other.clone(),
    }
}

pub fn merge_maps(base: &Map<String, Value>, overlay: &Map<String, Value>) -> Map<String, Value> {
    let mut out = base.clone();
    for (k, v) in overlay.iter() {
        out.insert(k.clone(), v.clone());
    }
    out
}
