//! Resolución de `$ref` y `$profile` dentro de los inputs de un step.

use serde_json::{Map, Value};

use crate::constants::{CONTEXT_REF_PREFIX, PROFILE_KEY, REF_KEY};
use crate::model::Context;

use super::profile::ProfileManager;

/// Recorre los inputs y reemplaza:
/// - `{"$ref": "context.a.b"}` por el valor en `a.b` del contexto (`null` si
///   no existe);
/// - `{"$profile": "name"}` por el perfil fusionado (`null` si no existe).
///
/// Un `$ref` que no empieza con `context.` se deja intacto.
#[derive(Debug, Clone, Copy)]
pub struct ReferenceResolver<'a> {
    profiles: &'a ProfileManager,
}

impl<'a> ReferenceResolver<'a> {
    pub fn new(profiles: &'a ProfileManager) -> Self {
        Self { profiles }
    }

    pub fn resolve(&self, value: &Value, ctx: &Context) -> Value {
        match value {
            Value::Object(map) => {
                if let Some(Value::String(target)) = map.get(REF_KEY) {
                    return self.resolve_ref(target, map, ctx);
                }
                if let Some(Value::String(name)) = map.get(PROFILE_KEY) {
                    return self.resolve_profile(name);
                }
                let out: Map<String, Value> = map.iter().map(|(k, v)| (k.clone(), self.resolve(v, ctx))).collect();
                Value::Object(out)
            }
            Value::Array(items) => Value::Array(items.iter().map(|v| self.resolve(v, ctx)).collect()),
            other => other.clone(),
        }
    }

    fn resolve_ref(&self, target: &str, original: &Map<String, Value>, ctx: &Context) -> Value {
        let Some(path) = target.strip_prefix(CONTEXT_REF_PREFIX) else {
            return Value::Object(original.clone());
        };
        match ctx.get_path(path) {
            Some(v) => v.clone(),
            None => {
                log::warn!("reference '{target}' not found in context; using null");
                Value::Null
            }
        }
    }

    fn resolve_profile(&self, name: &str) -> Value {
        match self.profiles.get_merged_profile(name) {
            Ok(map) => Value::Object(map),
            Err(e) => {
                log::warn!("profile reference '{name}' could not be resolved ({e}); using null");
                Value::Null
            }
        }
    }
}

/// Nombres de perfil referenciados con `$profile` en un árbol de inputs.
pub fn collect_profile_refs(value: &Value, out: &mut Vec<String>) {
    match value {
        Value::Object(map) => {
            if let Some(Value::String(name)) = map.get(PROFILE_KEY) {
                out.push(name.clone());
                return;
            }
            if map.contains_key(REF_KEY) {
                return;
            }
            map.values().for_each(|v| collect_profile_refs(v, out));
        }
        Value::Array(items) => items.iter().for_each(|v| collect_profile_refs(v, out)),
        _ => {}
    }
}
