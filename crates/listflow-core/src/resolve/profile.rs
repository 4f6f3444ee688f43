//! Perfiles nombrados con herencia de un solo nivel.

use indexmap::IndexMap;
use serde_json::{Map, Value};

use crate::constants::INHERITS_KEY;
use crate::errors::CoreEngineError;

use super::merge::merge_maps;

#[derive(Debug, Clone, Default)]
pub struct ProfileManager {
    profiles: IndexMap<String, Map<String, Value>>,
}

impl ProfileManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Carga `{"profiles": {name: {...}}}`. Un objeto sin clave `profiles`
    /// se interpreta directamente como el mapa de perfiles.
    pub fn from_document(doc: &Value) -> Result<Self, CoreEngineError> {
        let table = match doc.get("profiles") {
            Some(inner) => inner,
            None => doc,
        };
        let Value::Object(entries) = table else {
            return Err(invalid("profiles must be a JSON object"));
        };
        let mut mgr = Self::new();
        for (name, body) in entries {
            match body {
                Value::Object(map) => mgr.insert(name.clone(), map.clone()),
                _ => return Err(invalid(format!("profile '{name}' must be a JSON object"))),
            }
        }
        Ok(mgr)
    }

    pub fn insert(&mut self, name: impl Into<String>, profile: Map<String, Value>) {
        self.profiles.insert(name.into(), profile);
    }

    pub fn contains(&self, name: &str) -> bool {
        self.profiles.contains_key(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &String> {
        self.profiles.keys()
    }

    /// Perfil `name` con su base aplicada debajo. La clave `inherits` no
    /// aparece en el resultado. Sólo se resuelve un salto: el `inherits`
    /// propio de la base se ignora.
    pub fn get_merged_profile(&self, name: &str) -> Result<Map<String, Value>, CoreEngineError> {
        let profile = self.profiles
                          .get(name)
                          .ok_or_else(|| CoreEngineError::ProfileNotFound(name.to_string()))?;
        let mut child = profile.clone();
        let parent = child.remove(INHERITS_KEY);
        let Some(parent) = parent else {
            return Ok(child);
        };
        let parent_name = parent.as_str()
                                .ok_or_else(|| invalid(format!("profile '{name}': inherits must be a string")))?;
        let mut base = self.profiles
                           .get(parent_name)
                           .cloned()
                           .ok_or_else(|| CoreEngineError::ProfileNotFound(parent_name.to_string()))?;
        if base.remove(INHERITS_KEY).is_some() {
            log::warn!("profile '{parent_name}' inherits from another profile; only one level is applied for '{name}'");
        }
        Ok(merge_maps(&base, &child))
    }

    /// Verifica que todo `inherits` apunte a un perfil existente.
    pub fn validate(&self) -> Result<(), CoreEngineError> {
        for (name, profile) in &self.profiles {
            match profile.get(INHERITS_KEY) {
                None => {}
                Some(Value::String(parent)) if self.contains(parent) => {}
                Some(Value::String(parent)) => {
                    return Err(CoreEngineError::Config(format!("profile '{name}' inherits unknown profile '{parent}'")));
                }
                Some(_) => return Err(invalid(format!("profile '{name}': inherits must be a string"))),
            }
        }
        Ok(())
    }
}

fn invalid(reason: impl Into<String>) -> CoreEngineError {
    CoreEngineError::InvalidDocument { path:   "profiles".into(),
                                       reason: reason.into() }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn manager() -> ProfileManager {
        ProfileManager::from_document(&json!({
            "profiles": {
                "base": {"a": 1, "b": 2},
                "child": {"inherits": "base", "b": 3},
                "grandchild": {"inherits": "child", "c": 4},
                "orphan": {"inherits": "nowhere"}
            }
        })).unwrap()
    }

    #[test]
    fn single_hop_inheritance() {
        let merged = manager().get_merged_profile("child").unwrap();
        assert_eq!(Value::Object(merged), json!({"a": 1, "b": 3}));
    }

    #[test]
    fn chains_stop_after_one_level() {
        let merged = manager().get_merged_profile("grandchild").unwrap();
        assert_eq!(Value::Object(merged), json!({"b": 3, "c": 4}));
    }

    #[test]
    fn unknown_names_are_errors() {
        let m = manager();
        assert_eq!(m.get_merged_profile("ghost"), Err(CoreEngineError::ProfileNotFound("ghost".into())));
        assert_eq!(m.get_merged_profile("orphan"), Err(CoreEngineError::ProfileNotFound("nowhere".into())));
        assert!(matches!(m.validate(), Err(CoreEngineError::Config(_))));
    }

    #[test]
    fn bare_map_document_is_accepted() {
        let m = ProfileManager::from_document(&json!({"p": {"x": true}})).unwrap();
        assert!(m.contains("p"));
        assert!(m.validate().is_ok());
        assert!(ProfileManager::from_document(&json!({"p": 3})).is_err());
    }
}
