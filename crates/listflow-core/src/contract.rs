//! Validación estructural de salidas contra contratos nombrados.
//!
//! Subconjunto de JSON-Schema: `type`, `required`, `properties`, `items`,
//! `minItems`, `maxItems`, `enum`. Otras claves se ignoran. Se reporta la
//! primera violación encontrada (recorrido en profundidad, orden del
//! documento).

use std::fmt;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::errors::CoreEngineError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JsonType {
    Object,
    Array,
    String,
    Number,
    Integer,
    Boolean,
    Null,
}

impl JsonType {
    fn matches(self, v: &Value) -> bool {
        match self {
            JsonType::Object => v.is_object(),
            JsonType::Array => v.is_array(),
            JsonType::String => v.is_string(),
            JsonType::Number => v.is_number(),
            JsonType::Integer => v.is_i64() || v.is_u64(),
            JsonType::Boolean => v.is_boolean(),
            JsonType::Null => v.is_null(),
        }
    }

    fn as_str(self) -> &'static str {
        match self {
            JsonType::Object => "object",
            JsonType::Array => "array",
            JsonType::String => "string",
            JsonType::Number => "number",
            JsonType::Integer => "integer",
            JsonType::Boolean => "boolean",
            JsonType::Null => "null",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TypeSpec {
    One(JsonType),
    Many(Vec<JsonType>),
}

impl TypeSpec {
    fn matches(&self, v: &Value) -> bool {
        match self {
            TypeSpec::One(t) => t.matches(v),
            TypeSpec::Many(ts) => ts.iter().any(|t| t.matches(v)),
        }
    }

    fn describe(&self) -> String {
        match self {
            TypeSpec::One(t) => t.as_str().to_string(),
            TypeSpec::Many(ts) => ts.iter().map(|t| t.as_str()).collect::<Vec<_>>().join(" | "),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Schema {
    #[serde(default, rename = "type", skip_serializing_if = "Option::is_none")]
    pub type_spec: Option<TypeSpec>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub required: Vec<String>,
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub properties: IndexMap<String, Schema>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub items: Option<Box<Schema>>,
    #[serde(default, rename = "minItems", skip_serializing_if = "Option::is_none")]
    pub min_items: Option<usize>,
    #[serde(default, rename = "maxItems", skip_serializing_if = "Option::is_none")]
    pub max_items: Option<usize>,
    #[serde(default, rename = "enum", skip_serializing_if = "Option::is_none")]
    pub enum_values: Option<Vec<Value>>,
}

/// Primera violación encontrada: ruta (`$.a.b[2]`), lo esperado y lo
/// encontrado.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContractViolation {
    pub contract: String,
    pub path: String,
    pub expected: String,
    pub found: String,
}

impl fmt::Display for ContractViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: expected {}, found {}", self.path, self.expected, self.found)
    }
}

impl From<ContractViolation> for CoreEngineError {
    fn from(v: ContractViolation) -> Self {
        CoreEngineError::ContractViolation { contract:   v.contract.clone(),
                                             diagnostic: v.to_string() }
    }
}

fn type_name(v: &Value) -> &'static str {
    match v {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

struct Failure {
    path: String,
    expected: String,
    found: String,
}

fn check(schema: &Schema, value: &Value, path: &str) -> Result<(), Failure> {
    let fail = |expected: String, found: String| Failure { path: path.to_string(),
                                                           expected,
                                                           found };
    if let Some(spec) = &schema.type_spec {
        if !spec.matches(value) {
            return Err(fail(spec.describe(), type_name(value).to_string()));
        }
    }
    if let Some(allowed) = &schema.enum_values {
        if !allowed.contains(value) {
            return Err(fail(format!("one of {}", Value::Array(allowed.clone())), value.to_string()));
        }
    }
    if let Value::Object(map) = value {
        for key in &schema.required {
            if !map.contains_key(key) {
                return Err(Failure { path:     format!("{path}.{key}"),
                                     expected: "required property".into(),
                                     found:    "missing".into() });
            }
        }
        for (key, sub) in &schema.properties {
            if let Some(child) = map.get(key) {
                check(sub, child, &format!("{path}.{key}"))?;
            }
        }
    }
    if let Value::Array(items) = value {
        if let Some(min) = schema.min_items {
            if items.len() < min {
                return Err(fail(format!("at least {min} items"), format!("{} items", items.len())));
            }
        }
        if let Some(max) = schema.max_items {
            if items.len() > max {
                return Err(fail(format!("at most {max} items"), format!("{} items", items.len())));
            }
        }
        if let Some(item_schema) = &schema.items {
            for (i, item) in items.iter().enumerate() {
                check(item_schema, item, &format!("{path}[{i}]"))?;
            }
        }
    }
    Ok(())
}

#[derive(Debug, Clone, Default)]
pub struct ContractValidator {
    contracts: IndexMap<String, Schema>,
}

impl ContractValidator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Carga `{"contracts": {name: schema}}` (o el mapa directo).
    pub fn from_document(doc: &Value) -> Result<Self, CoreEngineError> {
        let table = doc.get("contracts").unwrap_or(doc);
        let contracts: IndexMap<String, Schema> =
            serde_json::from_value(table.clone()).map_err(|e| CoreEngineError::InvalidDocument { path:   "contracts".into(),
                                                                                                  reason: e.to_string() })?;
        Ok(Self { contracts })
    }

    pub fn insert(&mut self, name: impl Into<String>, schema: Schema) {
        self.contracts.insert(name.into(), schema);
    }

    pub fn contains(&self, name: &str) -> bool {
        self.contracts.contains_key(name)
    }

    pub fn validate(&self, name: &str, data: &Value) -> Result<(), ContractViolation> {
        let Some(schema) = self.contracts.get(name) else {
            return Err(ContractViolation { contract: name.to_string(),
                                           path:     "$".into(),
                                           expected: "a known contract".into(),
                                           found:    format!("unknown contract '{name}'") });
        };
        check(schema, data, "$").map_err(|f| ContractViolation { contract: name.to_string(),
                                                                 path:     f.path,
                                                                 expected: f.expected,
                                                                 found:    f.found })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn validator() -> ContractValidator {
        ContractValidator::from_document(&json!({
            "contracts": {
                "Listing": {
                    "type": "object",
                    "required": ["title", "tags"],
                    "properties": {
                        "title": {"type": "string"},
                        "tags": {"type": "array", "minItems": 1, "maxItems": 3, "items": {"type": "string"}},
                        "tier": {"enum": ["basic", "pro"]},
                        "price": {"type": ["number", "null"]}
                    }
                }
            }
        })).unwrap()
    }

    #[test]
    fn valid_document_passes() {
        let ok = json!({"title": "Mug", "tags": ["a", "b"], "tier": "pro", "price": null, "extra": 1});
        assert!(validator().validate("Listing", &ok).is_ok());
    }

    #[test]
    fn reports_first_violation_path() {
        let v = validator();
        let bad_item = v.validate("Listing", &json!({"title": "Mug", "tags": ["a", "b", 3]})).unwrap_err();
        assert_eq!(bad_item.path, "$.tags[2]");
        assert_eq!(bad_item.expected, "string");
        assert_eq!(bad_item.found, "number");

        let missing = v.validate("Listing", &json!({"title": "Mug"})).unwrap_err();
        assert_eq!(missing.path, "$.tags");
        assert_eq!(missing.found, "missing");

        let wrong_root = v.validate("Listing", &json!("text")).unwrap_err();
        assert_eq!(wrong_root.to_string(), "$: expected object, found string");
    }

    #[test]
    fn array_bounds_and_enum() {
        let v = validator();
        let too_many = v.validate("Listing", &json!({"title": "x", "tags": ["a", "b", "c", "d"]})).unwrap_err();
        assert_eq!(too_many.expected, "at most 3 items");
        let empty = v.validate("Listing", &json!({"title": "x", "tags": []})).unwrap_err();
        assert_eq!(empty.expected, "at least 1 items");
        let tier = v.validate("Listing", &json!({"title": "x", "tags": ["a"], "tier": "gold"})).unwrap_err();
        assert_eq!(tier.path, "$.tier");
    }

    #[test]
    fn unknown_contract_is_a_violation() {
        let err = validator().validate("Ghost", &json!({})).unwrap_err();
        let core: CoreEngineError = err.into();
        assert!(matches!(core, CoreEngineError::ContractViolation { ref contract, .. } if contract == "Ghost"));
    }
}
