//! Gates declarativos: AND plano de comparaciones contra el contexto.
//!
//! Formato: `{"rulesets": {"R": {"logic": {"conditions": {"all": [{fact, operator, value}]}}}}}`.
//! La evaluación es fail-closed: ruleset desconocido, operador desconocido,
//! fact ausente o tipos incompatibles evalúan a `false`.

use std::cmp::Ordering;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::constants::CONTEXT_REF_PREFIX;
use crate::errors::CoreEngineError;
use crate::model::Context;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operator {
    Equal,
    GreaterThan,
    LessThan,
    Unknown,
}

impl Operator {
    pub fn parse(raw: &str) -> Self {
        match raw {
            "equal" => Operator::Equal,
            "greaterThan" => Operator::GreaterThan,
            "lessThan" => Operator::LessThan,
            _ => Operator::Unknown,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Condition {
    /// Ruta con puntos en el contexto (acepta prefijo `context.`).
    pub fact: String,
    pub operator: String,
    #[serde(default)]
    pub value: Value,
}

impl Condition {
    pub fn operator(&self) -> Operator {
        Operator::parse(&self.operator)
    }

    fn fact_path(&self) -> &str {
        self.fact.strip_prefix(CONTEXT_REF_PREFIX).unwrap_or(&self.fact)
    }

    pub fn evaluate(&self, ctx: &Context) -> bool {
        let Some(actual) = ctx.get_path(self.fact_path()) else {
            log::debug!("rule fact '{}' missing from context", self.fact);
            return false;
        };
        match self.operator() {
            Operator::Equal => values_equal(actual, &self.value),
            Operator::GreaterThan => compare(actual, &self.value) == Some(Ordering::Greater),
            Operator::LessThan => compare(actual, &self.value) == Some(Ordering::Less),
            Operator::Unknown => {
                log::warn!("unknown rule operator '{}'; condition is false", self.operator);
                false
            }
        }
    }
}

fn values_equal(a: &Value, b: &Value) -> bool {
    match (a.as_f64(), b.as_f64()) {
        (Some(x), Some(y)) => x == y,
        _ => a == b,
    }
}

fn compare(a: &Value, b: &Value) -> Option<Ordering> {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => x.as_f64()?.partial_cmp(&y.as_f64()?),
        (Value::String(x), Value::String(y)) => Some(x.cmp(y)),
        _ => None,
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ConditionGroup {
    #[serde(default)]
    pub all: Vec<Condition>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RuleLogic {
    #[serde(default)]
    pub conditions: ConditionGroup,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RulesetDef {
    #[serde(default)]
    pub logic: RuleLogic,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RulesDocument {
    #[serde(default)]
    pub rulesets: IndexMap<String, RulesetDef>,
}

#[derive(Debug, Clone, Default)]
pub struct RuleEngine {
    rulesets: IndexMap<String, RulesetDef>,
}

impl RuleEngine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_document(doc: &Value) -> Result<Self, CoreEngineError> {
        let parsed: RulesDocument =
            serde_json::from_value(doc.clone()).map_err(|e| CoreEngineError::InvalidDocument { path:   "rulesets".into(),
                                                                                                reason: e.to_string() })?;
        Ok(Self { rulesets: parsed.rulesets })
    }

    pub fn insert(&mut self, name: impl Into<String>, conditions: Vec<Condition>) {
        let def = RulesetDef { logic: RuleLogic { conditions: ConditionGroup { all: conditions } } };
        self.rulesets.insert(name.into(), def);
    }

    pub fn contains(&self, name: &str) -> bool {
        self.rulesets.contains_key(name)
    }

    /// `true` si todas las condiciones del ruleset se cumplen. Lista vacía
    /// es `true`; ruleset desconocido es `false`.
    pub fn evaluate(&self, name: &str, facts: &Context) -> bool {
        let Some(def) = self.rulesets.get(name) else {
            log::warn!("unknown ruleset '{name}'; gate closed");
            return false;
        };
        def.logic.conditions.all.iter().all(|c| c.evaluate(facts))
    }
}
