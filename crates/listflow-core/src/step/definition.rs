//! Definición declarativa de un workflow.
//!
//! Un `WorkflowConfig` se carga desde JSON (`{workflow_id, steps:[...]}`) y es
//! inmutable una vez construido el orquestador. El `definition_hash` se
//! calcula sobre la forma canónica del array de steps y viaja en el evento
//! `RunStarted`.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::constants::CONTEXT_REF_PREFIX;
use crate::hashing::hash_value;
use crate::model::Context;

/// Política de recuperación ante la falla de un step.
///
/// Formato JSON: `"stop"`, `"fail_soft"` o `{"fallback_next": "<step_id>"}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OnError {
    Stop,
    #[serde(alias = "fail-soft")]
    FailSoft,
    #[serde(alias = "fallback-next")]
    FallbackNext(String),
}

/// Expresión de una precondición.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PathExpr {
    #[serde(rename = "exists")]
    Exists,
    #[serde(rename = "not exists", alias = "not_exists")]
    NotExists,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PreconditionRule {
    /// Ruta con puntos en el contexto. Acepta el prefijo `context.`.
    #[serde(alias = "JPath")]
    pub path: String,
    pub expr: PathExpr,
}

impl PreconditionRule {
    pub fn holds(&self, ctx: &Context) -> bool {
        let path = self.path.strip_prefix(CONTEXT_REF_PREFIX).unwrap_or(&self.path);
        let present = ctx.contains_path(path);
        match self.expr {
            PathExpr::Exists => present,
            PathExpr::NotExists => !present,
        }
    }
}

/// `{"all_must_be_true": [...]}`: todas las reglas deben cumplirse.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Precondition {
    #[serde(default)]
    pub all_must_be_true: Vec<PreconditionRule>,
}

impl Precondition {
    pub fn exists(path: impl Into<String>) -> Self {
        Self { all_must_be_true: vec![PreconditionRule { path: path.into(),
                                                         expr: PathExpr::Exists }] }
    }

    /// Lista vacía: siempre se cumple.
    pub fn is_met(&self, ctx: &Context) -> bool {
        self.all_must_be_true.iter().all(|r| r.holds(ctx))
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutputSpec {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context_key: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub contract: Option<String>,
}

/// Un step configurado: qué handler invocar, con qué inputs, dónde guardar
/// la salida y qué gates aplicar antes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StepDefinition {
    pub id: String,
    pub handler: String,
    #[serde(default)]
    pub inputs: Value,
    #[serde(default)]
    pub outputs: OutputSpec,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ruleset: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub precondition: Option<Precondition>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub on_error: Option<OnError>,
}

impl StepDefinition {
    /// Step mínimo; el resto de campos se completa con los `with_*`.
    pub fn new(id: impl Into<String>, handler: impl Into<String>) -> Self {
        Self { id:           id.into(),
               handler:      handler.into(),
               inputs:       Value::Null,
               outputs:      OutputSpec::default(),
               ruleset:      None,
               precondition: None,
               on_error:     None }
    }

    pub fn with_inputs(mut self, inputs: Value) -> Self {
        self.inputs = inputs;
        self
    }

    pub fn with_context_key(mut self, key: impl Into<String>) -> Self {
        self.outputs.context_key = Some(key.into());
        self
    }

    pub fn with_contract(mut self, contract: impl Into<String>) -> Self {
        self.outputs.contract = Some(contract.into());
        self
    }

    pub fn with_ruleset(mut self, ruleset: impl Into<String>) -> Self {
        self.ruleset = Some(ruleset.into());
        self
    }

    pub fn with_precondition(mut self, precondition: Precondition) -> Self {
        self.precondition = Some(precondition);
        self
    }

    pub fn with_on_error(mut self, on_error: OnError) -> Self {
        self.on_error = Some(on_error);
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkflowConfig {
    pub workflow_id: String,
    #[serde(default)]
    pub steps: Vec<StepDefinition>,
}

impl WorkflowConfig {
    pub fn new(workflow_id: impl Into<String>, steps: Vec<StepDefinition>) -> Self {
        Self { workflow_id: workflow_id.into(),
               steps }
    }

    /// SHA-256 canónico del array de steps.
    pub fn definition_hash(&self) -> String {
        let steps = serde_json::to_value(&self.steps).unwrap_or(Value::Null);
        hash_value(&steps)
    }

    pub fn position(&self, step_id: &str) -> Option<usize> {
        self.steps.iter().position(|s| s.id == step_id)
    }
}
