//! Contrato de los handlers y registro por nombre.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use serde_json::Value;
use thiserror::Error;

use crate::model::ContextSnapshot;
use crate::services::{ServiceError, SharedServices};

/// Falla de un handler. Las condiciones esperadas (p.ej. "no hay datos")
/// deben reportarse en el campo `status` de la salida, no como error.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("{message}")]
pub struct HandlerError {
    pub message: String,
}

impl HandlerError {
    pub fn new(message: impl Into<String>) -> Self {
        Self { message: message.into() }
    }

    /// Error por input faltante o con tipo inesperado.
    pub fn invalid_input(field: &str, detail: impl fmt::Display) -> Self {
        Self::new(format!("invalid input '{field}': {detail}"))
    }
}

impl From<ServiceError> for HandlerError {
    fn from(e: ServiceError) -> Self {
        HandlerError::new(e.to_string())
    }
}

/// Unidad de trabajo invocada por el orquestador.
///
/// Recibe los inputs ya resueltos (`$ref`/`$profile` expandidos), una copia
/// de sólo lectura del contexto y los servicios compartidos.
pub trait StepHandler: Send + Sync {
    fn name(&self) -> &str;

    fn execute(&self, inputs: &Value, ctx: &ContextSnapshot, services: &SharedServices)
               -> Result<Value, HandlerError>;
}

/// Adaptador para registrar closures como handlers.
pub struct FnHandler<F> {
    name: String,
    func: F,
}

impl<F> FnHandler<F> where F: Fn(&Value, &ContextSnapshot, &SharedServices) -> Result<Value, HandlerError> + Send + Sync
{
    pub fn new(name: impl Into<String>, func: F) -> Self {
        Self { name: name.into(), func }
    }
}

impl<F> StepHandler for FnHandler<F>
    where F: Fn(&Value, &ContextSnapshot, &SharedServices) -> Result<Value, HandlerError> + Send + Sync
{
    fn name(&self) -> &str {
        &self.name
    }

    fn execute(&self, inputs: &Value, ctx: &ContextSnapshot, services: &SharedServices)
               -> Result<Value, HandlerError> {
        (self.func)(inputs, ctx, services)
    }
}

/// Mapa `nombre → handler` poblado al arrancar.
#[derive(Clone, Default)]
pub struct HandlerRegistry {
    handlers: HashMap<String, Arc<dyn StepHandler>>,
}

impl HandlerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registra bajo `handler.name()`. Un nombre repetido reemplaza al anterior.
    pub fn register(&mut self, handler: Arc<dyn StepHandler>) -> &mut Self {
        let name = handler.name().to_string();
        if self.handlers.insert(name.clone(), handler).is_some() {
            log::warn!("handler '{name}' re-registered; previous instance replaced");
        }
        self
    }

    pub fn register_fn<F>(&mut self, name: &str, func: F) -> &mut Self
        where F: Fn(&Value, &ContextSnapshot, &SharedServices) -> Result<Value, HandlerError> + Send + Sync + 'static
    {
        self.register(Arc::new(FnHandler::new(name, func)))
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn StepHandler>> {
        self.handlers.get(name).cloned()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.handlers.contains_key(name)
    }

    /// Nombres ordenados (para diagnósticos y `--help`).
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.handlers.keys().cloned().collect();
        names.sort();
        names
    }

    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }
}

impl fmt::Debug for HandlerRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HandlerRegistry").field("handlers", &self.names()).finish()
    }
}
