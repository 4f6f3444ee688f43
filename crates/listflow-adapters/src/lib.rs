//! listflow-adapters: handlers de plomería genéricos.
//!
//! No contienen lógica de dominio: emiten y combinan valores, guardan
//! artifacts, registran / consultan insights y validan archivos. Los
//! handlers de dominio se registran junto a éstos en el mismo
//! `HandlerRegistry`.

pub mod inputs;
pub mod steps;

use std::sync::Arc;

use listflow_core::HandlerRegistry;

pub use steps::{CheckFilesHandler, EmitHandler, LookupInsightHandler, MergeHandler, RecordInsightHandler,
                SaveArtifactHandler};

/// Registra todos los handlers built-in bajo sus nombres canónicos.
pub fn register_builtin_handlers(registry: &mut HandlerRegistry) {
    registry.register(Arc::new(EmitHandler))
            .register(Arc::new(MergeHandler))
            .register(Arc::new(SaveArtifactHandler))
            .register(Arc::new(RecordInsightHandler))
            .register(Arc::new(LookupInsightHandler))
            .register(Arc::new(CheckFilesHandler));
}

pub fn builtin_registry() -> HandlerRegistry {
    let mut registry = HandlerRegistry::new();
    register_builtin_handlers(&mut registry);
    registry
}
