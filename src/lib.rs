//! listflow
//!
//! Capa de aplicación sobre los crates del workspace:
//! - `config`: documentos declarativos (policy, rules, profiles, contracts)
//!   y definiciones de workflow.
//! - `app`: arranque de stores, servicios y orquestador.
//! - `errors`: `AppError`, que envuelve los errores de cada crate.

pub mod app;
pub mod config;
pub mod errors;

pub use app::{FileOrchestrator, Runtime};
pub use config::{load_workflow, ConfigBundle};
pub use errors::AppError;
