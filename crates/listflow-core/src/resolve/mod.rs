//! Resolución de inputs: punteros al contexto, perfiles y merge JSON.

pub mod merge;
pub mod profile;
pub mod resolver;

pub use merge::{merge_json, merge_maps};
pub use profile::ProfileManager;
pub use resolver::{collect_profile_refs, ReferenceResolver};
