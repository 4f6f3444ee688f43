//! Persistencia en sistema de archivos: artifacts versionados y run-state.

pub mod run_state;
pub mod versioned;

pub use run_state::FileRunStateStore;
pub use versioned::{SidecarMetadata, VersionEntry, VersionedArtifactStore, DEFAULT_VERSION_PATTERN};
