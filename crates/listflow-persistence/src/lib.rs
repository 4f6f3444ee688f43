//! listflow-persistence
//!
//! Implementaciones en disco de los puertos del core:
//! - `fs::versioned`: artifacts inmutables con versión monótona y sidecars.
//! - `fs::run_state`: `RUN_STATE.json` con guarda de achique.
//! - `knowledge`: base de conocimiento (insights, session state) versionada.
//! - `config`: carga de configuración desde `.env` / entorno.

pub mod config;
pub mod error;
pub mod fs;
pub mod knowledge;

pub use config::{init_dotenv, StorageConfig};
pub use error::PersistenceError;
pub use fs::{FileRunStateStore, SidecarMetadata, VersionEntry, VersionedArtifactStore, DEFAULT_VERSION_PATTERN};
pub use knowledge::{KnowledgeLedger, KnowledgeStore, SharedKnowledgeStore};
