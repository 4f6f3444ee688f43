//! Carga de configuración de almacenamiento desde variables de entorno.
//! Todas las variables usan el prefijo `LISTFLOW_` y son opcionales.

use std::env;
use std::path::PathBuf;

use dotenvy::dotenv;
use listflow_core::state::ShrinkGuardPolicy;
use once_cell::sync::Lazy;

use crate::fs::versioned::DEFAULT_VERSION_PATTERN;
use crate::knowledge::{DEFAULT_KNOWLEDGE_PATH, DEFAULT_TTL_DAYS};

// Carga perezosa del archivo .env una sola vez.
static DOTENV_LOADED: Lazy<()> = Lazy::new(|| {
    let _ = dotenv(); // ignora error si no existe .env
});

#[derive(Debug, Clone)]
pub struct StorageConfig {
    /// Raíz del store versionado (`ver/` y `tmp/` cuelgan de aquí).
    pub base_dir: PathBuf,
    pub version_pattern: String,
    pub state_file: PathBuf,
    pub knowledge_path: String,
    pub knowledge_ttl_days: i64,
    pub shrink_guard: ShrinkGuardPolicy,
    /// Directorio con los documentos declarativos (policy, rules, profiles,
    /// contracts).
    pub config_dir: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self { base_dir:           PathBuf::from("outputs/fs"),
               version_pattern:    DEFAULT_VERSION_PATTERN.to_string(),
               state_file:         PathBuf::from("RUN_STATE.json"),
               knowledge_path:     DEFAULT_KNOWLEDGE_PATH.to_string(),
               knowledge_ttl_days: DEFAULT_TTL_DAYS,
               shrink_guard:       ShrinkGuardPolicy::default(),
               config_dir:         PathBuf::from("config") }
    }
}

impl StorageConfig {
    pub fn from_env() -> Self {
        // asegura que .env se haya cargado
        Lazy::force(&DOTENV_LOADED);
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Igual que `from_env` pero con una fuente de variables inyectable.
    /// Valores que no parsean se ignoran (queda el default).
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut cfg = Self::default();
        if let Some(v) = lookup("LISTFLOW_BASE_DIR") {
            cfg.base_dir = PathBuf::from(v);
        }
        if let Some(v) = lookup("LISTFLOW_VERSION_PATTERN") {
            cfg.version_pattern = v;
        }
        if let Some(v) = lookup("LISTFLOW_STATE_FILE") {
            cfg.state_file = PathBuf::from(v);
        }
        if let Some(v) = lookup("LISTFLOW_KNOWLEDGE_PATH") {
            cfg.knowledge_path = v;
        }
        if let Some(v) = lookup("LISTFLOW_KNOWLEDGE_TTL_DAYS").and_then(|v| v.parse().ok()) {
            cfg.knowledge_ttl_days = v;
        }
        if let Some(v) = lookup("LISTFLOW_SHRINK_THRESHOLD_BYTES").and_then(|v| v.parse().ok()) {
            cfg.shrink_guard.threshold_bytes = v;
        }
        if let Some(v) = lookup("LISTFLOW_SHRINK_THRESHOLD_PERCENT").and_then(|v| v.parse().ok()) {
            cfg.shrink_guard.threshold_percent = v;
        }
        if let Some(v) = lookup("LISTFLOW_CONFIG_DIR") {
            cfg.config_dir = PathBuf::from(v);
        }
        cfg
    }
}

/// Forzar carga temprana de .env desde aplicaciones externas si se desea.
pub fn init_dotenv() {
    Lazy::force(&DOTENV_LOADED);
}
