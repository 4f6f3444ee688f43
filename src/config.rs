//! Documentos declarativos del directorio de configuración.
//!
//! - `orchestrator_policy.json`: si falta se usan defaults seguros (con
//!   warning); si existe pero no parsea es error de configuración.
//! - `rule_definitions.json`, `csv_profiles.json`, `data_contracts.json`:
//!   si faltan quedan tablas vacías.

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use listflow_core::{ContractValidator, OrchestratorPolicy, ProfileManager, RuleEngine, WorkflowConfig};
use log::{info, warn};
use serde_json::Value;

use crate::errors::AppError;

pub const POLICY_FILE: &str = "orchestrator_policy.json";
pub const RULES_FILE: &str = "rule_definitions.json";
pub const PROFILES_FILE: &str = "csv_profiles.json";
pub const CONTRACTS_FILE: &str = "data_contracts.json";

/// Tablas declarativas ya parseadas.
#[derive(Debug, Clone, Default)]
pub struct ConfigBundle {
    pub policy: OrchestratorPolicy,
    /// `false` si la política vino de defaults por falta de archivo.
    pub policy_from_file: bool,
    pub rules: RuleEngine,
    pub profiles: ProfileManager,
    pub contracts: ContractValidator,
}

/// Lee un JSON opcional: `Ok(None)` si el archivo no existe.
fn read_optional_json(path: &Path) -> Result<Option<Value>, AppError> {
    let raw = match fs::read_to_string(path) {
        Ok(s) => s,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
        Err(source) => return Err(AppError::Io { path: path.to_path_buf(), source }),
    };
    serde_json::from_str(&raw).map(Some)
                              .map_err(|source| AppError::Json { path: path.to_path_buf(), source })
}

impl ConfigBundle {
    pub fn load(dir: &Path) -> Result<Self, AppError> {
        let mut bundle = ConfigBundle::default();

        let policy_path = dir.join(POLICY_FILE);
        match read_optional_json(&policy_path)? {
            Some(doc) => {
                bundle.policy = serde_json::from_value(doc).map_err(|source| AppError::Json { path: policy_path,
                                                                                             source })?;
                bundle.policy_from_file = true;
            }
            None => warn!("{} not found in {}; using safe defaults", POLICY_FILE, dir.display()),
        }
        if let Some(doc) = read_optional_json(&dir.join(RULES_FILE))? {
            bundle.rules = RuleEngine::from_document(&doc)?;
        }
        if let Some(doc) = read_optional_json(&dir.join(PROFILES_FILE))? {
            bundle.profiles = ProfileManager::from_document(&doc)?;
        }
        if let Some(doc) = read_optional_json(&dir.join(CONTRACTS_FILE))? {
            bundle.contracts = ContractValidator::from_document(&doc)?;
        }
        info!("config loaded from {} (policy from file: {})", dir.display(), bundle.policy_from_file);
        Ok(bundle)
    }
}

/// Carga una definición de workflow (`{"workflow_id": ..., "steps": [...]}`).
pub fn load_workflow(path: &Path) -> Result<WorkflowConfig, AppError> {
    let raw = fs::read_to_string(path).map_err(|source| AppError::Io { path: path.to_path_buf(), source })?;
    serde_json::from_str(&raw).map_err(|source| AppError::Json { path: PathBuf::from(path), source })
}
