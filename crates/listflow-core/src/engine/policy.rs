//! Documento `orchestrator_policy.json`.
//!
//! Todas las secciones son opcionales; un documento ausente produce los
//! defaults seguros (detener ante errores y violaciones de contrato).

use serde::{Deserialize, Serialize};

use crate::constants::DEFAULT_MAX_FALLBACK_JUMPS;
use crate::session::SessionPolicy;
use crate::state::ShrinkGuardPolicy;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecutionPolicy {
    #[serde(default = "yes")]
    pub stop_on_error: bool,
    #[serde(default = "yes")]
    pub stop_on_contract_violation: bool,
    #[serde(default)]
    pub resume_from_state: bool,
    #[serde(default = "default_max_fallback_jumps")]
    pub max_fallback_jumps: u32,
}

fn yes() -> bool {
    true
}

fn default_max_fallback_jumps() -> u32 {
    DEFAULT_MAX_FALLBACK_JUMPS
}

impl Default for ExecutionPolicy {
    fn default() -> Self {
        Self { stop_on_error:              true,
               stop_on_contract_violation: true,
               resume_from_state:          false,
               max_fallback_jumps:         DEFAULT_MAX_FALLBACK_JUMPS }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoggingPolicy {
    #[serde(default = "default_level")]
    pub level: String,
}

fn default_level() -> String {
    "info".to_string()
}

impl Default for LoggingPolicy {
    fn default() -> Self {
        Self { level: default_level() }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SecurityPolicy {
    #[serde(default)]
    pub size_shrink_guard: ShrinkGuardPolicy,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OrchestratorPolicy {
    #[serde(default)]
    pub execution: ExecutionPolicy,
    #[serde(default)]
    pub session: SessionPolicy,
    #[serde(default)]
    pub logging: LoggingPolicy,
    #[serde(default)]
    pub security: SecurityPolicy,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::BudgetScope;
    use crate::state::ViolationAction;
    use serde_json::json;

    #[test]
    fn partial_document_keeps_defaults() {
        let p: OrchestratorPolicy = serde_json::from_value(json!({
            "execution": {"stop_on_error": false},
            "session": {"budget_scope": "instance"},
            "security": {"size_shrink_guard": {"threshold_percent": 0.01, "on_violation": "warn"}}
        })).unwrap();
        assert!(!p.execution.stop_on_error);
        assert!(p.execution.stop_on_contract_violation);
        assert_eq!(p.execution.max_fallback_jumps, 64);
        assert_eq!(p.session.budget_scope, BudgetScope::Instance);
        assert_eq!(p.session.max_updates, 1000);
        assert_eq!(p.logging.level, "info");
        assert_eq!(p.security.size_shrink_guard.threshold_bytes, 4096);
        assert_eq!(p.security.size_shrink_guard.on_violation, ViolationAction::Warn);
    }
}
