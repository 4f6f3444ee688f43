//! Builder para `WorkflowOrchestrator`.
//!
//! Acumula la definición del workflow, las tablas declarativas (rulesets,
//! contratos, perfiles), la política y los stores. `build()` valida todas las
//! referencias cruzadas antes de que exista una corrida: un error de
//! configuración nunca aparece a mitad de un `run()`.
//!
//! ```ignore
//! let orchestrator = WorkflowOrchestrator::builder(workflow)
//!     .registry(registry)
//!     .rules(rules)
//!     .contracts(contracts)
//!     .build()?;
//! ```

use std::collections::HashSet;

use crate::contract::ContractValidator;
use crate::engine::{OrchestratorPolicy, WorkflowOrchestrator};
use crate::errors::CoreEngineError;
use crate::event::{EventStore, InMemoryEventStore};
use crate::resolve::{collect_profile_refs, ProfileManager};
use crate::rules::RuleEngine;
use crate::services::SharedServices;
use crate::state::{InMemoryRunStateStore, RunStateStore};
use crate::step::{HandlerRegistry, OnError, WorkflowConfig};

pub struct OrchestratorBuilder<E: EventStore, S: RunStateStore> {
    workflow: WorkflowConfig,
    registry: HandlerRegistry,
    rules: RuleEngine,
    contracts: ContractValidator,
    profiles: ProfileManager,
    policy: OrchestratorPolicy,
    services: SharedServices,
    event_store: E,
    state_store: S,
}

impl OrchestratorBuilder<InMemoryEventStore, InMemoryRunStateStore> {
    /// Builder con stores en memoria.
    pub fn new(workflow: WorkflowConfig) -> Self {
        Self { workflow,
               registry: HandlerRegistry::new(),
               rules: RuleEngine::new(),
               contracts: ContractValidator::new(),
               profiles: ProfileManager::new(),
               policy: OrchestratorPolicy::default(),
               services: SharedServices::new(),
               event_store: InMemoryEventStore::new(),
               state_store: InMemoryRunStateStore::new() }
    }
}

impl<E: EventStore, S: RunStateStore> OrchestratorBuilder<E, S> {
    pub fn registry(mut self, registry: HandlerRegistry) -> Self {
        self.registry = registry;
        self
    }

    pub fn rules(mut self, rules: RuleEngine) -> Self {
        self.rules = rules;
        self
    }

    pub fn contracts(mut self, contracts: ContractValidator) -> Self {
        self.contracts = contracts;
        self
    }

    pub fn profiles(mut self, profiles: ProfileManager) -> Self {
        self.profiles = profiles;
        self
    }

    pub fn policy(mut self, policy: OrchestratorPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn services(mut self, services: SharedServices) -> Self {
        self.services = services;
        self
    }

    /// Reemplaza el store de eventos (cambia el parámetro de tipo).
    pub fn event_store<E2: EventStore>(self, event_store: E2) -> OrchestratorBuilder<E2, S> {
        OrchestratorBuilder { workflow: self.workflow,
                              registry: self.registry,
                              rules: self.rules,
                              contracts: self.contracts,
                              profiles: self.profiles,
                              policy: self.policy,
                              services: self.services,
                              event_store,
                              state_store: self.state_store }
    }

    /// Reemplaza el store de run-state (cambia el parámetro de tipo).
    pub fn state_store<S2: RunStateStore>(self, state_store: S2) -> OrchestratorBuilder<E, S2> {
        OrchestratorBuilder { workflow: self.workflow,
                              registry: self.registry,
                              rules: self.rules,
                              contracts: self.contracts,
                              profiles: self.profiles,
                              policy: self.policy,
                              services: self.services,
                              event_store: self.event_store,
                              state_store }
    }

    /// Valida la configuración y construye el orquestador.
    pub fn build(self) -> Result<WorkflowOrchestrator<E, S>, CoreEngineError> {
        validate(&self.workflow, &self.rules, &self.contracts, &self.profiles)?;
        for step in &self.workflow.steps {
            if !self.registry.contains(&step.handler) {
                log::warn!("step '{}' uses unregistered handler '{}'; it will fail at run time",
                           step.id,
                           step.handler);
            }
        }
        Ok(WorkflowOrchestrator::from_parts(self.workflow,
                                            self.registry,
                                            self.rules,
                                            self.contracts,
                                            self.profiles,
                                            self.policy,
                                            self.services,
                                            self.event_store,
                                            self.state_store))
    }
}

fn config_err(msg: String) -> CoreEngineError {
    CoreEngineError::Config(msg)
}

/// Referencias cruzadas de la definición: ids, rulesets, contratos,
/// perfiles y destinos de fallback.
pub fn validate(workflow: &WorkflowConfig,
                rules: &RuleEngine,
                contracts: &ContractValidator,
                profiles: &ProfileManager)
                -> Result<(), CoreEngineError> {
    if workflow.workflow_id.trim().is_empty() {
        return Err(config_err("workflow_id must not be empty".into()));
    }
    profiles.validate()?;
    let mut seen = HashSet::new();
    for step in &workflow.steps {
        if step.id.trim().is_empty() {
            return Err(config_err("step id must not be empty".into()));
        }
        if !seen.insert(step.id.as_str()) {
            return Err(config_err(format!("duplicate step id '{}'", step.id)));
        }
    }
    for step in &workflow.steps {
        if let Some(rs) = &step.ruleset {
            if !rules.contains(rs) {
                return Err(config_err(format!("step '{}' references unknown ruleset '{rs}'", step.id)));
            }
        }
        if let Some(c) = &step.outputs.contract {
            if !contracts.contains(c) {
                return Err(config_err(format!("step '{}' references unknown contract '{c}'", step.id)));
            }
        }
        if let Some(OnError::FallbackNext(target)) = &step.on_error {
            if !seen.contains(target.as_str()) {
                return Err(config_err(format!("step '{}' falls back to unknown step '{target}'", step.id)));
            }
        }
        let mut names = Vec::new();
        collect_profile_refs(&step.inputs, &mut names);
        if let Some(missing) = names.iter().find(|n| !profiles.contains(n)) {
            return Err(config_err(format!("step '{}' references unknown profile '{missing}'", step.id)));
        }
    }
    Ok(())
}
