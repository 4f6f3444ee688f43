//! Arranque de la aplicación: stores en disco, base de conocimiento,
//! servicios compartidos y orquestador listo para correr.

use std::path::PathBuf;
use std::sync::Arc;

use listflow_adapters::register_builtin_handlers;
use listflow_core::state::ShrinkGuardPolicy;
use listflow_core::{HandlerRegistry, InMemoryEventStore, SharedServices, WorkflowConfig, WorkflowOrchestrator};
use listflow_persistence::{FileRunStateStore, KnowledgeStore, SharedKnowledgeStore, StorageConfig,
                           VersionedArtifactStore};

use crate::config::ConfigBundle;
use crate::errors::AppError;

/// Orquestador con run-state en disco.
pub type FileOrchestrator = WorkflowOrchestrator<InMemoryEventStore, FileRunStateStore>;

#[derive(Debug)]
pub struct Runtime {
    pub storage: StorageConfig,
    pub config: ConfigBundle,
    pub artifacts: Arc<VersionedArtifactStore>,
    pub knowledge: Arc<SharedKnowledgeStore>,
}

impl Runtime {
    /// Carga los documentos de `storage.config_dir` y abre los stores.
    pub fn open(storage: StorageConfig) -> Result<Self, AppError> {
        let config = ConfigBundle::load(&storage.config_dir)?;
        Self::with_config(storage, config)
    }

    pub fn with_config(storage: StorageConfig, config: ConfigBundle) -> Result<Self, AppError> {
        let artifacts = VersionedArtifactStore::from_config(&storage)?;
        let knowledge = KnowledgeStore::open(artifacts.clone(), &storage.knowledge_path, storage.knowledge_ttl_days)?;
        log::info!("runtime ready (base_dir={})", storage.base_dir.display());
        Ok(Self { storage,
                  config,
                  artifacts: Arc::new(artifacts),
                  knowledge: Arc::new(SharedKnowledgeStore::new(knowledge)) })
    }

    /// Ruta del run-state: relativa a `base_dir` salvo que sea absoluta.
    pub fn state_path(&self) -> PathBuf {
        if self.storage.state_file.is_absolute() {
            self.storage.state_file.clone()
        } else {
            self.storage.base_dir.join(&self.storage.state_file)
        }
    }

    /// La guarda declarada en la política manda; sin archivo de política se
    /// usa la del entorno.
    pub fn shrink_guard(&self) -> ShrinkGuardPolicy {
        if self.config.policy_from_file {
            self.config.policy.security.size_shrink_guard.clone()
        } else {
            self.storage.shrink_guard.clone()
        }
    }

    pub fn services(&self) -> SharedServices {
        SharedServices::new().with_artifacts(self.artifacts.clone())
                             .with_insights(self.knowledge.clone())
    }

    /// Registro con los handlers built-in.
    pub fn builtin_registry(&self) -> HandlerRegistry {
        let mut registry = HandlerRegistry::new();
        register_builtin_handlers(&mut registry);
        registry
    }

    /// Construye el orquestador. `registry` ya debe incluir los handlers
    /// de dominio además de los built-in que se quieran usar.
    pub fn orchestrator(&self, workflow: WorkflowConfig, registry: HandlerRegistry)
                        -> Result<FileOrchestrator, AppError> {
        let state_store = FileRunStateStore::new(self.state_path(), self.shrink_guard());
        let orchestrator = WorkflowOrchestrator::builder(workflow).registry(registry)
                                                                  .rules(self.config.rules.clone())
                                                                  .contracts(self.config.contracts.clone())
                                                                  .profiles(self.config.profiles.clone())
                                                                  .policy(self.config.policy.clone())
                                                                  .services(self.services())
                                                                  .state_store(state_store)
                                                                  .build()?;
        Ok(orchestrator)
    }
}
