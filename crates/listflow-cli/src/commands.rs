use std::path::PathBuf;

use anyhow::{Context, Result};
use listflow::{load_workflow, AppError, ConfigBundle, Runtime};
use listflow_core::{CoreEngineError, HaltReason, RunOptions, RunStatus};
use listflow_persistence::{KnowledgeStore, StorageConfig, VersionedArtifactStore};
use tracing_subscriber::EnvFilter;

use crate::Command;

pub const EXIT_OK: u8 = 0;
pub const EXIT_FAILURE: u8 = 1;
pub const EXIT_CONFIG: u8 = 2;
pub const EXIT_HALTED: u8 = 3;
pub const EXIT_BUSY: u8 = 4;

/// `RUST_LOG` manda; si no está se usa `default_level`.
fn init_logging(default_level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    let _ = tracing_subscriber::fmt().with_env_filter(filter).with_target(false).try_init();
}

pub fn exit_code_for(err: &anyhow::Error) -> u8 {
    if let Some(app) = err.downcast_ref::<AppError>() {
        if app.is_busy() {
            return EXIT_BUSY;
        }
        if app.is_config() {
            return EXIT_CONFIG;
        }
    }
    if let Some(CoreEngineError::Busy) = err.downcast_ref::<CoreEngineError>() {
        return EXIT_BUSY;
    }
    EXIT_FAILURE
}

pub fn dispatch(command: Command) -> Result<u8> {
    match command {
        Command::Run { workflow,
                       config_dir,
                       resume,
                       allow_shrink, } => run(workflow, config_dir, resume, allow_shrink),
        Command::History { base_path } => history(&base_path),
        Command::Insight { key, include_expired } => insight(&key, include_expired),
    }
}

fn run(workflow_path: PathBuf, config_dir: Option<PathBuf>, resume: bool, allow_shrink: bool) -> Result<u8> {
    let mut storage = StorageConfig::from_env();
    if let Some(dir) = config_dir {
        storage.config_dir = dir;
    }
    // La política define el nivel de log, así que se carga antes del subscriber.
    let bundle = ConfigBundle::load(&storage.config_dir).map_err(anyhow::Error::new)?;
    init_logging(&bundle.policy.logging.level);
    if !bundle.policy_from_file {
        tracing::warn!("no orchestrator policy in {}; running with safe defaults", storage.config_dir.display());
    }

    let workflow = load_workflow(&workflow_path).map_err(anyhow::Error::new)?;
    let runtime = Runtime::with_config(storage, bundle).map_err(anyhow::Error::new)?;
    let orchestrator = runtime.orchestrator(workflow, runtime.builtin_registry())
                              .map_err(anyhow::Error::new)?;
    let options = RunOptions { resume:       resume.then_some(true),
                               allow_shrink: allow_shrink.then_some(true) };
    let report = orchestrator.run_with(options).map_err(|e| anyhow::Error::new(AppError::from(e)))?;

    println!("{}", serde_json::to_string_pretty(&report).context("serializing run report")?);
    Ok(match &report.status {
        RunStatus::Completed => EXIT_OK,
        RunStatus::Halted { reason: HaltReason::Config { .. } } => EXIT_CONFIG,
        RunStatus::Halted { .. } => EXIT_HALTED,
    })
}

fn history(base_path: &str) -> Result<u8> {
    init_logging("warn");
    let storage = StorageConfig::from_env();
    let store = VersionedArtifactStore::from_config(&storage).map_err(|e| anyhow::Error::new(AppError::from(e)))?;
    let versions = store.versions(base_path)
                        .with_context(|| format!("listing versions of '{base_path}'"))?;
    if versions.is_empty() {
        println!("no versions for '{base_path}'");
        return Ok(EXIT_OK);
    }
    for entry in versions {
        let meta = store.read_sidecar(&entry.path)?;
        match meta {
            Some(m) => println!("v{:<4} {}  {} ({}: {})", entry.version, entry.file_name(), m.timestamp, m.actor, m.reason),
            None => println!("v{:<4} {}", entry.version, entry.file_name()),
        }
    }
    Ok(EXIT_OK)
}

fn insight(key: &str, include_expired: bool) -> Result<u8> {
    init_logging("warn");
    let storage = StorageConfig::from_env();
    let store = VersionedArtifactStore::from_config(&storage).map_err(|e| anyhow::Error::new(AppError::from(e)))?;
    let knowledge = KnowledgeStore::open(store, &storage.knowledge_path, storage.knowledge_ttl_days)
        .context("opening knowledge base")?;
    match knowledge.get_latest_insight(key, include_expired) {
        Some(found) => println!("{}", serde_json::to_string_pretty(found)?),
        None => println!("no insight for '{key}'"),
    }
    Ok(EXIT_OK)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exit_codes_follow_error_kind() {
        let busy = anyhow::Error::new(AppError::from(CoreEngineError::Busy));
        assert_eq!(exit_code_for(&busy), EXIT_BUSY);
        let config = anyhow::Error::new(AppError::from(CoreEngineError::Config("x".into())));
        assert_eq!(exit_code_for(&config), EXIT_CONFIG);
        let other = anyhow::anyhow!("disk on fire");
        assert_eq!(exit_code_for(&other), EXIT_FAILURE);
    }
}
