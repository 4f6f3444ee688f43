//! Run-state en disco (`RUN_STATE.json`) con guarda de achique.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use listflow_core::state::{RunState, RunStateStore, ShrinkGuardPolicy, ShrinkPermit, StateWriteOutcome, ViolationAction};
use listflow_core::CoreEngineError;
use log::{error, warn};
use tempfile::NamedTempFile;

use crate::error::{io_at, PersistenceError};

#[derive(Debug, Clone)]
pub struct FileRunStateStore {
    path: PathBuf,
    guard: ShrinkGuardPolicy,
}

impl FileRunStateStore {
    pub fn new(path: impl Into<PathBuf>, guard: ShrinkGuardPolicy) -> Self {
        Self { path: path.into(),
               guard }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn current_size(&self) -> u64 {
        fs::metadata(&self.path).map(|m| m.len()).unwrap_or(0)
    }

    fn read(&self) -> Result<Option<RunState>, PersistenceError> {
        if !self.path.exists() {
            return Ok(None);
        }
        let raw = fs::read_to_string(&self.path).map_err(io_at(&self.path))?;
        if raw.trim().is_empty() {
            return Ok(None);
        }
        Ok(Some(serde_json::from_str(&raw)?))
    }

    fn write(&self, bytes: &[u8]) -> Result<(), PersistenceError> {
        let dir = match self.path.parent() {
            Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
            _ => PathBuf::from("."),
        };
        fs::create_dir_all(&dir).map_err(io_at(&dir))?;
        let mut tmp = NamedTempFile::new_in(&dir).map_err(io_at(&dir))?;
        tmp.write_all(bytes).map_err(io_at(tmp.path()))?;
        tmp.as_file().sync_all().map_err(io_at(tmp.path()))?;
        tmp.persist(&self.path).map_err(|e| io_at(&self.path)(e.error))?;
        Ok(())
    }
}

impl RunStateStore for FileRunStateStore {
    fn load(&self) -> Result<Option<RunState>, CoreEngineError> {
        Ok(self.read()?)
    }

    fn save(&mut self, state: &RunState, permit: ShrinkPermit) -> Result<StateWriteOutcome, CoreEngineError> {
        let bytes = state.encode()?;
        let new_bytes = bytes.len() as u64;
        if permit == ShrinkPermit::Denied {
            if let Some(report) = self.guard.check(self.current_size(), new_bytes) {
                match self.guard.on_violation {
                    ViolationAction::BlockAndRequestApproval => {
                        error!("write to {} blocked: {} -> {} bytes; approval required",
                               self.path.display(),
                               report.old_bytes,
                               report.new_bytes);
                        return Ok(StateWriteOutcome::Rejected(report));
                    }
                    ViolationAction::Warn => warn!("{} shrinks by {} bytes ({:.2}%)",
                                                   self.path.display(),
                                                   report.shrink_bytes,
                                                   report.shrink_ratio * 100.0),
                }
            }
        }
        self.write(&bytes)?;
        Ok(StateWriteOutcome::Written { bytes: new_bytes })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn state(n: usize) -> RunState {
        RunState::new("s", json!({"blob": "x".repeat(n)}))
    }

    #[test]
    fn half_size_write_is_blocked_and_file_untouched() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = FileRunStateStore::new(dir.path().join("RUN_STATE.json"),
                                               ShrinkGuardPolicy { threshold_percent: 0.01,
                                                                   ..ShrinkGuardPolicy::default() });
        store.save(&state(10_000), ShrinkPermit::Denied).unwrap();
        let before = fs::read(store.path()).unwrap();
        let out = store.save(&state(5_000), ShrinkPermit::Denied).unwrap();
        assert!(matches!(out, StateWriteOutcome::Rejected(_)));
        assert_eq!(fs::read(store.path()).unwrap(), before);

        assert!(matches!(store.save(&state(20_000), ShrinkPermit::Denied).unwrap(), StateWriteOutcome::Written { .. }));
        assert_eq!(store.load().unwrap(), Some(state(20_000)));
    }

    #[test]
    fn missing_or_empty_file_loads_as_none() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested/RUN_STATE.json");
        let mut store = FileRunStateStore::new(&path, ShrinkGuardPolicy::default());
        assert_eq!(store.load().unwrap(), None);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(&path, "").unwrap();
        assert_eq!(store.load().unwrap(), None);
        assert!(matches!(store.save(&state(10), ShrinkPermit::Denied).unwrap(), StateWriteOutcome::Written { .. }));
    }

    #[test]
    fn corrupt_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("RUN_STATE.json");
        fs::write(&path, "{not json").unwrap();
        let store = FileRunStateStore::new(&path, ShrinkGuardPolicy::default());
        assert!(matches!(store.load(), Err(CoreEngineError::StateStore(_))));
    }
}
