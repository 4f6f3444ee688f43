//! Store de artifacts versionados sobre el sistema de archivos.
//!
//! Layout bajo `base_dir`:
//! - `ver/<base>_<segmento><ext>`: versiones inmutables.
//! - `ver/<artifact-sin-ext>.meta.json`: sidecar de metadata (opcional).
//! - `ver/.<base>.lock`: lock de escritura por nombre base.
//! - `tmp/`: archivos temporales previos al rename.
//!
//! Ninguna versión se sobrescribe ni se borra. El número de versión se
//! calcula escaneando `ver/` bajo el lock; el rename final es no-clobber, de
//! modo que una colisión (otro proceso sin lock) reintenta con un número
//! nuevo.

use std::fmt::Write as _;
use std::fs::{self, OpenOptions};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::thread;
use std::time::{Duration, Instant};

use chrono::format::{Item, StrftimeItems};
use chrono::Utc;
use listflow_core::hashing::{sha256_hex, to_canonical_pretty};
use listflow_core::model::{ArtifactData, SavedArtifact};
use listflow_core::services::{ArtifactSink, ServiceError};
use log::{debug, error, info, warn};
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tempfile::NamedTempFile;

use crate::config::StorageConfig;
use crate::error::{io_at, PersistenceError};

pub const DEFAULT_VERSION_PATTERN: &str = "v{N}_{sha12}_%Y%m%dT%H%M%SZ";

/// Un lock más viejo que esto se considera abandonado.
const LOCK_STALE_AFTER: Duration = Duration::from_secs(30);
const DEFAULT_LOCK_WAIT: Duration = Duration::from_secs(35);
const MAX_COLLISION_RETRIES: u32 = 5;
const SIDECAR_MARKER: &str = ".meta.";

/// Una versión existente en disco.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VersionEntry {
    pub version: u64,
    pub path: PathBuf,
}

impl VersionEntry {
    pub fn file_name(&self) -> String {
        self.path.file_name().map(|n| n.to_string_lossy().into_owned()).unwrap_or_default()
    }
}

/// Contenido del sidecar `.meta.json`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SidecarMetadata {
    pub timestamp: String,
    pub version: u64,
    pub sha256: String,
    pub actor: String,
    pub reason: String,
    pub source_file: String,
}

#[derive(Debug, Clone)]
pub struct VersionedArtifactStore {
    base_dir: PathBuf,
    pattern: String,
    lock_wait: Duration,
}

/// `(stem, ext)` de la ruta lógica; `ext` incluye el punto.
fn split_logical(base_path: &str, data: &ArtifactData) -> Result<(String, String), PersistenceError> {
    let name = Path::new(base_path).file_name()
                                   .map(|n| n.to_string_lossy().into_owned())
                                   .ok_or_else(|| PersistenceError::InvalidPath(base_path.to_string()))?;
    let (stem, ext) = match name.rfind('.') {
        Some(i) if i > 0 => (name[..i].to_string(), name[i..].to_string()),
        _ => (name.clone(), data.default_extension().to_string()),
    };
    if stem.is_empty() {
        return Err(PersistenceError::InvalidPath(base_path.to_string()));
    }
    Ok((stem, ext))
}

fn split_existing(base_path: &str) -> Result<(String, String), PersistenceError> {
    let name = Path::new(base_path).file_name()
                                   .map(|n| n.to_string_lossy().into_owned())
                                   .ok_or_else(|| PersistenceError::InvalidPath(base_path.to_string()))?;
    match name.rfind('.') {
        Some(i) if i > 0 => Ok((name[..i].to_string(), name[i..].to_string())),
        _ => Ok((name, String::new())),
    }
}

fn payload_bytes(data: &ArtifactData) -> Result<Vec<u8>, PersistenceError> {
    match data {
        ArtifactData::Json(v @ (Value::Object(_) | Value::Array(_))) => Ok(to_canonical_pretty(v)?),
        ArtifactData::Json(other) => {
            Err(PersistenceError::UnsupportedPayload(format!("JSON payload must be an object or array, got {other}")))
        }
        ArtifactData::Text(s) => Ok(s.as_bytes().to_vec()),
        ArtifactData::Bytes(b) => Ok(b.clone()),
    }
}

/// `^<base>_(?:.*?_)?v(\d+)(?:\D.*)?<ext>$`
fn version_regex(stem: &str, ext: &str) -> Result<Regex, PersistenceError> {
    let raw = format!(r"^{}_(?:.*?_)?v(\d+)(?:\D.*)?{}$", regex::escape(stem), regex::escape(ext));
    Regex::new(&raw).map_err(|e| PersistenceError::InvalidPattern { pattern: raw.clone(),
                                                                   reason:  e.to_string() })
}

fn validate_pattern(pattern: &str) -> Result<(), PersistenceError> {
    let invalid = |reason: &str| PersistenceError::InvalidPattern { pattern: pattern.to_string(),
                                                                    reason:  reason.to_string() };
    if !(pattern.starts_with("v{N}") || pattern.contains("_v{N}")) {
        return Err(invalid("must contain 'v{N}' at the start or '_v{N}'"));
    }
    if pattern.contains('/') || pattern.contains('\\') {
        return Err(invalid("must not contain path separators"));
    }
    if StrftimeItems::new(pattern).any(|item| matches!(item, Item::Error)) {
        return Err(invalid("contains an invalid strftime specifier"));
    }
    Ok(())
}

/// Lock exclusivo por nombre base; se libera en `Drop`.
struct BaseLock {
    path: PathBuf,
}

impl BaseLock {
    fn acquire(dir: &Path, stem: &str, wait: Duration) -> Result<Self, PersistenceError> {
        let path = dir.join(format!(".{stem}.lock"));
        let deadline = Instant::now() + wait;
        let mut attempts: u64 = 0;
        loop {
            match OpenOptions::new().write(true).create_new(true).open(&path) {
                Ok(mut f) => {
                    let _ = writeln!(f, "{}", std::process::id());
                    return Ok(Self { path });
                }
                Err(e) if e.kind() == ErrorKind::AlreadyExists => {
                    if lock_is_stale(&path) {
                        warn!("removing stale lock {}", path.display());
                        let _ = fs::remove_file(&path);
                        continue;
                    }
                    if Instant::now() >= deadline {
                        return Err(PersistenceError::LockBusy(path));
                    }
                    let delay_ms = 15 * (attempts + 1).min(10);
                    debug!("lock {} busy (attempt {}) -> sleeping {delay_ms}ms", path.display(), attempts + 1);
                    thread::sleep(Duration::from_millis(delay_ms));
                    attempts += 1;
                }
                Err(e) => return Err(io_at(&path)(e)),
            }
        }
    }
}

fn lock_is_stale(path: &Path) -> bool {
    fs::metadata(path).and_then(|m| m.modified())
                      .ok()
                      .and_then(|t| t.elapsed().ok())
                      .map(|age| age > LOCK_STALE_AFTER)
                      .unwrap_or(false)
}

impl Drop for BaseLock {
    fn drop(&mut self) {
        let _ = fs::remove_file(&self.path);
    }
}

/// Escritura atómica: temp en `tmp_dir` + fsync + rename.
fn write_atomic(tmp_dir: &Path, target: &Path, bytes: &[u8], clobber: bool) -> Result<(), PersistenceError> {
    let mut tmp = NamedTempFile::new_in(tmp_dir).map_err(io_at(tmp_dir))?;
    tmp.write_all(bytes).map_err(io_at(tmp.path()))?;
    tmp.as_file().sync_all().map_err(io_at(tmp.path()))?;
    let persisted = if clobber { tmp.persist(target) } else { tmp.persist_noclobber(target) };
    persisted.map(|_| ()).map_err(|e| io_at(target)(e.error))
}

impl VersionedArtifactStore {
    pub fn new(base_dir: impl Into<PathBuf>) -> Result<Self, PersistenceError> {
        Self::with_pattern(base_dir, DEFAULT_VERSION_PATTERN)
    }

    /// Valida el template de nombre (`{N}`, `{sha12}`, tokens strftime).
    pub fn with_pattern(base_dir: impl Into<PathBuf>, pattern: &str) -> Result<Self, PersistenceError> {
        validate_pattern(pattern)?;
        Ok(Self { base_dir:  base_dir.into(),
                  pattern:   pattern.to_string(),
                  lock_wait: DEFAULT_LOCK_WAIT })
    }

    pub fn from_config(cfg: &StorageConfig) -> Result<Self, PersistenceError> {
        Self::with_pattern(&cfg.base_dir, &cfg.version_pattern)
    }

    /// Cuánto esperar un lock ocupado antes de `LockBusy`.
    pub fn with_lock_wait(mut self, wait: Duration) -> Self {
        self.lock_wait = wait;
        self
    }

    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    pub fn ver_dir(&self) -> PathBuf {
        self.base_dir.join("ver")
    }

    pub fn tmp_dir(&self) -> PathBuf {
        self.base_dir.join("tmp")
    }

    fn ensure_dirs(&self) -> Result<(), PersistenceError> {
        for dir in [self.ver_dir(), self.tmp_dir()] {
            fs::create_dir_all(&dir).map_err(io_at(&dir))?;
        }
        Ok(())
    }

    fn scan(&self, stem: &str, ext: &str) -> Result<Vec<VersionEntry>, PersistenceError> {
        let dir = self.ver_dir();
        if !dir.exists() {
            return Ok(Vec::new());
        }
        let re = version_regex(stem, ext)?;
        let mut out = Vec::new();
        for entry in fs::read_dir(&dir).map_err(io_at(&dir))? {
            let entry = entry.map_err(io_at(&dir))?;
            let name = entry.file_name().to_string_lossy().into_owned();
            if name.contains(SIDECAR_MARKER) {
                continue;
            }
            let Some(caps) = re.captures(&name) else { continue };
            if let Some(version) = caps.get(1).and_then(|m| m.as_str().parse::<u64>().ok()) {
                out.push(VersionEntry { version,
                                        path: entry.path() });
            }
        }
        out.sort_by_key(|e| e.version);
        Ok(out)
    }

    fn render_segment(&self, version: u64, sha256: &str) -> Result<String, PersistenceError> {
        let template = self.pattern.replace("{N}", &version.to_string()).replace("{sha12}", &sha256[..12]);
        let mut out = String::new();
        write!(out, "{}", Utc::now().format_with_items(StrftimeItems::new(&template))).map_err(|_| {
            PersistenceError::InvalidPattern { pattern: self.pattern.clone(),
                                               reason:  "strftime rendering failed".into() }
        })?;
        Ok(out)
    }

    /// Guarda `data` como la siguiente versión de `base_path`.
    pub fn save_new_version(&self, base_path: &str, data: &ArtifactData) -> Result<SavedArtifact, PersistenceError> {
        let (stem, ext) = split_logical(base_path, data)?;
        let bytes = payload_bytes(data)?;
        let sha256 = sha256_hex(&bytes);
        self.ensure_dirs()?;

        let ver_dir = self.ver_dir();
        let tmp_dir = self.tmp_dir();
        let _lock = BaseLock::acquire(&ver_dir, &stem, self.lock_wait)?;
        for attempt in 0..MAX_COLLISION_RETRIES {
            let version = self.scan(&stem, &ext)?.last().map(|e| e.version).unwrap_or(0) + 1;
            let segment = self.render_segment(version, &sha256)?;
            let target = ver_dir.join(format!("{stem}_{segment}{ext}"));
            match write_atomic(&tmp_dir, &target, &bytes, false) {
                Ok(()) => {
                    info!("saved {} (v{version}, sha256={})", target.display(), &sha256[..12]);
                    return Ok(SavedArtifact { filepath: target,
                                              version,
                                              sha256 });
                }
                Err(PersistenceError::Io { source, .. }) if source.kind() == ErrorKind::AlreadyExists => {
                    warn!("version collision on {} (attempt {}); rescanning", target.display(), attempt + 1);
                }
                Err(e) => return Err(e),
            }
        }
        Err(PersistenceError::VersionCollision(base_path.to_string()))
    }

    /// Guardado principal + sidecar best-effort. Un fallo del sidecar se
    /// registra y no invalida la versión escrita.
    pub fn save_with_metadata(&self,
                              base_path: &str,
                              data: &ArtifactData,
                              actor: &str,
                              reason: &str)
                              -> Result<SavedArtifact, PersistenceError> {
        let saved = self.save_new_version(base_path, data)?;
        if let Err(e) = self.write_sidecar(&saved, actor, reason) {
            error!("sidecar for {} could not be written: {e}", saved.filepath.display());
        }
        Ok(saved)
    }

    pub fn sidecar_path(artifact: &Path) -> PathBuf {
        artifact.with_extension("meta.json")
    }

    fn write_sidecar(&self, saved: &SavedArtifact, actor: &str, reason: &str) -> Result<(), PersistenceError> {
        let meta = SidecarMetadata { timestamp:   Utc::now().to_rfc3339(),
                                     version:     saved.version,
                                     sha256:      saved.sha256.clone(),
                                     actor:       actor.to_string(),
                                     reason:      reason.to_string(),
                                     source_file: saved.filepath
                                                       .file_name()
                                                       .map(|n| n.to_string_lossy().into_owned())
                                                       .unwrap_or_default() };
        let bytes = serde_json::to_vec_pretty(&meta)?;
        write_atomic(&self.tmp_dir(), &Self::sidecar_path(&saved.filepath), &bytes, true)
    }

    /// Versiones existentes de `base_path`, ascendentes. Sin sidecars.
    pub fn versions(&self, base_path: &str) -> Result<Vec<VersionEntry>, PersistenceError> {
        let (stem, ext) = split_existing(base_path)?;
        self.scan(&stem, &ext)
    }

    pub fn latest_version_path(&self, base_path: &str) -> Result<Option<PathBuf>, PersistenceError> {
        Ok(self.versions(base_path)?.pop().map(|e| e.path))
    }

    pub fn read_json(&self, path: &Path) -> Result<Value, PersistenceError> {
        let raw = fs::read_to_string(path).map_err(io_at(path))?;
        Ok(serde_json::from_str(&raw)?)
    }

    pub fn read_sidecar(&self, artifact: &Path) -> Result<Option<SidecarMetadata>, PersistenceError> {
        let path = Self::sidecar_path(artifact);
        if !path.exists() {
            return Ok(None);
        }
        let raw = fs::read_to_string(&path).map_err(io_at(&path))?;
        Ok(Some(serde_json::from_str(&raw)?))
    }

    /// JSON de la última versión, si existe.
    pub fn load_latest_json(&self, base_path: &str) -> Result<Option<Value>, PersistenceError> {
        match self.latest_version_path(base_path)? {
            Some(path) => self.read_json(&path).map(Some),
            None => Ok(None),
        }
    }
}

impl ArtifactSink for VersionedArtifactStore {
    fn save(&self, base_path: &str, data: ArtifactData, actor: Option<&str>, reason: Option<&str>)
            -> Result<SavedArtifact, ServiceError> {
        let saved = match (actor, reason) {
            (None, None) => self.save_new_version(base_path, &data)?,
            (actor, reason) => {
                self.save_with_metadata(base_path, &data, actor.unwrap_or("orchestrator"), reason.unwrap_or(""))?
            }
        };
        Ok(saved)
    }

    fn load_latest_json(&self, base_path: &str) -> Result<Option<Value>, ServiceError> {
        Ok(VersionedArtifactStore::load_latest_json(self, base_path)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn pattern_validation() {
        assert!(validate_pattern(DEFAULT_VERSION_PATTERN).is_ok());
        assert!(validate_pattern("rev_v{N}").is_ok());
        assert!(validate_pattern("{N}_x").is_err());
        assert!(validate_pattern("xv{N}").is_err());
        assert!(validate_pattern("v{N}_%Q").is_err());
        assert!(validate_pattern("v{N}/evil").is_err());
    }

    #[test]
    fn regex_matches_only_own_base() {
        let re = version_regex("kb", ".json").unwrap();
        let caps = re.captures("kb_v12_abcdef123456_20260101T000000Z.json").unwrap();
        assert_eq!(&caps[1], "12");
        assert!(re.is_match("kb_rev_v3.json"));
        assert!(!re.is_match("kb2_v1_abc.json"));
        assert!(!re.is_match("kb_v1_abc.txt"));
        assert!(!re.is_match(".kb.lock"));
    }

    #[test]
    fn logical_split_defaults() {
        let j = ArtifactData::Json(json!({}));
        assert_eq!(split_logical("knowledge/kb.json", &j).unwrap(), ("kb".into(), ".json".into()));
        assert_eq!(split_logical("listing", &j).unwrap(), ("listing".into(), ".json".into()));
        assert_eq!(split_logical("notes", &ArtifactData::Text("x".into())).unwrap(),
                   ("notes".into(), String::new()));
        assert!(split_logical("", &j).is_err());
    }

    #[test]
    fn scalar_json_is_rejected() {
        for v in [json!(null), json!(true), json!(3)] {
            assert!(matches!(payload_bytes(&ArtifactData::Json(v)), Err(PersistenceError::UnsupportedPayload(_))));
        }
        assert!(payload_bytes(&ArtifactData::Json(json!([1]))).is_ok());
    }
}
