use std::collections::HashSet;
use std::fs;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use listflow_core::hashing::sha256_hex;
use listflow_core::ArtifactData;
use listflow_persistence::{PersistenceError, VersionedArtifactStore};
use serde_json::json;

#[test]
fn versions_increase_monotonically_without_dedup() {
    let dir = tempfile::tempdir().unwrap();
    let store = VersionedArtifactStore::new(dir.path()).unwrap();
    let data = ArtifactData::Json(json!({"title": "Mug", "tags": ["a"]}));
    let first = store.save_new_version("listings/listing.json", &data).unwrap();
    let second = store.save_new_version("listings/listing.json", &data).unwrap();
    assert_eq!(first.version, 1);
    assert_eq!(second.version, 2);
    assert_eq!(first.sha256, second.sha256, "same content, same hash, new version anyway");
    assert_ne!(first.filepath, second.filepath);
    assert!(first.filepath.exists() && second.filepath.exists());
    assert!(first.filepath.starts_with(dir.path().join("ver")));

    let name = second.filepath.file_name().unwrap().to_string_lossy().into_owned();
    assert!(name.starts_with(&format!("listing_v2_{}_", &second.sha256[..12])), "{name}");
    assert!(name.ends_with("Z.json"), "{name}");
}

#[test]
fn json_is_canonicalized_before_hashing() {
    let dir = tempfile::tempdir().unwrap();
    let store = VersionedArtifactStore::new(dir.path()).unwrap();
    let a = store.save_new_version("doc", &ArtifactData::Json(json!({"b": 1, "a": 2}))).unwrap();
    let b = store.save_new_version("doc", &ArtifactData::Json(json!({"a": 2, "b": 1}))).unwrap();
    assert_eq!(a.sha256, b.sha256);
    let written = fs::read(&a.filepath).unwrap();
    assert_eq!(sha256_hex(&written), a.sha256);
    assert_eq!(store.read_json(&a.filepath).unwrap(), json!({"a": 2, "b": 1}));
}

#[test]
fn text_and_bytes_keep_the_logical_extension() {
    let dir = tempfile::tempdir().unwrap();
    let store = VersionedArtifactStore::with_pattern(dir.path(), "v{N}").unwrap();
    let t = store.save_new_version("notes/readme.md", &ArtifactData::Text("hello".into())).unwrap();
    assert_eq!(t.filepath.file_name().unwrap(), "readme_v1.md");
    let b = store.save_new_version("raw", &ArtifactData::Bytes(vec![0, 1, 2])).unwrap();
    assert_eq!(b.filepath.file_name().unwrap(), "raw_v1");
    assert_eq!(fs::read(&b.filepath).unwrap(), vec![0, 1, 2]);
}

#[test]
fn scalar_json_payload_is_a_type_error() {
    let dir = tempfile::tempdir().unwrap();
    let store = VersionedArtifactStore::new(dir.path()).unwrap();
    let err = store.save_new_version("x.json", &ArtifactData::Json(json!(42))).unwrap_err();
    assert!(matches!(err, PersistenceError::UnsupportedPayload(_)));
    assert!(store.latest_version_path("x.json").unwrap().is_none());
}

#[test]
fn latest_version_ignores_sidecars_and_other_bases() {
    let dir = tempfile::tempdir().unwrap();
    let store = VersionedArtifactStore::new(dir.path()).unwrap();
    let data = ArtifactData::Json(json!({"n": 1}));
    store.save_with_metadata("kb.json", &data, "tester", "first").unwrap();
    let last = store.save_with_metadata("kb.json", &data, "tester", "second").unwrap();
    store.save_new_version("kb2.json", &data).unwrap();
    assert_eq!(store.latest_version_path("kb.json").unwrap(), Some(last.filepath.clone()));
    assert_eq!(store.versions("kb.json").unwrap().len(), 2);

    let meta = store.read_sidecar(&last.filepath).unwrap().unwrap();
    assert_eq!(meta.version, 2);
    assert_eq!(meta.actor, "tester");
    assert_eq!(meta.reason, "second");
    assert_eq!(meta.sha256, last.sha256);
    assert_eq!(meta.source_file, last.filepath.file_name().unwrap().to_string_lossy());
}

#[test]
fn sidecar_failure_keeps_the_artifact() {
    let dir = tempfile::tempdir().unwrap();
    let store = VersionedArtifactStore::with_pattern(dir.path(), "v{N}").unwrap();
    // Un directorio en la ruta del sidecar hace fallar su rename.
    fs::create_dir_all(dir.path().join("ver/kb_v1.meta.json")).unwrap();
    let saved = store.save_with_metadata("kb.json", &ArtifactData::Json(json!({"ok": true})), "a", "r").unwrap();
    assert_eq!(saved.version, 1);
    assert!(saved.filepath.exists());
}

#[test]
fn tmp_dir_is_left_clean() {
    let dir = tempfile::tempdir().unwrap();
    let store = VersionedArtifactStore::new(dir.path()).unwrap();
    for _ in 0..3 {
        store.save_new_version("a.json", &ArtifactData::Json(json!([1, 2]))).unwrap();
    }
    assert_eq!(fs::read_dir(store.tmp_dir()).unwrap().count(), 0);
    assert!(!dir.path().join("ver/.a.lock").exists());
}

#[test]
fn concurrent_writers_get_distinct_versions() {
    let dir = tempfile::tempdir().unwrap();
    let store = Arc::new(VersionedArtifactStore::new(dir.path()).unwrap());
    let handles: Vec<_> = (0..8).map(|i| {
                                    let store = Arc::clone(&store);
                                    thread::spawn(move || {
                                        store.save_new_version("shared.json", &ArtifactData::Json(json!({"writer": i})))
                                             .unwrap()
                                             .version
                                    })
                                })
                                .collect();
    let versions: HashSet<u64> = handles.into_iter().map(|h| h.join().unwrap()).collect();
    assert_eq!(versions, (1..=8).collect::<HashSet<u64>>());
}

#[test]
fn held_lock_reports_busy() {
    let dir = tempfile::tempdir().unwrap();
    let store = VersionedArtifactStore::new(dir.path()).unwrap().with_lock_wait(Duration::from_millis(60));
    fs::create_dir_all(store.ver_dir()).unwrap();
    fs::write(store.ver_dir().join(".locked.lock"), "999").unwrap();
    let err = store.save_new_version("locked.json", &ArtifactData::Json(json!({}))).unwrap_err();
    assert!(matches!(err, PersistenceError::LockBusy(_)));
    assert!(err.is_retryable());
}

#[test]
fn invalid_patterns_fail_at_construction() {
    let dir = tempfile::tempdir().unwrap();
    assert!(matches!(VersionedArtifactStore::with_pattern(dir.path(), "{sha12}"),
                     Err(PersistenceError::InvalidPattern { .. })));
}

#[test]
fn crash_leftovers_do_not_count_as_versions() {
    let dir = tempfile::tempdir().unwrap();
    let store = VersionedArtifactStore::new(dir.path()).unwrap();
    let data = ArtifactData::Json(json!({"k": 1}));
    let first = store.save_new_version("kb.json", &data).unwrap();

    // restos de una escritura interrumpida: temp a medio escribir y basura en ver/
    fs::write(store.tmp_dir().join(".tmpA1b2C3"), b"{\"k\": ").unwrap();
    fs::write(store.ver_dir().join("kb_v7.json.tmp"), b"{\"k\"").unwrap();
    fs::write(store.ver_dir().join("notes.txt"), b"scratch").unwrap();
    fs::write(store.ver_dir().join("kb_v9_draft.txt"), b"scratch").unwrap();

    let versions = store.versions("kb.json").unwrap();
    assert_eq!(versions.iter().map(|v| v.version).collect::<Vec<_>>(), vec![1]);
    assert_eq!(store.latest_version_path("kb.json").unwrap(), Some(first.filepath.clone()));
    assert_eq!(store.load_latest_json("kb.json").unwrap(), Some(json!({"k": 1})));

    let next = store.save_new_version("kb.json", &data).unwrap();
    assert_eq!(next.version, 2);
    assert_eq!(store.latest_version_path("kb.json").unwrap(), Some(next.filepath));
}

#[test]
fn unwritable_layout_is_an_io_error() {
    let dir = tempfile::tempdir().unwrap();
    let data = ArtifactData::Json(json!({"k": 1}));

    // base_dir es un archivo regular
    let blocker = dir.path().join("not_a_dir");
    fs::write(&blocker, b"").unwrap();
    let store = VersionedArtifactStore::new(&blocker).unwrap();
    let err = store.save_new_version("kb.json", &data).unwrap_err();
    assert!(matches!(err, PersistenceError::Io { .. }), "{err}");
    assert!(!err.is_retryable());

    // ver/ ocupado por un archivo
    let base = dir.path().join("store");
    fs::create_dir_all(&base).unwrap();
    fs::write(base.join("ver"), b"").unwrap();
    let store = VersionedArtifactStore::new(&base).unwrap();
    match store.save_new_version("kb.json", &data).unwrap_err() {
        PersistenceError::Io { path, .. } => assert_eq!(path, base.join("ver")),
        other => panic!("unexpected error {other}"),
    }
    assert!(!base.join("tmp").exists());
}
