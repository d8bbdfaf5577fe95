use coach_persistence::{FsMediaStore, FsSnapshotStore, FsStorage, StorageConfig};
use flow::{FlowKey, FlowSnapshot, FlowState, FlowValue, LinearFlow, MediaKind, MediaReference, MediaStore,
           SnapshotStore, Stage};
use std::sync::Arc;

fn definition() -> Arc<LinearFlow> {
  Arc::new(LinearFlow::new("coach",
                           vec![Stage::media_capture("capture", "Graba", vec![MediaKind::Video], 1, 2, ""),
                                Stage::processing("processing", "Analizando", "..."),
                                Stage::results("results", "Resultado")]).expect("def"))
}

#[tokio::test]
async fn media_is_written_under_flow_type() {
  let dir = tempfile::tempdir().expect("tempdir");
  let store = FsMediaStore::new(dir.path());
  let path = store.save_media(b"frames", "front.mp4", "ai_coach").await.expect("save");
  assert_eq!(path, dir.path().join("ai_coach").join("front.mp4"));
  assert!(store.media_file_exists(&path));
  assert_eq!(std::fs::read(&path).expect("read"), b"frames");

  assert!(store.remove(&path).await.expect("remove"));
  assert!(!store.media_file_exists(&path));
  assert!(!store.remove(&path).await.expect("remove twice"));
}

#[tokio::test]
async fn media_rejects_path_like_identifiers() {
  let dir = tempfile::tempdir().expect("tempdir");
  let store = FsMediaStore::new(dir.path());
  assert!(store.save_media(b"x", "../fuera", "ai_coach").await.is_err());
  assert!(store.save_media(b"x", "", "ai_coach").await.is_err());
  assert!(store.save_media(b"x", "ok", "..").await.is_err());
}

#[tokio::test]
async fn snapshot_survives_a_new_store_instance() {
  let dir = tempfile::tempdir().expect("tempdir");
  let storage = FsStorage::new(&StorageConfig::new(dir.path()));
  let path = storage.media.save_media(b"v", "side.mp4", "ai_coach").await.expect("save");

  let mut state = FlowState::new(definition());
  state.start();
  state.set_data(FlowKey::stage("capture"), FlowValue::Media(vec![MediaReference::new(path, MediaKind::Video)]));
  let snap = FlowSnapshot::capture("ai_coach", &state).expect("capture");
  storage.snapshots.save(&snap).expect("save snap");
  assert!(dir.path().join("snapshots").join("ai_coach.json").is_file());

  // otra instancia sobre la misma raíz, como tras reiniciar el proceso
  let reopened = FsSnapshotStore::new(dir.path().join("snapshots"));
  let loaded = reopened.load("ai_coach").expect("load").expect("presente");
  assert_eq!(loaded, snap);
  let restored = loaded.restore(definition(), storage.media.as_ref()).expect("restore");
  assert_eq!(restored.current_stage_id(), Some("capture"));
}

#[test]
fn snapshot_kind_with_variant_maps_to_safe_file() {
  let dir = tempfile::tempdir().expect("tempdir");
  let store = FsSnapshotStore::new(dir.path());
  let mut state = FlowState::new(definition());
  state.start();
  let snap = FlowSnapshot::capture("shot_rater:wrist", &state).expect("capture");
  store.save(&snap).expect("save");
  assert!(dir.path().join("shot_rater_wrist.json").is_file());
  assert!(store.load("shot_rater:wrist").expect("load").is_some());
}

#[test]
fn corrupt_or_missing_snapshot_loads_as_none() {
  let dir = tempfile::tempdir().expect("tempdir");
  let store = FsSnapshotStore::new(dir.path());
  assert!(store.load("ai_coach").expect("load").is_none());
  store.clear("ai_coach").expect("clear inexistente");

  std::fs::write(dir.path().join("ai_coach.json"), b"{no es json").expect("write");
  assert!(store.load("ai_coach").expect("load").is_none());
  assert!(!dir.path().join("ai_coach.json").exists());
}

#[test]
fn config_defaults_and_layout() {
  let config = StorageConfig::default();
  assert_eq!(config.root(), std::path::Path::new(coach_persistence::DEFAULT_STORAGE_DIR));
  let custom = StorageConfig::new("/tmp/coach");
  assert_eq!(custom.media_dir(), std::path::PathBuf::from("/tmp/coach/media"));
  assert_eq!(custom.snapshot_dir(), std::path::PathBuf::from("/tmp/coach/snapshots"));
}
