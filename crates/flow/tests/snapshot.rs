use flow::{FlowKey, FlowSnapshot, FlowState, FlowValue, InMemoryMediaStore, InMemorySnapshotStore, LinearFlow,
           MediaKind, MediaReference, MediaStore, PipelineResult, SelectionOption, SnapshotStore, Stage};
use serde_json::json;
use std::path::PathBuf;
use std::sync::Arc;

fn definition(name: &str) -> Arc<LinearFlow> {
  Arc::new(LinearFlow::new(name,
                           vec![Stage::selection("type", "Tipo", vec![SelectionOption::new("wrist", "Muñeca")]),
                                Stage::media_capture("capture", "Graba", vec![MediaKind::Image], 1, 2, ""),
                                Stage::processing("processing", "Analizando", "..."),
                                Stage::results("results", "Resultado")]).expect("def"))
}

#[tokio::test]
async fn snapshot_roundtrip_with_media() {
  let media = InMemoryMediaStore::new();
  let path = media.save_media(&[1, 2, 3], "front", "shot_rater").await.expect("save");
  assert!(media.media_file_exists(&path));

  let mut state = FlowState::new(definition("shots"));
  state.start();
  state.set_data(FlowKey::stage("type"), FlowValue::Choice("wrist".into()));
  state.proceed();
  state.set_data(FlowKey::stage("capture"),
                 FlowValue::Media(vec![MediaReference::new(path.clone(), MediaKind::Image)]));
  state.store_result(PipelineResult::Success(json!({})));
  state.set_data(FlowKey::MediaValidated, FlowValue::Flag(true));

  let snap = FlowSnapshot::capture("shot_rater:wrist", &state).expect("capture");
  assert_eq!(snap.current_stage_id, "capture");
  assert_eq!(snap.media_paths, vec![path.clone()]);
  assert!(snap.inputs.iter().all(|(k, _)| *k != FlowKey::PipelineResult && *k != FlowKey::MediaValidated));
  assert!(snap.is_valid(&media));

  let store = InMemorySnapshotStore::new();
  store.save(&snap).expect("save snap");
  let loaded = store.load("shot_rater:wrist").expect("load").expect("presente");
  let restored = loaded.restore(definition("shots"), &media).expect("rehidratado");
  assert_eq!(restored.current_stage_id(), Some("capture"));
  assert_eq!(restored.context().choice(&FlowKey::stage("type")), Some("wrist"));
  assert!(restored.context().outcome().is_none());

  store.clear("shot_rater:wrist").expect("clear");
  assert!(store.load("shot_rater:wrist").expect("load").is_none());
}

#[test]
fn snapshot_without_media_is_valid() {
  let media = InMemoryMediaStore::new();
  let mut state = FlowState::new(definition("shots"));
  state.start();
  let snap = FlowSnapshot::capture("k", &state).expect("capture");
  assert!(snap.media_paths.is_empty());
  assert!(snap.is_valid(&media));
}

#[test]
fn missing_media_invalidates_and_discards() {
  let media = InMemoryMediaStore::new();
  let kept = PathBuf::from("memory://shot_rater/a");
  let lost = PathBuf::from("memory://shot_rater/b");
  media.insert(kept.clone(), vec![0]);
  media.insert(lost.clone(), vec![0]);

  let mut state = FlowState::new(definition("shots"));
  state.jump_to("processing").expect("jump");
  state.set_data(FlowKey::stage("capture"),
                 FlowValue::Media(vec![MediaReference::new(kept, MediaKind::Image),
                                       MediaReference::new(lost.clone(), MediaKind::Image)]));
  let snap = FlowSnapshot::capture("k", &state).expect("capture");
  assert!(snap.is_valid(&media));

  assert!(media.delete(&lost));
  assert!(!snap.is_valid(&media));
  assert!(snap.restore(definition("shots"), &media).is_none());
}

#[test]
fn unstarted_flow_has_no_snapshot() {
  let state = FlowState::new(definition("shots"));
  assert!(FlowSnapshot::capture("k", &state).is_none());
}

#[test]
fn snapshot_for_other_flow_or_stage_is_discarded() {
  let media = InMemoryMediaStore::new();
  let mut state = FlowState::new(definition("shots"));
  state.start();
  let snap = FlowSnapshot::capture("k", &state).expect("capture");
  assert!(snap.clone().restore(definition("other"), &media).is_none());

  let mut bad = snap;
  bad.current_stage_id = "gone".into();
  assert!(bad.restore(definition("shots"), &media).is_none());
}

#[test]
fn snapshot_serializes_as_json() {
  let mut state = FlowState::new(definition("shots"));
  state.start();
  state.set_data(FlowKey::input("notes"), FlowValue::Text("zurdo".into()));
  let snap = FlowSnapshot::capture("k", &state).expect("capture");
  let text = serde_json::to_string(&snap).expect("json");
  let back: FlowSnapshot = serde_json::from_str(&text).expect("parse");
  assert_eq!(back, snap);
}
