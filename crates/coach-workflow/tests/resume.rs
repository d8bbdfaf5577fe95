use coach_domain::{FeatureKind, PlayerProfile, Position, StickRecommendation};
use coach_persistence::{FsStorage, StorageConfig};
use coach_workflow::{CoachServices, FeatureSession, SessionStep, SnapshotPolicy, WorkflowConfig, WorkflowError};
use flow::{MediaKind, PipelineResult, ScriptedAnalysisService, SnapshotStore, StaticAccessProvider};
use serde_json::json;
use std::sync::Arc;

fn disk_services(root: &std::path::Path, analysis: Arc<ScriptedAnalysisService>) -> CoachServices {
  let storage = FsStorage::new(&StorageConfig::new(root));
  let config = WorkflowConfig { snapshot_policy: SnapshotPolicy::OnDismiss,
                                ..WorkflowConfig::default() };
  CoachServices::new(config,
                     analysis,
                     Arc::new(StaticAccessProvider::granting()),
                     storage.media,
                     storage.snapshots)
}

fn profile() -> PlayerProfile {
  PlayerProfile::new(178.0, 76.0, Position::Defense).expect("perfil")
}

#[tokio::test]
async fn stick_analyzer_resumes_from_disk_snapshot() -> Result<(), WorkflowError> {
  let dir = tempfile::tempdir().expect("tempdir");
  let analysis = Arc::new(ScriptedAnalysisService::new());
  let svc = disk_services(dir.path(), analysis.clone());

  let mut session = FeatureSession::open(FeatureKind::StickAnalyzer, svc.clone(), None)?;
  assert_eq!(session.current_stage_id(), Some("profile"));
  assert!(matches!(session.proceed()?, SessionStep::Rejected { .. }));
  session.set_profile(&profile())?;
  assert_eq!(session.proceed()?, SessionStep::Moved { stage: "capture".into() });
  session.capture(b"jpg", "grip.jpg", MediaKind::Image).await?;
  assert_eq!(session.dismiss()?, None);
  assert!(svc.snapshots.load("stick_analyzer")?.is_some());

  // otro proceso: servicios nuevos sobre la misma carpeta
  let svc = disk_services(dir.path(), analysis.clone());
  let mut resumed = FeatureSession::open(FeatureKind::StickAnalyzer, svc.clone(), None)?;
  assert_eq!(resumed.current_stage_id(), Some("capture"));
  assert!(resumed.go_back());
  assert_eq!(resumed.current_stage_id(), Some("profile"));
  assert_eq!(resumed.proceed()?, SessionStep::Moved { stage: "capture".into() });

  analysis.queue_analysis(vec![PipelineResult::Success(json!({
    "flex": 85, "curve": "mid", "lie": 5, "length_in": 58.0, "rationale": "Defensa alto: más flex y palo largo"
  }))]);
  let SessionStep::Gated { trigger_id, .. } = resumed.proceed()? else {
    panic!("se esperaba el gate");
  };
  resumed.request_access(trigger_id).await?;
  assert_eq!(resumed.await_result().await?, SessionStep::Delivered { success: true });
  let stick: StickRecommendation = resumed.decode_result()?.expect("recomendación");
  assert_eq!(stick.flex, 85);
  assert!(analysis.saw_kind("stick_analyzer"));
  // entregado el resultado el snapshot ya no sirve
  assert!(svc.snapshots.load("stick_analyzer")?.is_none());
  Ok(())
}

#[tokio::test]
async fn snapshot_with_missing_media_is_discarded() -> Result<(), WorkflowError> {
  let dir = tempfile::tempdir().expect("tempdir");
  let svc = disk_services(dir.path(), Arc::new(ScriptedAnalysisService::new()));

  let mut session = FeatureSession::open(FeatureKind::StickAnalyzer, svc.clone(), None)?;
  session.set_profile(&profile())?;
  session.proceed()?;
  let path = session.capture(b"jpg", "grip.jpg", MediaKind::Image).await?;
  session.dismiss()?;

  std::fs::remove_file(&path).expect("borrar media");
  let fresh = FeatureSession::open(FeatureKind::StickAnalyzer, svc.clone(), None)?;
  assert_eq!(fresh.current_stage_id(), Some("profile"));
  assert!(svc.snapshots.load("stick_analyzer")?.is_none());
  Ok(())
}

#[tokio::test]
async fn snapshot_taken_during_analysis_resumes_at_capture_when_task_is_gone() -> Result<(), WorkflowError> {
  let dir = tempfile::tempdir().expect("tempdir");
  let analysis = Arc::new(ScriptedAnalysisService::new().hold_validation());
  let svc = disk_services(dir.path(), analysis.clone());

  let mut session = FeatureSession::open(FeatureKind::StickAnalyzer, svc.clone(), None)?;
  session.set_profile(&profile())?;
  session.proceed()?;
  session.capture(b"jpg", "grip.jpg", MediaKind::Image).await?;
  let SessionStep::Gated { trigger_id, .. } = session.proceed()? else {
    panic!("se esperaba el gate");
  };
  session.request_access(trigger_id).await?;
  assert!(session.dismiss()?.is_some());

  // reinicio del proceso: el registro nuevo no conoce la tarea anterior
  let svc = disk_services(dir.path(), analysis);
  let resumed = FeatureSession::open(FeatureKind::StickAnalyzer, svc, None)?;
  assert_eq!(resumed.current_stage_id(), Some("capture"));
  assert!(resumed.active_task().is_none());
  Ok(())
}

#[tokio::test]
async fn invalid_profile_fails_before_spawning() -> Result<(), WorkflowError> {
  let dir = tempfile::tempdir().expect("tempdir");
  let svc = disk_services(dir.path(), Arc::new(ScriptedAnalysisService::new()));
  let mut session = FeatureSession::open(FeatureKind::StickAnalyzer, svc.clone(), None)?;
  session.set_input("height_cm", flow::FlowValue::Number(40.0));
  session.set_input("weight_kg", flow::FlowValue::Number(70.0));
  session.set_input("position", flow::FlowValue::Choice("forward".into()));
  assert_eq!(session.proceed()?, SessionStep::Moved { stage: "capture".into() });
  session.capture(b"jpg", "grip.jpg", MediaKind::Image).await?;
  let SessionStep::Gated { trigger_id, .. } = session.proceed()? else {
    panic!("se esperaba el gate");
  };
  assert!(matches!(session.request_access(trigger_id).await, Err(WorkflowError::Domain(_))));
  assert_eq!(session.current_stage_id(), Some("capture"));
  assert!(svc.registry.is_empty());
  Ok(())
}
