use coach_domain::{FeatureKind, ShotAnalysis};
use coach_workflow::{CoachServices, FlowFactory, SessionStep, WorkflowConfig, WorkflowError};
use flow::{InMemoryMediaStore, InMemorySnapshotStore, MediaKind, PipelineError, PipelineResult,
           ScriptedAnalysisService, StaticAccessProvider};
use serde_json::json;
use std::sync::Arc;

// Shot Rater con tipo de tiro preseleccionado: el primer análisis falla por
// red y el reintento reusa la media ya validada.
#[tokio::main]
async fn main() -> Result<(), WorkflowError> {
    let analysis = Arc::new(ScriptedAnalysisService::new());
    analysis.queue_analysis(vec![PipelineResult::Failure(PipelineError::NetworkIssue("timeout".into())),
                                 PipelineResult::Success(json!({
                                     "shot_type": "snap", "overall_score": 74, "technique": 70,
                                     "power": 77, "accuracy": 75, "tips": ["Suelta antes el disco"]
                                 }))]);
    let services = CoachServices::new(WorkflowConfig::default(),
                                      analysis.clone(),
                                      Arc::new(StaticAccessProvider::granting()),
                                      Arc::new(InMemoryMediaStore::new()),
                                      Arc::new(InMemorySnapshotStore::new()));

    let mut session = FlowFactory::open(FeatureKind::ShotRater, services, Some("snap"))?;
    println!("empieza en {:?}", session.current_stage_id());
    session.capture(b"mp4", "snap.mp4", MediaKind::Video).await?;

    let SessionStep::Gated { trigger_id, capability } = session.proceed()? else {
        return Err(WorkflowError::Other("se esperaba el gate de pago".into()));
    };
    println!("gate {} ({})", trigger_id, capability);
    println!("{:?}", session.request_access(trigger_id).await?);
    println!("{:?}", session.await_result().await?);
    if let Some(PipelineResult::Failure(e)) = session.result() {
        println!("fallo: {} -> {:?}", e, e.recovery_actions());
    }

    println!("{:?}", session.retry()?);
    println!("{:?}", session.await_result().await?);
    let rating: Option<ShotAnalysis> = session.decode_result()?;
    println!("valoración: {:?}", rating);
    println!("validaciones: {}, análisis: {}", analysis.validate_calls(), analysis.analyze_calls());
    Ok(())
}
