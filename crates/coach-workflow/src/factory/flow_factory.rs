use crate::flows::{shot_rater, AiCoachFlow, ShotRaterFlow, StickAnalyzerFlow};
use crate::session::FeatureSession;
use crate::{CoachServices, WorkflowError};
use coach_domain::{FeatureKind, ShotType};
use flow::{FlowContext, FlowDefinition, FlowValue};
use std::sync::Arc;

/// Fábrica de definiciones y sesiones por `FeatureKind`.
///
/// Las definiciones no guardan estado, así que cada llamada construye una
/// nueva; el estado vive en la `FlowState` de la sesión.
pub struct FlowFactory;

impl FlowFactory {
  pub fn definition(feature: FeatureKind) -> Result<Arc<dyn FlowDefinition>, WorkflowError> {
    let definition: Arc<dyn FlowDefinition> = match feature {
      FeatureKind::ShotRater => Arc::new(ShotRaterFlow::new()?),
      FeatureKind::StickAnalyzer => Arc::new(StickAnalyzerFlow::new()?),
      FeatureKind::AiCoach => Arc::new(AiCoachFlow::new()?),
    };
    Ok(definition)
  }

  /// Data bag inicial. Sólo el Shot Rater admite preselección (el tipo de
  /// tiro elegido desde otra pantalla).
  pub fn initial_context(feature: FeatureKind, preselection: Option<&str>) -> Result<FlowContext, WorkflowError> {
    let mut ctx = FlowContext::new();
    match (feature, preselection) {
      (_, None) => {}
      (FeatureKind::ShotRater, Some(raw)) => {
        let shot: ShotType = raw.parse()?;
        ctx.set(shot_rater::preselection_key(), FlowValue::Choice(shot.id().to_string()));
      }
      (other, Some(raw)) => {
        return Err(WorkflowError::Validation(format!("{} no admite preselección ('{}')", other, raw)));
      }
    }
    Ok(ctx)
  }

  /// Abre una sesión (reanudando snapshot o tarea en vuelo si los hay).
  pub fn open(feature: FeatureKind,
              services: CoachServices,
              preselection: Option<&str>)
              -> Result<FeatureSession, WorkflowError> {
    FeatureSession::open(feature, services, preselection)
  }
}
