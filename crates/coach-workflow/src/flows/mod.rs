//! Definiciones concretas de las features. Cada una declara sus stages, las
//! claves que sobreviven a un reinicio y la capacidad de pago que protege la
//! entrada al análisis.

pub mod ai_coach;
pub mod shot_rater;
pub mod stick_analyzer;

pub use ai_coach::AiCoachFlow;
pub use shot_rater::ShotRaterFlow;
pub use stick_analyzer::StickAnalyzerFlow;

use crate::WorkflowError;
use coach_domain::{AnalysisKind, FeatureKind};
use flow::{AnalysisRequest, FlowContext, FlowKey, MediaReference, Stage};
use serde_json::Value as JsonValue;

pub const STAGE_CAPTURE: &str = "capture";
pub const STAGE_PROCESSING: &str = "processing";
pub const STAGE_RESULTS: &str = "results";

/// La transición captura -> procesamiento es la que cuesta una llamada a la
/// IA; ahí se cobra.
pub(crate) fn gate_on_analysis(feature: FeatureKind, from: &Stage, to: &Stage) -> Option<&'static str> {
  if from.is_media_capture() && to.is_processing() {
    Some(feature.capability())
  } else {
    None
  }
}

/// Media capturada en el stage de captura.
pub(crate) fn captured_media(ctx: &FlowContext) -> Vec<MediaReference> {
  ctx.media(&FlowKey::stage(STAGE_CAPTURE)).map(|m| m.to_vec()).unwrap_or_default()
}

/// Clave de registro para la sesión de `feature` con los datos actuales.
pub fn analysis_kind(feature: FeatureKind, ctx: &FlowContext) -> AnalysisKind {
  match feature {
    FeatureKind::ShotRater => shot_rater::analysis_kind(ctx),
    FeatureKind::StickAnalyzer => AnalysisKind::new(feature, None),
    FeatureKind::AiCoach => ai_coach::analysis_kind(ctx),
  }
}

/// Arma la petición al colaborador de IA a partir del data bag.
pub fn build_request(feature: FeatureKind, ctx: &FlowContext) -> Result<AnalysisRequest, WorkflowError> {
  let context: JsonValue = match feature {
    FeatureKind::ShotRater => shot_rater::request_context(ctx)?,
    FeatureKind::StickAnalyzer => stick_analyzer::request_context(ctx)?,
    FeatureKind::AiCoach => ai_coach::request_context(ctx)?,
  };
  Ok(AnalysisRequest { kind: analysis_kind(feature, ctx).key(),
                       media: captured_media(ctx),
                       context })
}
