// ai_coach.rs
//
// AI Coach: foco de la sesión -> dos videos (frontal y lateral) -> informe.
use super::{gate_on_analysis, STAGE_CAPTURE, STAGE_PROCESSING, STAGE_RESULTS};
use crate::WorkflowError;
use coach_domain::{AnalysisKind, FeatureKind};
use flow::{FlowContext, FlowDefinition, FlowKey, MediaKind, Result, SelectionOption, Stage, StageCatalog};
use once_cell::sync::Lazy;
use serde_json::{json, Value as JsonValue};

pub const STAGE_FOCUS: &str = "focus";

static FOCUS_OPTIONS: Lazy<Vec<SelectionOption>> = Lazy::new(|| {
  vec![SelectionOption::new("skating", "Patinaje").with_icon("figure.skating"),
       SelectionOption::new("shooting", "Tiro").with_icon("target"),
       SelectionOption::new("stickhandling", "Manejo de stick").with_icon("hockey.puck")]
});

pub(crate) fn analysis_kind(ctx: &FlowContext) -> AnalysisKind {
  AnalysisKind::new(FeatureKind::AiCoach, ctx.choice(&FlowKey::stage(STAGE_FOCUS)))
}

pub(crate) fn request_context(ctx: &FlowContext) -> std::result::Result<JsonValue, WorkflowError> {
  let focus = ctx.choice(&FlowKey::stage(STAGE_FOCUS))
                 .ok_or_else(|| WorkflowError::Validation("no hay foco elegido".into()))?;
  Ok(json!({ "focus": focus, "angles": ["front", "side"] }))
}

pub struct AiCoachFlow {
  catalog: StageCatalog,
}

impl AiCoachFlow {
  pub fn new() -> Result<Self> {
    let stages = vec![Stage::selection(STAGE_FOCUS, "¿Qué quieres mejorar?", FOCUS_OPTIONS.clone()),
                      Stage::media_capture(STAGE_CAPTURE,
                                           "Graba dos ángulos",
                                           vec![MediaKind::Video],
                                           2,
                                           2,
                                           "Primero de frente, luego de lado"),
                      Stage::processing(STAGE_PROCESSING, "Tu coach está mirando", "Analizando ambos ángulos"),
                      Stage::results(STAGE_RESULTS, "Informe del coach")];
    Ok(Self { catalog: StageCatalog::new(stages)? })
  }
}

impl FlowDefinition for AiCoachFlow {
  fn name(&self) -> &str {
    FeatureKind::AiCoach.as_str()
  }

  fn catalog(&self) -> &StageCatalog {
    &self.catalog
  }

  fn gated_capability(&self, from: &Stage, to: &Stage) -> Option<&str> {
    gate_on_analysis(FeatureKind::AiCoach, from, to)
  }
}
