// shot_rater.rs
//
// Shot Rater: tipo de tiro -> video -> análisis -> puntuación. Si la sesión
// se abre con un tipo de tiro preseleccionado, el stage de selección se
// salta en ambos sentidos y la preselección sobrevive a `restart`.
use super::{gate_on_analysis, STAGE_CAPTURE, STAGE_PROCESSING, STAGE_RESULTS};
use crate::WorkflowError;
use coach_domain::{AnalysisKind, FeatureKind, ShotType};
use flow::{FlowContext, FlowDefinition, FlowKey, MediaKind, Result, SelectionOption, Stage, StageCatalog};
use once_cell::sync::Lazy;
use serde_json::{json, Value as JsonValue};

pub const STAGE_SHOT_TYPE: &str = "shot_type";

static SHOT_OPTIONS: Lazy<Vec<SelectionOption>> = Lazy::new(|| {
  ShotType::ALL.iter()
               .map(|t| SelectionOption::new(t.id(), t.title()).with_subtitle(t.subtitle()))
               .collect()
});

/// Clave de la preselección que llega desde fuera del flujo.
pub fn preselection_key() -> FlowKey {
  FlowKey::pre_selection(STAGE_SHOT_TYPE)
}

/// Tipo de tiro vigente: el elegido en el stage o, si no, el preseleccionado.
pub fn selected_shot(ctx: &FlowContext) -> Option<ShotType> {
  ctx.choice(&FlowKey::stage(STAGE_SHOT_TYPE))
     .or_else(|| ctx.choice(&preselection_key()))
     .and_then(|id| id.parse().ok())
}

pub(crate) fn analysis_kind(ctx: &FlowContext) -> AnalysisKind {
  AnalysisKind::new(FeatureKind::ShotRater, selected_shot(ctx).map(|t| t.id()))
}

pub(crate) fn request_context(ctx: &FlowContext) -> std::result::Result<JsonValue, WorkflowError> {
  let shot = selected_shot(ctx).ok_or_else(|| WorkflowError::Validation("no hay tipo de tiro elegido".into()))?;
  Ok(json!({ "shot_type": shot.id(), "shot_title": shot.title() }))
}

pub struct ShotRaterFlow {
  catalog: StageCatalog,
  retained: Vec<FlowKey>,
}

impl ShotRaterFlow {
  pub fn new() -> Result<Self> {
    let stages = vec![Stage::selection(STAGE_SHOT_TYPE, "¿Qué tiro vas a grabar?", SHOT_OPTIONS.clone()),
                      Stage::media_capture(STAGE_CAPTURE,
                                           "Graba tu tiro",
                                           vec![MediaKind::Video],
                                           1,
                                           1,
                                           "Cámara fija, de lado, con el disco visible"),
                      Stage::processing(STAGE_PROCESSING, "Analizando tu tiro", "Esto tarda unos segundos"),
                      Stage::results(STAGE_RESULTS, "Tu puntuación")];
    Ok(Self { catalog: StageCatalog::new(stages)?,
              retained: vec![preselection_key()] })
  }

  fn preselected(ctx: &FlowContext) -> bool {
    ctx.choice(&preselection_key()).is_some()
  }
}

impl FlowDefinition for ShotRaterFlow {
  fn name(&self) -> &str {
    FeatureKind::ShotRater.as_str()
  }

  fn catalog(&self) -> &StageCatalog {
    &self.catalog
  }

  fn retained_keys(&self) -> &[FlowKey] {
    &self.retained
  }

  fn gated_capability(&self, from: &Stage, to: &Stage) -> Option<&str> {
    gate_on_analysis(FeatureKind::ShotRater, from, to)
  }

  fn next_stage(&self, current: Option<&str>, ctx: &FlowContext) -> Option<&Stage> {
    match current {
      None if Self::preselected(ctx) => self.stage(STAGE_CAPTURE),
      None => self.first_stage(),
      Some(id) => self.index_of(id).and_then(|i| self.catalog.at(i + 1)),
    }
  }

  fn previous_stage(&self, current: &str, ctx: &FlowContext) -> Option<&Stage> {
    if current == STAGE_CAPTURE && Self::preselected(ctx) {
      return None;
    }
    self.index_of(current).and_then(|i| i.checked_sub(1)).and_then(|i| self.catalog.at(i))
  }
}
