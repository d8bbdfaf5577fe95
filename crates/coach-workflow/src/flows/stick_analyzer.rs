// stick_analyzer.rs
//
// Stick Analyzer: perfil del jugador -> fotos de agarre -> recomendación de
// stick. El perfil es un stage custom cuya validación exige las tres claves
// de entrada.
use super::{gate_on_analysis, STAGE_CAPTURE, STAGE_PROCESSING, STAGE_RESULTS};
use crate::WorkflowError;
use coach_domain::{FeatureKind, PlayerProfile, Position};
use flow::{FlowContext, FlowDefinition, FlowKey, FlowState, FlowValue, MediaKind, Result, Stage, StageCatalog};
use serde_json::Value as JsonValue;

pub const STAGE_PROFILE: &str = "profile";
pub const INPUT_HEIGHT: &str = "height_cm";
pub const INPUT_WEIGHT: &str = "weight_kg";
pub const INPUT_POSITION: &str = "position";

/// Vuelca el perfil en el data bag con las claves que exige el stage.
pub fn store_profile(state: &mut FlowState, profile: &PlayerProfile) {
  state.set_data(FlowKey::input(INPUT_HEIGHT), FlowValue::Number(profile.height_cm));
  state.set_data(FlowKey::input(INPUT_WEIGHT), FlowValue::Number(profile.weight_kg));
  state.set_data(FlowKey::input(INPUT_POSITION), FlowValue::Choice(profile.position.as_str().to_string()));
}

/// Reconstruye y valida el perfil desde el data bag.
pub fn profile_from(ctx: &FlowContext) -> std::result::Result<PlayerProfile, WorkflowError> {
  let missing = |name: &str| WorkflowError::Validation(format!("falta {} en el perfil", name));
  let height = ctx.number(&FlowKey::input(INPUT_HEIGHT)).ok_or_else(|| missing(INPUT_HEIGHT))?;
  let weight = ctx.number(&FlowKey::input(INPUT_WEIGHT)).ok_or_else(|| missing(INPUT_WEIGHT))?;
  let position: Position = ctx.choice(&FlowKey::input(INPUT_POSITION))
                              .ok_or_else(|| missing(INPUT_POSITION))?
                              .parse()?;
  Ok(PlayerProfile::new(height, weight, position)?)
}

pub(crate) fn request_context(ctx: &FlowContext) -> std::result::Result<JsonValue, WorkflowError> {
  Ok(serde_json::to_value(profile_from(ctx)?)?)
}

pub struct StickAnalyzerFlow {
  catalog: StageCatalog,
}

impl StickAnalyzerFlow {
  pub fn new() -> Result<Self> {
    let required = vec![FlowKey::input(INPUT_HEIGHT), FlowKey::input(INPUT_WEIGHT), FlowKey::input(INPUT_POSITION)];
    let stages = vec![Stage::custom(STAGE_PROFILE, "Tu perfil", "player_profile", required)
                        .with_subtitle("Altura, peso y posición"),
                      Stage::media_capture(STAGE_CAPTURE,
                                           "Fotos de tu agarre",
                                           vec![MediaKind::Image],
                                           1,
                                           2,
                                           "Una foto de frente y otra de perfil sujetando el stick"),
                      Stage::processing(STAGE_PROCESSING, "Buscando tu stick", "Comparando flex, curva y lie"),
                      Stage::results(STAGE_RESULTS, "Tu stick ideal")];
    Ok(Self { catalog: StageCatalog::new(stages)? })
  }
}

impl FlowDefinition for StickAnalyzerFlow {
  fn name(&self) -> &str {
    FeatureKind::StickAnalyzer.as_str()
  }

  fn catalog(&self) -> &StageCatalog {
    &self.catalog
  }

  fn gated_capability(&self, from: &Stage, to: &Stage) -> Option<&str> {
    gate_on_analysis(FeatureKind::StickAnalyzer, from, to)
  }
}
