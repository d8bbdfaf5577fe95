// results.rs
//! Payloads tipados que producen los análisis. El colaborador de IA entrega
//! JSON; cada feature lo reconstruye aquí y valida rangos antes de mostrarlo.
use crate::{DomainError, ShotType};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

/// Contrato común de los payloads de análisis.
pub trait AnalysisPayload: Serialize + DeserializeOwned {
  fn validate(&self) -> Result<(), DomainError>;

  /// Reconstruye el DTO tipado desde el JSON del análisis.
  fn recover_from(value: &JsonValue) -> Result<Self, DomainError> {
    let payload: Self = serde_json::from_value(value.clone())?;
    payload.validate()?;
    Ok(payload)
  }

  fn to_value(&self) -> Result<JsonValue, DomainError> {
    Ok(serde_json::to_value(self)?)
  }
}

fn check_score(name: &str, score: u8) -> Result<(), DomainError> {
  if score > 100 {
    return Err(DomainError::ValidationError(format!("{} fuera de rango: {}", name, score)));
  }
  Ok(())
}

/// Resultado del Shot Rater.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShotAnalysis {
  pub shot_type: ShotType,
  /// Puntuación global 0-100.
  pub overall_score: u8,
  pub technique: u8,
  pub power: u8,
  pub accuracy: u8,
  #[serde(default)]
  pub tips: Vec<String>,
}

impl AnalysisPayload for ShotAnalysis {
  fn validate(&self) -> Result<(), DomainError> {
    check_score("overall_score", self.overall_score)?;
    check_score("technique", self.technique)?;
    check_score("power", self.power)?;
    check_score("accuracy", self.accuracy)
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Curve {
  Mid,
  Heel,
  Toe,
}

/// Resultado del Stick Analyzer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StickRecommendation {
  pub flex: u16,
  pub curve: Curve,
  pub lie: u8,
  pub length_in: f32,
  pub rationale: String,
}

impl AnalysisPayload for StickRecommendation {
  fn validate(&self) -> Result<(), DomainError> {
    if !(30..=120).contains(&self.flex) {
      return Err(DomainError::ValidationError(format!("flex fuera de rango: {}", self.flex)));
    }
    if !(3..=8).contains(&self.lie) {
      return Err(DomainError::ValidationError(format!("lie fuera de rango: {}", self.lie)));
    }
    Ok(())
  }
}

/// Resultado del AI Coach.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CoachReport {
  pub summary: String,
  #[serde(default)]
  pub strengths: Vec<String>,
  #[serde(default)]
  pub improvements: Vec<String>,
  #[serde(default)]
  pub drills: Vec<String>,
}

impl AnalysisPayload for CoachReport {
  fn validate(&self) -> Result<(), DomainError> {
    if self.summary.trim().is_empty() {
      return Err(DomainError::ValidationError("el resumen no puede estar vacío".into()));
    }
    Ok(())
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use serde_json::json;

  #[test]
  fn test_shot_analysis_recover() -> Result<(), DomainError> {
    let value = json!({"shot_type": "slap", "overall_score": 82, "technique": 75, "power": 91, "accuracy": 70,
                       "tips": ["Transfiere el peso antes del impacto"]});
    let analysis = ShotAnalysis::recover_from(&value)?;
    assert_eq!(analysis.shot_type, ShotType::Slap);
    assert_eq!(analysis.tips.len(), 1);
    assert_eq!(analysis.to_value()?, value);
    Ok(())
  }

  #[test]
  fn test_shot_analysis_out_of_range() {
    let value = json!({"shot_type": "wrist", "overall_score": 120, "technique": 75, "power": 91, "accuracy": 70});
    assert!(matches!(ShotAnalysis::recover_from(&value), Err(DomainError::ValidationError(_))));
  }

  #[test]
  fn test_stick_recommendation_missing_field() {
    let value = json!({"flex": 75, "curve": "mid", "lie": 5});
    assert!(matches!(StickRecommendation::recover_from(&value), Err(DomainError::SerializationError(_))));
  }

  #[test]
  fn test_coach_report_requires_summary() {
    let value = json!({"summary": "  ", "drills": ["Pases contra la pared"]});
    assert!(CoachReport::recover_from(&value).is_err());
  }
}
