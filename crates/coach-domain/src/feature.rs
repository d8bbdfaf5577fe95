// feature.rs
use crate::DomainError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Features de análisis que soporta la app.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FeatureKind {
  ShotRater,
  StickAnalyzer,
  AiCoach,
}

impl FeatureKind {
  pub const ALL: [FeatureKind; 3] = [FeatureKind::ShotRater, FeatureKind::StickAnalyzer, FeatureKind::AiCoach];

  pub fn as_str(&self) -> &'static str {
    match self {
      FeatureKind::ShotRater => "shot_rater",
      FeatureKind::StickAnalyzer => "stick_analyzer",
      FeatureKind::AiCoach => "ai_coach",
    }
  }

  /// Identificador de la capacidad de pago que protege el análisis.
  pub fn capability(&self) -> &'static str {
    match self {
      FeatureKind::ShotRater => "premium.shot_rater",
      FeatureKind::StickAnalyzer => "premium.stick_analyzer",
      FeatureKind::AiCoach => "premium.ai_coach",
    }
  }

  /// Carpeta bajo la que se guarda la media de la feature.
  pub fn flow_type(&self) -> &'static str {
    self.as_str()
  }
}

impl fmt::Display for FeatureKind {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}", self.as_str())
  }
}

impl FromStr for FeatureKind {
  type Err = DomainError;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    match s.trim().to_lowercase().as_str() {
      "shot_rater" | "shotrater" => Ok(FeatureKind::ShotRater),
      "stick_analyzer" | "stickanalyzer" => Ok(FeatureKind::StickAnalyzer),
      "ai_coach" | "aicoach" | "coach" => Ok(FeatureKind::AiCoach),
      other => Err(DomainError::UnknownValue(format!("feature '{}'", other))),
    }
  }
}
