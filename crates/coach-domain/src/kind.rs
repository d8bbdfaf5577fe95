// kind.rs
use crate::{DomainError, FeatureKind};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Clave feature + variante (p.ej. `shot_rater:wrist`). Indexa las tareas en
/// segundo plano: como mucho un análisis por clave.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AnalysisKind {
  feature: FeatureKind,
  variant: Option<String>,
}

impl AnalysisKind {
  pub fn new(feature: FeatureKind, variant: Option<&str>) -> Self {
    Self { feature, variant: variant.map(|v| v.trim().to_lowercase()).filter(|v| !v.is_empty()) }
  }

  pub fn feature(&self) -> FeatureKind {
    self.feature
  }

  pub fn variant(&self) -> Option<&str> {
    self.variant.as_deref()
  }

  pub fn key(&self) -> String {
    self.to_string()
  }
}

impl fmt::Display for AnalysisKind {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match &self.variant {
      Some(v) => write!(f, "{}:{}", self.feature, v),
      None => write!(f, "{}", self.feature),
    }
  }
}

impl FromStr for AnalysisKind {
  type Err = DomainError;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    let (feature, variant) = match s.split_once(':') {
      Some((f, v)) => (f, Some(v)),
      None => (s, None),
    };
    Ok(Self::new(feature.parse()?, variant))
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_kind_key_roundtrip() -> Result<(), DomainError> {
    let kind = AnalysisKind::new(FeatureKind::ShotRater, Some("Wrist"));
    assert_eq!(kind.key(), "shot_rater:wrist");
    assert_eq!(kind.key().parse::<AnalysisKind>()?, kind);
    Ok(())
  }

  #[test]
  fn test_kind_without_variant() -> Result<(), DomainError> {
    let kind: AnalysisKind = "ai_coach".parse()?;
    assert_eq!(kind.feature(), FeatureKind::AiCoach);
    assert_eq!(kind.variant(), None);
    assert_eq!(AnalysisKind::new(FeatureKind::AiCoach, Some("")), kind);
    Ok(())
  }

  #[test]
  fn test_kind_unknown_feature() {
    assert!("pase:wrist".parse::<AnalysisKind>().is_err());
  }
}
