// shot.rs
use crate::DomainError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ShotType {
  Wrist,
  Snap,
  Slap,
  Backhand,
}

impl ShotType {
  pub const ALL: [ShotType; 4] = [ShotType::Wrist, ShotType::Snap, ShotType::Slap, ShotType::Backhand];

  pub fn id(&self) -> &'static str {
    match self {
      ShotType::Wrist => "wrist",
      ShotType::Snap => "snap",
      ShotType::Slap => "slap",
      ShotType::Backhand => "backhand",
    }
  }

  pub fn title(&self) -> &'static str {
    match self {
      ShotType::Wrist => "Tiro de muñeca",
      ShotType::Snap => "Snap shot",
      ShotType::Slap => "Slap shot",
      ShotType::Backhand => "Revés",
    }
  }

  pub fn subtitle(&self) -> &'static str {
    match self {
      ShotType::Wrist => "Precisión y salida rápida",
      ShotType::Snap => "Potencia con poco armado",
      ShotType::Slap => "Máxima potencia",
      ShotType::Backhand => "Desde el lado contrario",
    }
  }
}

impl fmt::Display for ShotType {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}", self.id())
  }
}

impl FromStr for ShotType {
  type Err = DomainError;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    ShotType::ALL.iter()
                 .copied()
                 .find(|t| t.id() == s.trim().to_lowercase())
                 .ok_or_else(|| DomainError::UnknownValue(format!("tipo de tiro '{}'", s)))
  }
}

/// Posición del jugador; condiciona la recomendación de stick.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Position {
  Forward,
  Defense,
  Goalie,
}

impl Position {
  pub fn as_str(&self) -> &'static str {
    match self {
      Position::Forward => "forward",
      Position::Defense => "defense",
      Position::Goalie => "goalie",
    }
  }
}

impl FromStr for Position {
  type Err = DomainError;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    match s.trim().to_lowercase().as_str() {
      "forward" => Ok(Position::Forward),
      "defense" => Ok(Position::Defense),
      "goalie" => Ok(Position::Goalie),
      other => Err(DomainError::UnknownValue(format!("posición '{}'", other))),
    }
  }
}

/// Perfil físico que pide el Stick Analyzer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlayerProfile {
  pub height_cm: f64,
  pub weight_kg: f64,
  pub position: Position,
}

impl PlayerProfile {
  pub fn new(height_cm: f64, weight_kg: f64, position: Position) -> Result<Self, DomainError> {
    if !(100.0..=230.0).contains(&height_cm) {
      return Err(DomainError::ValidationError(format!("altura fuera de rango: {}", height_cm)));
    }
    if !(25.0..=160.0).contains(&weight_kg) {
      return Err(DomainError::ValidationError(format!("peso fuera de rango: {}", weight_kg)));
    }
    Ok(Self { height_cm, weight_kg, position })
  }
}
