use crate::WorkflowError;
use flow::SupersedePolicy;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Capacidad del bus de eventos si no se configura.
pub const DEFAULT_EVENT_CAPACITY: usize = 64;

/// Configuracion de las sesiones de feature.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkflowConfig {
  pub event_bus_capacity: usize,
  pub supersede_policy: SupersedePolicy,
  pub snapshot_policy: SnapshotPolicy,
}

impl Default for WorkflowConfig {
  fn default() -> Self {
    WorkflowConfig { event_bus_capacity: DEFAULT_EVENT_CAPACITY,
                     supersede_policy: SupersedePolicy::Cancel,
                     snapshot_policy: SnapshotPolicy::Never }
  }
}

/// Cuándo se guarda un snapshot del flujo.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SnapshotPolicy {
  Never,
  /// Al cerrar/mandar a segundo plano una sesión sin resultados.
  OnDismiss,
}

impl FromStr for SnapshotPolicy {
  type Err = WorkflowError;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    match s.trim().to_lowercase().as_str() {
      "never" => Ok(SnapshotPolicy::Never),
      "on_dismiss" | "ondismiss" => Ok(SnapshotPolicy::OnDismiss),
      other => Err(WorkflowError::Config(format!("COACH_SNAPSHOT_POLICY desconocida: {}", other))),
    }
  }
}

fn parse_supersede(s: &str) -> Result<SupersedePolicy, WorkflowError> {
  match s.trim().to_lowercase().as_str() {
    "cancel" => Ok(SupersedePolicy::Cancel),
    "orphan" => Ok(SupersedePolicy::Orphan),
    other => Err(WorkflowError::Config(format!("COACH_SUPERSEDE_POLICY desconocida: {}", other))),
  }
}

impl WorkflowConfig {
  /// Lee `COACH_EVENT_CAPACITY`, `COACH_SUPERSEDE_POLICY` y
  /// `COACH_SNAPSHOT_POLICY`; las ausentes toman el valor por defecto.
  pub fn from_env() -> Result<Self, WorkflowError> {
    dotenvy::dotenv().ok();
    Self::from_lookup(|name| std::env::var(name).ok())
  }

  /// Igual que `from_env` pero con una fuente de variables arbitraria.
  pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, WorkflowError> {
    let mut config = WorkflowConfig::default();
    if let Some(raw) = lookup("COACH_EVENT_CAPACITY") {
      config.event_bus_capacity = match raw.trim().parse::<usize>() {
        Ok(n) if n > 0 => n,
        _ => return Err(WorkflowError::Config(format!("COACH_EVENT_CAPACITY inválida: {}", raw))),
      };
    }
    if let Some(raw) = lookup("COACH_SUPERSEDE_POLICY") {
      config.supersede_policy = parse_supersede(&raw)?;
    }
    if let Some(raw) = lookup("COACH_SNAPSHOT_POLICY") {
      config.snapshot_policy = raw.parse()?;
    }
    Ok(config)
  }
}
