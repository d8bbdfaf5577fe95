use thiserror::Error;

// Errores comunes de las features.
//
// Centraliza los errores que pueden ocurrir al conducir una sesión: errores
// del motor (`FlowError`), del dominio (`DomainError`), de configuración,
// validaciones locales y serialización.
#[derive(Error, Debug)]
pub enum WorkflowError {
  /// Errores originados por el crate `flow` (stages, almacenamiento).
  #[error("Error de flujo: {0}")]
  Flow(#[from] flow::FlowError),

  /// Errores originados por el dominio (valores desconocidos, rangos).
  #[error("Error de dominio: {0}")]
  Domain(#[from] coach_domain::DomainError),

  /// Variables de entorno con valores no reconocidos.
  #[error("Error de configuración: {0}")]
  Config(String),

  /// Errores de serializacion/deserializacion JSON.
  #[error("Error de serializacion: {0}")]
  Serialization(#[from] serde_json::Error),

  /// Operación no permitida en el stage actual (por ejemplo capturar media
  /// fuera del stage de captura).
  #[error("Error de validacion: {0}")]
  Validation(String),

  /// Error generico.
  #[error("Otro error: {0}")]
  Other(String),
}
