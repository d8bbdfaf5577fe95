// Archivo: errors.rs
// Propósito: definir los errores del motor de flujos y el alias Result<T>
// usado por las APIs del crate.
use thiserror::Error;

/// Errores comunes del motor de flujos.
///
/// - `NotFound`: stage, tarea o snapshot inexistente.
/// - `Validation`: definición de flujo mal formada (ids duplicados, vacía).
/// - `Storage`: error al acceder al almacenamiento externo (media, snapshots).
/// - `Serialization`: error al (de)serializar snapshots o payloads.
/// - `Other`: cualquier otro error.
#[derive(Error, Debug)]
pub enum FlowError {
    /// Entidad no encontrada (por ejemplo un stage id desconocido).
    #[error("No encontrado: {0}")]
    NotFound(String),
    /// Definición inválida.
    #[error("Error de validación: {0}")]
    Validation(String),
    /// Error genérico de almacenamiento (disco, colaborador de media).
    #[error("Error de almacenamiento: {0}")]
    Storage(String),
    /// Error de serialización JSON.
    #[error("Error de serialización: {0}")]
    Serialization(#[from] serde_json::Error),
    /// Otro tipo de error.
    #[error("Otro: {0}")]
    Other(String),
}

impl From<std::io::Error> for FlowError {
    fn from(e: std::io::Error) -> Self {
        FlowError::Storage(e.to_string())
    }
}

/// Alias de resultado usado por las APIs del crate.
pub type Result<T> = std::result::Result<T, FlowError>;
