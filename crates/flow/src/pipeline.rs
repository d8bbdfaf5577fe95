// Archivo: pipeline.rs
// Propósito: contrato de dos fases validar -> analizar. La validación es
// barata y filtra media que no corresponde al dominio; el análisis (caro)
// sólo corre tras una validación positiva. Ambas fases son cancelables.
use crate::context::MediaReference;
use async_trait::async_trait;
use log::{debug, info, warn};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use std::sync::Arc;
use thiserror::Error;
use tokio_util::sync::CancellationToken;

/// Taxonomía de errores de validación/análisis. Se transportan como datos
/// hasta el stage de resultados; no abortan el flujo.
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "detail", rename_all = "snake_case")]
pub enum PipelineError {
    /// La media no superó la validación de dominio.
    #[error("Contenido inválido: {0}")]
    InvalidContent(String),
    /// Fallo transitorio de conectividad.
    #[error("Problema de red: {0}")]
    NetworkIssue(String),
    /// El colaborador de análisis devolvió un error de procesamiento.
    #[error("Fallo del procesamiento IA: {0}")]
    AiProcessingFailed(String),
    /// La respuesta del colaborador no se pudo interpretar.
    #[error("No se pudo interpretar el análisis: {0}")]
    AnalysisParsingFailed(String),
    /// El pipeline se invocó sin sus precondiciones. Es un defecto, no un
    /// caso de reintento para el usuario.
    #[error("Faltan datos requeridos: {0}")]
    MissingRequiredData(String),
}

/// Acción ofrecida al usuario ante un fallo.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecoveryAction {
    /// Re-ejecutar el análisis sobre la misma media guardada.
    TryAgain,
    /// Volver a capturar media.
    Recapture,
    /// Abandonar.
    Cancel,
}

impl PipelineError {
    pub fn is_retryable(&self) -> bool {
        matches!(self,
                 PipelineError::NetworkIssue(_)
                 | PipelineError::AiProcessingFailed(_)
                 | PipelineError::AnalysisParsingFailed(_))
    }

    pub fn requires_recapture(&self) -> bool {
        matches!(self, PipelineError::InvalidContent(_))
    }

    pub fn is_defect(&self) -> bool {
        matches!(self, PipelineError::MissingRequiredData(_))
    }

    pub fn recovery_actions(&self) -> Vec<RecoveryAction> {
        if self.is_retryable() {
            vec![RecoveryAction::TryAgain, RecoveryAction::Cancel]
        } else if self.requires_recapture() {
            vec![RecoveryAction::Recapture, RecoveryAction::Cancel]
        } else {
            vec![RecoveryAction::Cancel]
        }
    }
}

/// Resultado del pipeline, consumido exactamente una vez por Results.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", content = "data", rename_all = "snake_case")]
pub enum PipelineResult {
    Success(JsonValue),
    Failure(PipelineError),
}

impl PipelineResult {
    pub fn is_success(&self) -> bool {
        matches!(self, PipelineResult::Success(_))
    }

    pub fn error(&self) -> Option<&PipelineError> {
        match self {
            PipelineResult::Failure(e) => Some(e),
            PipelineResult::Success(_) => None,
        }
    }
}

/// Resultado de la fase de validación.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationOutcome {
    Valid,
    Invalid(String),
}

/// Entrada de una invocación del pipeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisRequest {
    /// Clave feature+variante (p.ej. `shot_rater:wrist`).
    pub kind: String,
    pub media: Vec<MediaReference>,
    /// Contexto para el colaborador (prompt, perfil del jugador...).
    pub context: JsonValue,
}

/// Desenlace de una ejecución: la cancelación no es un error, suprime tanto
/// el éxito como el fallo.
#[derive(Debug, Clone, PartialEq)]
pub enum PipelineOutcome {
    /// La media se validó y el análisis corrió; su resultado o su error.
    Finished(PipelineResult),
    /// El pipeline se detuvo antes de analizar (sin media, media inválida o
    /// error en la validación). Un reintento debe volver a validar.
    NotValidated(PipelineResult),
    Cancelled,
}

impl PipelineOutcome {
    /// Resultado entregable, si el pipeline no se canceló.
    pub fn result(&self) -> Option<&PipelineResult> {
        match self {
            PipelineOutcome::Finished(r) | PipelineOutcome::NotValidated(r) => Some(r),
            PipelineOutcome::Cancelled => None,
        }
    }
}

/// Lo que una tarea de análisis deja en el registro: el resultado y si la
/// media llegó a validarse.
#[derive(Debug, Clone, PartialEq)]
pub struct PipelineReport {
    pub result: PipelineResult,
    pub validated: bool,
}

/// Colaborador de IA. Los timeouts son responsabilidad suya.
#[async_trait]
pub trait AnalysisService: Send + Sync {
    /// Comprobación rápida de que la media corresponde al dominio esperado.
    async fn validate(&self, media: &[MediaReference], kind: &str) -> Result<ValidationOutcome, PipelineError>;

    /// Análisis completo.
    async fn analyze(&self, request: &AnalysisRequest) -> PipelineResult;
}

/// Orquestador de las dos fases.
#[derive(Clone)]
pub struct AnalysisPipeline {
    service: Arc<dyn AnalysisService>,
}

impl AnalysisPipeline {
    pub fn new(service: Arc<dyn AnalysisService>) -> Self {
        Self { service }
    }

    /// Ejecuta validar -> analizar. Nunca entrega resultados parciales.
    pub async fn run(&self, request: &AnalysisRequest, token: &CancellationToken) -> PipelineOutcome {
        if request.media.is_empty() {
            warn!("pipeline {} invocado sin media: defecto de precondición", request.kind);
            return PipelineOutcome::NotValidated(PipelineResult::Failure(PipelineError::MissingRequiredData("media".into())));
        }

        debug!("validando media para {}", request.kind);
        let validation = tokio::select! {
            _ = token.cancelled() => {
                info!("validación cancelada para {}", request.kind);
                return PipelineOutcome::Cancelled;
            }
            v = self.service.validate(&request.media, &request.kind) => v,
        };

        match validation {
            Ok(ValidationOutcome::Valid) => {}
            Ok(ValidationOutcome::Invalid(reason)) => {
                info!("media rechazada para {}: {}", request.kind, reason);
                return PipelineOutcome::NotValidated(PipelineResult::Failure(PipelineError::InvalidContent(reason)));
            }
            Err(e) => {
                warn!("validación fallida para {}: {}", request.kind, e);
                return PipelineOutcome::NotValidated(PipelineResult::Failure(e));
            }
        }

        self.rerun_analysis(request, token).await
    }

    /// Sólo la fase de análisis, desde cero, sobre la misma media. Es lo que
    /// usa el reintento tras un fallo transitorio del análisis; quien la llama
    /// debe saber que la media ya validó.
    pub async fn rerun_analysis(&self, request: &AnalysisRequest, token: &CancellationToken) -> PipelineOutcome {
        if token.is_cancelled() {
            return PipelineOutcome::Cancelled;
        }
        debug!("analizando {}", request.kind);
        let result = tokio::select! {
            _ = token.cancelled() => {
                info!("análisis cancelado para {}", request.kind);
                return PipelineOutcome::Cancelled;
            }
            r = self.service.analyze(request) => r,
        };
        // un resultado que llega tras la cancelación se descarta
        if token.is_cancelled() {
            return PipelineOutcome::Cancelled;
        }
        if let PipelineResult::Failure(e) = &result {
            warn!("análisis fallido para {}: {}", request.kind, e);
        }
        PipelineOutcome::Finished(result)
    }
}
