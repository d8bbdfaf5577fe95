// Archivo: snapshot.rs
// Propósito: snapshot persistible de un flujo parcialmente completado
// (stage actual + datos del usuario + rutas de media) y su rehidratación.
use crate::context::{FlowContext, FlowKey, FlowValue};
use crate::definition::FlowDefinition;
use crate::repository::MediaStore;
use crate::state::FlowState;
use chrono::{DateTime, Utc};
use log::{info, warn};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::Arc;

/// Descripción rehidratable de un flujo a medio hacer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FlowSnapshot {
    /// Nombre de la definición que lo produjo.
    pub flow_name: String,
    /// `kind` de la feature (feature + variante).
    pub kind: String,
    pub current_stage_id: String,
    pub saved_at: DateTime<Utc>,
    /// Datos de usuario. El resultado del pipeline (y su marca de media
    /// validada) no se persiste.
    pub inputs: Vec<(FlowKey, FlowValue)>,
    /// Rutas de media referenciadas por `inputs`.
    pub media_paths: Vec<PathBuf>,
}

impl FlowSnapshot {
    /// Captura el estado actual. Devuelve None si el flujo no ha empezado.
    pub fn capture(kind: &str, state: &FlowState) -> Option<Self> {
        let current_stage_id = state.current_stage_id()?.to_string();
        let mut inputs: Vec<(FlowKey, FlowValue)> = state.context()
                                                         .iter()
                                                         .filter(|(k, _)| !matches!(k, FlowKey::PipelineResult | FlowKey::MediaValidated))
                                                         .map(|(k, v)| (k.clone(), v.clone()))
                                                         .collect();
        // orden estable para que dos capturas iguales serialicen igual
        inputs.sort_by(|a, b| a.0.cmp(&b.0));
        let media_paths = state.context().all_media().into_iter().map(|m| m.path.clone()).collect();
        Some(Self { flow_name: state.definition().name().to_string(),
                    kind: kind.to_string(),
                    current_stage_id,
                    saved_at: Utc::now(),
                    inputs,
                    media_paths })
    }

    /// Válido sólo si todas las rutas de media siguen existiendo (trivialmente
    /// válido sin media).
    pub fn is_valid(&self, media: &dyn MediaStore) -> bool {
        self.media_paths.iter().all(|p| media.media_file_exists(p))
    }

    /// Rehidrata un `FlowState`. Un snapshot inválido se descarta entero:
    /// nunca se aplica parcialmente.
    pub fn restore(self, definition: Arc<dyn FlowDefinition>, media: &dyn MediaStore) -> Option<FlowState> {
        if definition.name() != self.flow_name {
            warn!("snapshot de {} no corresponde al flujo {}", self.flow_name, definition.name());
            return None;
        }
        if !self.is_valid(media) {
            info!("snapshot de {} descartado: falta media en disco", self.kind);
            return None;
        }
        let mut context = FlowContext::new();
        for (key, value) in self.inputs {
            context.set(key, value);
        }
        let mut state = FlowState::with_context(definition, context);
        match state.jump_to(&self.current_stage_id) {
            Ok(()) => Some(state),
            Err(e) => {
                warn!("snapshot de {} descartado: {}", self.kind, e);
                None
            }
        }
    }
}
