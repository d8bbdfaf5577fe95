// Archivo: events.rs
// Propósito: bus de eventos en proceso (publish/subscribe con nombre) usado
// para difundir cancelaciones a la UI que esté presentando una feature.
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

/// Eventos del motor. Sin contrato de payload más allá del `kind`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum FlowEvent {
    AnalysisStarted { kind: String },
    AnalysisFinished { kind: String },
    /// Cancelación disparada externamente. Quien la escucha sólo deshace su
    /// estado de UI; no vuelve a cancelar.
    AnalysisCancelled { kind: String },
}

impl FlowEvent {
    pub fn kind(&self) -> &str {
        match self {
            FlowEvent::AnalysisStarted { kind }
            | FlowEvent::AnalysisFinished { kind }
            | FlowEvent::AnalysisCancelled { kind } => kind,
        }
    }
}

/// Bus basado en canales `broadcast` de tokio.
#[derive(Debug, Clone)]
pub struct FlowEventBus {
    tx: broadcast::Sender<FlowEvent>,
}

impl FlowEventBus {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity.max(1));
        Self { tx }
    }

    /// Publica a todos los suscriptores. Sin receptores no es un error.
    pub fn publish(&self, event: FlowEvent) {
        let _ = self.tx.send(event);
    }

    pub fn subscribe(&self) -> broadcast::Receiver<FlowEvent> {
        self.tx.subscribe()
    }

    pub fn receiver_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

impl Default for FlowEventBus {
    fn default() -> Self {
        Self::new(64)
    }
}
