// Archivo: gate.rs
// Propósito: punto de interrupción de monetización. Cualquier transición
// que requiera una capacidad de pago guarda su acción pendiente aquí; el
// gate gestiona su propia activación/cierre y entrega la acción una sola
// vez cuando se concede el acceso.
use async_trait::async_trait;
use log::{debug, info};
use std::sync::{Mutex, MutexGuard};
use uuid::Uuid;

/// Respuesta del colaborador de monetización.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AccessDecision {
    Granted,
    Denied(String),
}

/// Colaborador de monetización (compra/entitlement). Sólo se invoca a
/// través del gate.
#[async_trait]
pub trait AccessProvider: Send + Sync {
    async fn request_access(&self, feature: &str) -> AccessDecision;
}

/// Decisión con la que se resuelve un trigger.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GateDecision {
    Granted,
    Denied(String),
    /// El usuario cerró el paywall sin decidir.
    Dismissed,
}

impl From<AccessDecision> for GateDecision {
    fn from(d: AccessDecision) -> Self {
        match d {
            AccessDecision::Granted => GateDecision::Granted,
            AccessDecision::Denied(reason) => GateDecision::Denied(reason),
        }
    }
}

/// Qué pasó al resolver un trigger.
#[derive(Debug, PartialEq, Eq)]
pub enum GateResolution<A> {
    /// Acceso concedido: el llamador ejecuta la acción (exactamente una vez).
    Invoke(A),
    /// Denegado o cerrado: la acción se descartó sin ejecutarse.
    Discarded,
    /// El trigger no es el activo (respuesta tardía o repetida): se ignora.
    Stale,
}

/// Estado visible del gate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GateStatus {
    Idle,
    Active { trigger_id: Uuid, feature: String },
}

struct ActiveGate<A> {
    trigger_id: Uuid,
    feature: String,
    action: A,
}

/// Gate de monetización genérico sobre la acción pendiente `A`.
pub struct MonetizationGate<A> {
    active: Mutex<Option<ActiveGate<A>>>,
}

impl<A> Default for MonetizationGate<A> {
    fn default() -> Self {
        Self::new()
    }
}

impl<A> MonetizationGate<A> {
    pub fn new() -> Self {
        Self { active: Mutex::new(None) }
    }

    fn lock(&self) -> MutexGuard<'_, Option<ActiveGate<A>>> {
        self.active.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Activa el gate con una acción pendiente y un `trigger_id` nuevo. Un
    /// trigger previo queda obsoleto y su acción se descarta.
    pub fn trigger_gate(&self, feature: &str, action: A) -> Uuid {
        let trigger_id = Uuid::new_v4();
        let mut active = self.lock();
        if let Some(stale) = active.as_ref() {
            debug!("trigger {} de {} reemplazado por {}", stale.trigger_id, stale.feature, trigger_id);
        }
        *active = Some(ActiveGate { trigger_id,
                                    feature: feature.to_string(),
                                    action });
        info!("gate activado para {} ({})", feature, trigger_id);
        trigger_id
    }

    /// Resuelve el trigger activo. Las respuestas para un trigger que ya no
    /// es el activo se ignoran.
    pub fn resolve(&self, trigger_id: Uuid, decision: GateDecision) -> GateResolution<A> {
        let mut active = self.lock();
        match active.as_ref() {
            Some(gate) if gate.trigger_id == trigger_id => {}
            _ => {
                debug!("respuesta obsoleta para trigger {}", trigger_id);
                return GateResolution::Stale;
            }
        }
        let gate = match active.take() {
            Some(gate) => gate,
            None => return GateResolution::Stale,
        };
        match decision {
            GateDecision::Granted => {
                info!("acceso concedido a {}", gate.feature);
                GateResolution::Invoke(gate.action)
            }
            GateDecision::Denied(reason) => {
                info!("acceso denegado a {}: {}", gate.feature, reason);
                GateResolution::Discarded
            }
            GateDecision::Dismissed => GateResolution::Discarded,
        }
    }

    /// Pregunta al colaborador de monetización y resuelve con su respuesta.
    pub async fn request_access(&self, trigger_id: Uuid, provider: &dyn AccessProvider) -> GateResolution<A> {
        let feature = match self.status() {
            GateStatus::Active { trigger_id: id, feature } if id == trigger_id => feature,
            _ => return GateResolution::Stale,
        };
        let decision = provider.request_access(&feature).await;
        self.resolve(trigger_id, decision.into())
    }

    /// Cierra el gate sin ejecutar la acción.
    pub fn dismiss(&self, trigger_id: Uuid) -> GateResolution<A> {
        self.resolve(trigger_id, GateDecision::Dismissed)
    }

    pub fn status(&self) -> GateStatus {
        match self.lock().as_ref() {
            Some(gate) => GateStatus::Active { trigger_id: gate.trigger_id,
                                               feature: gate.feature.clone() },
            None => GateStatus::Idle,
        }
    }

    pub fn is_active(&self) -> bool {
        self.lock().is_some()
    }
}
