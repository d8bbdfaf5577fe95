// Archivo: state.rs
// Propósito: implementar `FlowState`, el cursor vivo sobre una
// `FlowDefinition`: stage actual, data bag y operaciones de navegación.
use crate::context::{FlowContext, FlowKey, FlowValue};
use crate::definition::FlowDefinition;
use crate::errors::{FlowError, Result};
use crate::pipeline::PipelineResult;
use crate::stage::{Stage, StageValidation};
use log::debug;
use std::sync::Arc;

/// Resultado de `FlowState::proceed`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Transition {
    /// El cursor se movió de `from` (None si el flujo no había empezado) a `to`.
    Advanced { from: Option<String>, to: String },
    /// El stage saliente es requerido y no valida; el cursor no se movió.
    Rejected { reason: String },
    /// No hay siguiente stage: el flujo terminó.
    Completed,
}

/// Cursor vivo sobre un flujo. Pertenece en exclusiva a una sesión de feature.
pub struct FlowState {
    definition: Arc<dyn FlowDefinition>,
    current: Option<String>,
    context: FlowContext,
}

impl std::fmt::Debug for FlowState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FlowState")
         .field("flow", &self.definition.name())
         .field("current", &self.current)
         .field("context", &self.context)
         .finish()
    }
}

impl FlowState {
    /// Crea el estado sin iniciar (`current_stage()` es None).
    pub fn new(definition: Arc<dyn FlowDefinition>) -> Self {
        Self { definition,
               current: None,
               context: FlowContext::new() }
    }

    /// Crea el estado con un data bag previo (pre-selecciones, rehidratación).
    pub fn with_context(definition: Arc<dyn FlowDefinition>, context: FlowContext) -> Self {
        Self { definition,
               current: None,
               context }
    }

    /// Definición que recorre este estado.
    pub fn definition(&self) -> &Arc<dyn FlowDefinition> {
        &self.definition
    }

    /// Data bag acumulado, sólo lectura.
    pub fn context(&self) -> &FlowContext {
        &self.context
    }

    /// Stage bajo el cursor; None si el flujo no ha empezado.
    pub fn current_stage(&self) -> Option<&Stage> {
        self.current.as_deref().and_then(|id| self.definition.stage(id))
    }

    pub fn current_stage_id(&self) -> Option<&str> {
        self.current.as_deref()
    }

    pub fn is_started(&self) -> bool {
        self.current.is_some()
    }

    /// Si el cursor está en un stage de resultados.
    pub fn is_on_results(&self) -> bool {
        self.current_stage().map(|s| s.is_results()).unwrap_or(false)
    }

    /// Upsert en el data bag; no mueve el cursor.
    pub fn set_data(&mut self, key: FlowKey, value: FlowValue) {
        self.context.set(key, value);
    }

    pub fn get_data(&self, key: &FlowKey) -> Option<&FlowValue> {
        self.context.get(key)
    }

    /// Quita `key` del data bag y devuelve su valor.
    pub fn remove_data(&mut self, key: &FlowKey) -> Option<FlowValue> {
        self.context.remove(key)
    }

    /// Mueve el cursor al primer stage si el flujo no había empezado.
    pub fn start(&mut self) -> Option<&Stage> {
        if self.current.is_none() {
            self.current = self.definition.next_stage(None, &self.context).map(|s| s.id.clone());
        }
        self.current_stage()
    }

    /// Stage al que movería `proceed` si la validación pasa.
    pub fn peek_next(&self) -> Option<&Stage> {
        self.definition.next_stage(self.current.as_deref(), &self.context)
    }

    /// Avanza al siguiente stage. Si el stage saliente es requerido debe
    /// validar contra el data bag; si no, no cambia nada y se devuelve el
    /// motivo.
    pub fn proceed(&mut self) -> Transition {
        if let Some(stage) = self.current_stage() {
            if stage.is_required {
                if let StageValidation::Invalid(reason) = stage.validate(&self.context) {
                    debug!("proceed rechazado en {}: {}", stage.id, reason);
                    return Transition::Rejected { reason };
                }
            }
        }
        let next = match self.peek_next() {
            Some(stage) => stage.id.clone(),
            None => return Transition::Completed,
        };
        let from = self.current.replace(next.clone());
        debug!("{}: {:?} -> {}", self.definition.name(), from, next);
        Transition::Advanced { from, to: next }
    }

    /// Vuelve al stage anterior. No-op si el actual no permite volver o no
    /// hay anterior. Devuelve si el cursor se movió.
    pub fn go_back(&mut self) -> bool {
        let target = {
            let Some(stage) = self.current_stage() else {
                return false;
            };
            if !stage.can_go_back {
                return false;
            }
            self.definition
                .previous_stage(&stage.id, &self.context)
                .map(|prev| prev.id.clone())
        };
        match target {
            Some(id) => {
                self.current = Some(id);
                true
            }
            None => false,
        }
    }

    /// Vuelve al primer stage y borra todas las claves que la definición no
    /// declara como retenidas.
    pub fn restart(&mut self) {
        let retained = self.definition.retained_keys().to_vec();
        self.context.retain(|k| retained.contains(k));
        self.current = None;
        self.start();
    }

    /// Salto privilegiado a un stage arbitrario, sin validación. Sólo para
    /// rehidratación y entrega de resultados.
    pub fn jump_to(&mut self, stage_id: &str) -> Result<()> {
        if self.definition.stage(stage_id).is_none() {
            return Err(FlowError::NotFound(format!("stage {} en flujo {}", stage_id, self.definition.name())));
        }
        self.current = Some(stage_id.to_string());
        Ok(())
    }

    /// Guarda el resultado del pipeline para el stage de resultados.
    pub fn store_result(&mut self, result: PipelineResult) {
        self.context.set(FlowKey::PipelineResult, FlowValue::Outcome(result));
    }

    /// Consume el resultado del pipeline; una segunda llamada devuelve None.
    pub fn take_result(&mut self) -> Option<PipelineResult> {
        match self.context.remove(&FlowKey::PipelineResult) {
            Some(FlowValue::Outcome(r)) => Some(r),
            Some(other) => {
                self.context.set(FlowKey::PipelineResult, other);
                None
            }
            None => None,
        }
    }

    /// Primer stage de un tipo dado, en orden de definición.
    pub fn find_stage(&self, predicate: impl Fn(&Stage) -> bool) -> Option<&Stage> {
        self.definition.stages().iter().find(|s| predicate(s))
    }
}
