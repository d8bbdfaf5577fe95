// session.rs
//
// Sesión de una feature: conduce una `FlowState` stage a stage, cobra en el
// gate la entrada al análisis, lanza el pipeline en el registro compartido y
// entrega su resultado. La sesión sólo guarda el id de la tarea; la tarea
// pertenece al registro y sobrevive a `dismiss`.
use crate::factory::FlowFactory;
use crate::flows::{self, stick_analyzer};
use crate::{CoachServices, SnapshotPolicy, WorkflowError};
use coach_domain::{AnalysisKind, AnalysisPayload, FeatureKind, PlayerProfile};
use flow::{FlowDefinition, FlowEvent, FlowKey, FlowSnapshot, FlowState, FlowValue, GateDecision, GateResolution,
           GateStatus, MediaKind, MediaReference, MonetizationGate, PipelineReport, PipelineResult, RecoveryAction, Stage,
           StageKind, StageValidation, TaskOutcome, Transition};
use log::{debug, info, warn};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::broadcast::{self, error::TryRecvError};
use uuid::Uuid;

/// Acción retenida por el gate: avanzar de `from` a `to`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GatedAction {
  pub from: String,
  pub to: String,
}

/// Qué produjo una operación de la sesión.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionStep {
  /// El cursor está ahora en `stage`.
  Moved { stage: String },
  /// El stage actual no valida; el cursor no se movió.
  Rejected { reason: String },
  /// La transición requiere acceso de pago; se espera la respuesta del gate.
  Gated { trigger_id: Uuid, capability: String },
  /// Nada cambió (gate cerrado o denegado, respuesta obsoleta, tarea ajena).
  Stayed,
  /// El resultado del pipeline está en el stage de resultados.
  Delivered { success: bool },
  /// El análisis se canceló y la sesión volvió a la captura.
  Cancelled,
  /// No hay más stages.
  Completed,
}

pub struct FeatureSession {
  feature: FeatureKind,
  services: CoachServices,
  state: FlowState,
  gate: MonetizationGate<GatedAction>,
  active_task: Option<Uuid>,
  events: broadcast::Receiver<FlowEvent>,
}

impl std::fmt::Debug for FeatureSession {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("FeatureSession")
     .field("feature", &self.feature)
     .field("state", &self.state)
     .field("active_task", &self.active_task)
     .finish()
  }
}

impl FeatureSession {
  /// Abre la feature. Si hay un snapshot válido se reanuda desde él (uno
  /// inválido se borra) y si el registro tiene una tarea en vuelo para el
  /// mismo kind la sesión se engancha a ella en lugar de lanzar otra.
  pub fn open(feature: FeatureKind,
              services: CoachServices,
              preselection: Option<&str>)
              -> Result<Self, WorkflowError> {
    let definition = FlowFactory::definition(feature)?;
    let initial = FlowFactory::initial_context(feature, preselection)?;
    let events = services.bus().subscribe();
    let state = match Self::resume(feature, &services, definition.clone())? {
      Some(mut state) => {
        for (key, value) in initial.iter() {
          state.set_data(key.clone(), value.clone());
        }
        state
      }
      None => {
        let mut state = FlowState::with_context(definition, initial);
        state.start();
        state
      }
    };
    let mut session = Self { feature,
                             services,
                             state,
                             gate: MonetizationGate::new(),
                             active_task: None,
                             events };
    session.reattach()?;
    Ok(session)
  }

  fn resume(feature: FeatureKind,
            services: &CoachServices,
            definition: Arc<dyn FlowDefinition>)
            -> Result<Option<FlowState>, WorkflowError> {
    let Some(snapshot) = services.snapshots.load(feature.as_str())? else {
      return Ok(None);
    };
    match snapshot.restore(definition, services.media.as_ref()) {
      Some(state) => {
        info!("{} reanudada en {:?}", feature, state.current_stage_id());
        Ok(Some(state))
      }
      None => {
        services.snapshots.clear(feature.as_str())?;
        Ok(None)
      }
    }
  }

  fn reattach(&mut self) -> Result<(), WorkflowError> {
    let kind = self.kind().key();
    if let Some(task) = self.services.registry.get_task(&kind) {
      info!("{}: enganchada a la tarea {} en vuelo", kind, task.id());
      self.jump_to_stage(Stage::is_processing)?;
      self.active_task = Some(task.id());
    } else if self.is_processing() {
      // snapshot tomado durante el análisis; la tarea ya no existe
      self.unwind()?;
    }
    Ok(())
  }

  pub fn feature(&self) -> FeatureKind {
    self.feature
  }

  /// Clave del registro con los datos actuales (feature + variante).
  pub fn kind(&self) -> AnalysisKind {
    flows::analysis_kind(self.feature, self.state.context())
  }

  pub fn state(&self) -> &FlowState {
    &self.state
  }

  pub fn current_stage(&self) -> Option<&Stage> {
    self.state.current_stage()
  }

  pub fn current_stage_id(&self) -> Option<&str> {
    self.state.current_stage_id()
  }

  pub fn active_task(&self) -> Option<Uuid> {
    self.active_task
  }

  pub fn gate_status(&self) -> GateStatus {
    self.gate.status()
  }

  fn is_processing(&self) -> bool {
    self.state.current_stage().is_some_and(|s| s.is_processing())
  }

  fn stage_id_where(&self, predicate: impl Fn(&Stage) -> bool) -> Result<String, WorkflowError> {
    self.state
        .find_stage(predicate)
        .map(|s| s.id.clone())
        .ok_or_else(|| WorkflowError::Validation(format!("el flujo {} no tiene ese stage", self.feature)))
  }

  fn jump_to_stage(&mut self, predicate: impl Fn(&Stage) -> bool) -> Result<String, WorkflowError> {
    let id = self.stage_id_where(predicate)?;
    self.state.jump_to(&id)?;
    Ok(id)
  }

  /// Vuelve a la captura tras una cancelación.
  fn unwind(&mut self) -> Result<(), WorkflowError> {
    let id = self.jump_to_stage(Stage::is_media_capture)?;
    debug!("{}: de vuelta en {}", self.feature, id);
    Ok(())
  }

  fn moved(&self) -> SessionStep {
    SessionStep::Moved { stage: self.state.current_stage_id().unwrap_or_default().to_string() }
  }

  /// Elige una opción del stage de selección actual.
  pub fn select(&mut self, option_id: &str) -> Result<(), WorkflowError> {
    let stage = self.state
                    .current_stage()
                    .ok_or_else(|| WorkflowError::Validation("el flujo no ha empezado".into()))?;
    match &stage.kind {
      StageKind::Selection { options } if options.iter().any(|o| o.id == option_id) => {}
      StageKind::Selection { .. } => {
        return Err(WorkflowError::Validation(format!("opción desconocida '{}' en {}", option_id, stage.id)));
      }
      _ => return Err(WorkflowError::Validation(format!("{} no es un stage de selección", stage.id))),
    }
    let key = stage.key();
    self.state.set_data(key, FlowValue::Choice(option_id.to_string()));
    Ok(())
  }

  /// Dato libre del usuario (`FlowKey::Input`).
  pub fn set_input(&mut self, name: &str, value: FlowValue) {
    self.state.set_data(FlowKey::input(name), value);
  }

  pub fn set_profile(&mut self, profile: &PlayerProfile) -> Result<(), WorkflowError> {
    if self.feature != FeatureKind::StickAnalyzer {
      return Err(WorkflowError::Validation(format!("{} no usa perfil de jugador", self.feature)));
    }
    stick_analyzer::store_profile(&mut self.state, profile);
    Ok(())
  }

  /// Guarda la media con el colaborador y la añade al stage de captura
  /// actual. Guardar dos veces el mismo identificador reemplaza la entrada.
  pub async fn capture(&mut self, bytes: &[u8], identifier: &str, kind: MediaKind) -> Result<PathBuf, WorkflowError> {
    let key = match self.state.current_stage() {
      Some(stage) if stage.is_media_capture() => stage.key(),
      _ => return Err(WorkflowError::Validation("no hay un stage de captura activo".into())),
    };
    let path = self.services.media.save_media(bytes, identifier, self.feature.flow_type()).await?;
    let mut items = self.state.context().media(&key).map(|m| m.to_vec()).unwrap_or_default();
    items.retain(|m| m.path != path);
    items.push(MediaReference::new(path.clone(), kind));
    self.state.set_data(key, FlowValue::Media(items));
    // media nueva: la validación anterior ya no la cubre
    self.state.remove_data(&FlowKey::MediaValidated);
    Ok(path)
  }

  /// Avanza. Si la transición está protegida por una capacidad de pago se
  /// activa el gate y el avance queda pendiente de su respuesta.
  pub fn proceed(&mut self) -> Result<SessionStep, WorkflowError> {
    if !self.state.is_started() {
      self.state.start();
      return Ok(self.moved());
    }
    let pending = match (self.state.current_stage(), self.state.peek_next()) {
      (Some(current), Some(next)) => {
        if current.is_required {
          if let StageValidation::Invalid(reason) = current.validate(self.state.context()) {
            return Ok(SessionStep::Rejected { reason });
          }
        }
        self.state
            .definition()
            .gated_capability(current, next)
            .map(|cap| (cap.to_string(), GatedAction { from: current.id.clone(), to: next.id.clone() }))
      }
      _ => None,
    };
    match pending {
      Some((capability, action)) => {
        let trigger_id = self.gate.trigger_gate(&capability, action);
        Ok(SessionStep::Gated { trigger_id, capability })
      }
      None => self.advance(),
    }
  }

  fn advance(&mut self) -> Result<SessionStep, WorkflowError> {
    match self.state.proceed() {
      Transition::Advanced { to, .. } => {
        if self.is_processing() {
          if let Err(e) = self.start_analysis() {
            self.unwind()?;
            return Err(e);
          }
        }
        Ok(SessionStep::Moved { stage: to })
      }
      Transition::Rejected { reason } => Ok(SessionStep::Rejected { reason }),
      Transition::Completed => Ok(SessionStep::Completed),
    }
  }

  pub fn go_back(&mut self) -> bool {
    self.state.go_back()
  }

  /// Pregunta al colaborador de monetización por el trigger activo.
  pub async fn request_access(&mut self, trigger_id: Uuid) -> Result<SessionStep, WorkflowError> {
    let access = self.services.access.clone();
    let resolution = self.gate.request_access(trigger_id, access.as_ref()).await;
    self.apply_resolution(resolution)
  }

  /// Respuesta externa (p.ej. la pantalla de compra) para un trigger.
  pub fn resolve_gate(&mut self, trigger_id: Uuid, decision: GateDecision) -> Result<SessionStep, WorkflowError> {
    let resolution = self.gate.resolve(trigger_id, decision);
    self.apply_resolution(resolution)
  }

  /// Cierra el gate sin conceder: el avance pendiente se descarta.
  pub fn dismiss_gate(&mut self, trigger_id: Uuid) -> Result<SessionStep, WorkflowError> {
    let resolution = self.gate.dismiss(trigger_id);
    self.apply_resolution(resolution)
  }

  fn apply_resolution(&mut self, resolution: GateResolution<GatedAction>) -> Result<SessionStep, WorkflowError> {
    match resolution {
      GateResolution::Invoke(action) => {
        if self.state.current_stage_id() != Some(action.from.as_str()) {
          warn!("avance {} -> {} ya no aplica: el flujo está en {:?}",
                action.from,
                action.to,
                self.state.current_stage_id());
          return Ok(SessionStep::Stayed);
        }
        self.advance()
      }
      GateResolution::Discarded | GateResolution::Stale => Ok(SessionStep::Stayed),
    }
  }

  /// Lanza validar -> analizar bajo el kind actual, o se engancha a la tarea
  /// que ya esté en vuelo para ese kind.
  pub fn start_analysis(&mut self) -> Result<Uuid, WorkflowError> {
    let kind = self.kind().key();
    if let Some(task) = self.services.registry.get_task(&kind) {
      debug!("{}: ya hay una tarea {} en vuelo", kind, task.id());
      self.active_task = Some(task.id());
      return Ok(task.id());
    }
    let request = flows::build_request(self.feature, self.state.context())?;
    let pipeline = self.services.pipeline.clone();
    let handle = self.services
                     .registry
                     .spawn(&kind, self.services.config.supersede_policy, move |token| async move {
                       TaskOutcome::from(pipeline.run(&request, &token).await)
                     });
    info!("{}: análisis {} lanzado", kind, handle.id());
    self.active_task = Some(handle.id());
    Ok(handle.id())
  }

  /// Espera la tarea de la sesión y entrega su resultado. Sólo escribe si la
  /// tarea sigue siendo la registrada para el kind; después la retira.
  pub async fn await_result(&mut self) -> Result<SessionStep, WorkflowError> {
    let task_id = self.active_task
                      .ok_or_else(|| WorkflowError::Validation("no hay análisis en curso".into()))?;
    let kind = self.kind().key();
    let handle = match self.services.registry.get_task(&kind) {
      Some(handle) if handle.id() == task_id => handle,
      Some(other) => {
        debug!("{}: la tarea {} fue reemplazada por {}", kind, task_id, other.id());
        self.active_task = None;
        return Ok(SessionStep::Stayed);
      }
      None => {
        self.active_task = None;
        self.unwind()?;
        return Ok(SessionStep::Cancelled);
      }
    };
    let outcome = handle.wait().await;
    let still_registered = self.services.registry.get_task(&kind).is_some_and(|h| h.id() == task_id);
    self.active_task = None;
    match outcome {
      TaskOutcome::Completed(report) if still_registered => {
        let success = report.result.is_success();
        self.services.registry.finish(&kind, task_id);
        self.deliver(report)?;
        Ok(SessionStep::Delivered { success })
      }
      TaskOutcome::Completed(_) => {
        debug!("{}: resultado de {} descartado, ya no está registrada", kind, task_id);
        Ok(SessionStep::Stayed)
      }
      TaskOutcome::Cancelled => {
        self.unwind()?;
        Ok(SessionStep::Cancelled)
      }
    }
  }

  fn deliver(&mut self, report: PipelineReport) -> Result<(), WorkflowError> {
    self.state.store_result(report.result);
    self.state.set_data(FlowKey::MediaValidated, FlowValue::Flag(report.validated));
    self.jump_to_stage(Stage::is_results)?;
    // el resultado ya está entregado; un snapshot viejo sólo se reanudaría mal
    if let Err(e) = self.services.snapshots.clear(self.feature.as_str()) {
      warn!("{}: no se pudo borrar el snapshot: {}", self.feature, e);
    }
    Ok(())
  }

  /// Cancela el análisis del kind actual y avisa a las demás vistas.
  pub fn cancel(&mut self) -> Result<bool, WorkflowError> {
    let kind = self.kind().key();
    let cancelled = self.services.registry.cancel_analysis(&kind, true);
    self.active_task = None;
    if self.is_processing() {
      self.unwind()?;
    }
    Ok(cancelled)
  }

  /// Reacciona a un evento del bus. Una cancelación externa de nuestro kind
  /// sólo deshace el estado local: nunca vuelve a cancelar.
  pub fn handle_event(&mut self, event: &FlowEvent) -> Result<bool, WorkflowError> {
    match event {
      FlowEvent::AnalysisCancelled { kind } if self.active_task.is_some() && *kind == self.kind().key() => {
        info!("{}: cancelado desde fuera", kind);
        self.active_task = None;
        self.unwind()?;
        Ok(true)
      }
      _ => Ok(false),
    }
  }

  /// Procesa los eventos pendientes del bus. Devuelve cuántos cambiaron la
  /// sesión.
  pub fn poll_events(&mut self) -> Result<usize, WorkflowError> {
    let mut handled = 0;
    loop {
      match self.events.try_recv() {
        Ok(event) => {
          if self.handle_event(&event)? {
            handled += 1;
          }
        }
        Err(TryRecvError::Lagged(skipped)) => warn!("{}: se perdieron {} eventos", self.feature, skipped),
        Err(TryRecvError::Empty) | Err(TryRecvError::Closed) => break,
      }
    }
    Ok(handled)
  }

  /// Reintenta tras un fallo transitorio. Si la media ya había validado
  /// sólo se repite el análisis; si el fallo fue en la validación se repite
  /// el pipeline entero.
  pub fn retry(&mut self) -> Result<SessionStep, WorkflowError> {
    let retryable = matches!(self.state.context().outcome(), Some(PipelineResult::Failure(e)) if e.is_retryable());
    if !retryable {
      return Err(WorkflowError::Validation("no hay un fallo reintentable".into()));
    }
    let kind = self.kind().key();
    let request = flows::build_request(self.feature, self.state.context())?;
    let validated = self.state.context().flag(&FlowKey::MediaValidated) == Some(true);
    self.state.take_result();
    self.state.remove_data(&FlowKey::MediaValidated);
    self.jump_to_stage(Stage::is_processing)?;
    let pipeline = self.services.pipeline.clone();
    let handle = self.services
                     .registry
                     .spawn(&kind, self.services.config.supersede_policy, move |token| async move {
                       if validated {
                         TaskOutcome::from(pipeline.rerun_analysis(&request, &token).await)
                       } else {
                         TaskOutcome::from(pipeline.run(&request, &token).await)
                       }
                     });
    info!("{}: reintento {} lanzado (revalida: {})", kind, handle.id(), !validated);
    self.active_task = Some(handle.id());
    Ok(self.moved())
  }

  /// Descarta la media capturada y vuelve a la captura.
  pub fn recapture(&mut self) -> Result<SessionStep, WorkflowError> {
    self.state.take_result();
    self.state.remove_data(&FlowKey::MediaValidated);
    let capture = self.stage_id_where(Stage::is_media_capture)?;
    self.state.remove_data(&FlowKey::stage(&capture));
    self.state.jump_to(&capture)?;
    Ok(self.moved())
  }

  /// Aplica una de las acciones de recuperación que ofrece el error.
  pub fn recover(&mut self, action: RecoveryAction) -> Result<SessionStep, WorkflowError> {
    match action {
      RecoveryAction::TryAgain => self.retry(),
      RecoveryAction::Recapture => self.recapture(),
      RecoveryAction::Cancel => self.restart(),
    }
  }

  /// Vuelve al principio conservando sólo las claves retenidas por la
  /// definición. Cancela el análisis propio sin difundirlo.
  pub fn restart(&mut self) -> Result<SessionStep, WorkflowError> {
    if self.active_task.take().is_some() {
      let kind = self.kind().key();
      self.services.registry.cancel_analysis(&kind, false);
    }
    self.state.restart();
    self.services.snapshots.clear(self.feature.as_str())?;
    Ok(self.moved())
  }

  /// Resultado pendiente de mostrar, sin consumirlo.
  pub fn result(&self) -> Option<&PipelineResult> {
    self.state.context().outcome()
  }

  /// Consume el resultado: una segunda llamada devuelve None.
  pub fn take_result(&mut self) -> Option<PipelineResult> {
    self.state.take_result()
  }

  /// Decodifica el payload de éxito al DTO de la feature.
  pub fn decode_result<P: AnalysisPayload>(&self) -> Result<Option<P>, WorkflowError> {
    match self.result() {
      Some(PipelineResult::Success(value)) => Ok(Some(P::recover_from(value)?)),
      _ => Ok(None),
    }
  }

  /// Cierra la vista. La tarea en vuelo sigue en el registro (se devuelve su
  /// id) y, con `SnapshotPolicy::OnDismiss`, el progreso se guarda para
  /// reanudar.
  pub fn dismiss(self) -> Result<Option<Uuid>, WorkflowError> {
    if self.services.config.snapshot_policy == SnapshotPolicy::OnDismiss && !self.state.is_on_results() {
      if let Some(snapshot) = FlowSnapshot::capture(self.feature.as_str(), &self.state) {
        self.services.snapshots.save(&snapshot)?;
        debug!("{}: snapshot guardado en {}", self.feature, snapshot.current_stage_id);
      }
    }
    if let Some(task) = self.active_task {
      info!("{}: vista cerrada, la tarea {} sigue en segundo plano", self.feature, task);
    }
    Ok(self.active_task)
  }
}
