// Archivo: registry.rs
// Propósito: registro de tareas en segundo plano indexado por `kind`. Separa
// la vida de una validación/análisis de la vida de la sesión que la inició:
// la tarea pertenece al registro y la sesión sólo guarda la clave.
use crate::events::{FlowEvent, FlowEventBus};
use crate::pipeline::{PipelineOutcome, PipelineReport};
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use log::{debug, info};
use serde::{Deserialize, Serialize};
use std::future::Future;
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

/// Estado observable de una tarea.
#[derive(Debug, Clone, PartialEq)]
pub enum TaskStatus<T> {
    Running,
    Completed(T),
    Cancelled,
}

/// Desenlace de una tarea terminada.
#[derive(Debug, Clone, PartialEq)]
pub enum TaskOutcome<T> {
    Completed(T),
    Cancelled,
}

impl From<PipelineOutcome> for TaskOutcome<PipelineReport> {
    fn from(outcome: PipelineOutcome) -> Self {
        match outcome {
            PipelineOutcome::Finished(result) => TaskOutcome::Completed(PipelineReport { result, validated: true }),
            PipelineOutcome::NotValidated(result) => TaskOutcome::Completed(PipelineReport { result, validated: false }),
            PipelineOutcome::Cancelled => TaskOutcome::Cancelled,
        }
    }
}

/// Qué hacer con la tarea previa al registrar otra del mismo `kind`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SupersedePolicy {
    /// Cancelar la tarea anterior.
    #[default]
    Cancel,
    /// Dejarla terminar sin dueño; su resultado no se entrega.
    Orphan,
}

/// Handle cancelable de una tarea. Clonarlo no duplica el trabajo: todos los
/// clones observan la misma ejecución.
#[derive(Clone)]
pub struct TaskHandle<T> {
    id: Uuid,
    kind: String,
    started_at: DateTime<Utc>,
    token: CancellationToken,
    status: watch::Receiver<TaskStatus<T>>,
}

impl<T> std::fmt::Debug for TaskHandle<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TaskHandle")
         .field("id", &self.id)
         .field("kind", &self.kind)
         .field("started_at", &self.started_at)
         .field("cancelled", &self.token.is_cancelled())
         .finish()
    }
}

impl<T> TaskHandle<T> where T: Clone + Send + Sync + 'static
{
    /// Lanza `work` en el runtime de tokio actual. El trabajo recibe el token
    /// de cancelación; una tarea cancelada nunca publica `Completed`.
    pub fn spawn<F, Fut>(kind: &str, work: F) -> Self
        where F: FnOnce(CancellationToken) -> Fut,
              Fut: Future<Output = TaskOutcome<T>> + Send + 'static
    {
        let token = CancellationToken::new();
        let (tx, rx) = watch::channel(TaskStatus::Running);
        let fut = work(token.clone());
        let guard = token.clone();
        tokio::spawn(async move {
            let outcome = tokio::select! {
                _ = guard.cancelled() => TaskOutcome::Cancelled,
                o = fut => o,
            };
            let status = match outcome {
                TaskOutcome::Completed(v) if !guard.is_cancelled() => TaskStatus::Completed(v),
                _ => TaskStatus::Cancelled,
            };
            let _ = tx.send(status);
        });
        Self { id: Uuid::new_v4(),
               kind: kind.to_string(),
               started_at: Utc::now(),
               token,
               status: rx }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn kind(&self) -> &str {
        &self.kind
    }

    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    pub fn status(&self) -> TaskStatus<T> {
        self.status.borrow().clone()
    }

    pub fn is_finished(&self) -> bool {
        !matches!(*self.status.borrow(), TaskStatus::Running)
    }

    /// Cancela la tarea. Idempotente; sobre una tarea ya terminada no
    /// cambia el resultado entregado.
    pub fn cancel(&self) {
        self.token.cancel();
    }

    /// Espera el desenlace. Varias vistas pueden esperar la misma tarea.
    pub async fn wait(&self) -> TaskOutcome<T> {
        let mut rx = self.status.clone();
        loop {
            let current = settled(&rx.borrow_and_update());
            if let Some(outcome) = current {
                return outcome;
            }
            if rx.changed().await.is_err() {
                // el emisor desapareció sin resultado (p.ej. panic)
                let last = settled(&rx.borrow());
                return last.unwrap_or(TaskOutcome::Cancelled);
            }
        }
    }
}

fn settled<T: Clone>(status: &TaskStatus<T>) -> Option<TaskOutcome<T>> {
    match status {
        TaskStatus::Running => None,
        TaskStatus::Completed(v) => Some(TaskOutcome::Completed(v.clone())),
        TaskStatus::Cancelled => Some(TaskOutcome::Cancelled),
    }
}

/// Tabla compartida de tareas en vuelo, como mucho una activa por `kind`.
///
/// Se pasa explícitamente a cada feature (no es un singleton), de modo que
/// los tests pueden crear registros independientes.
pub struct BackgroundTaskRegistry<T> {
    entries: DashMap<String, TaskHandle<T>>,
    bus: FlowEventBus,
}

impl<T> BackgroundTaskRegistry<T> where T: Clone + Send + Sync + 'static
{
    pub fn new(bus: FlowEventBus) -> Self {
        Self { entries: DashMap::new(), bus }
    }

    pub fn bus(&self) -> &FlowEventBus {
        &self.bus
    }

    /// Lanza una tarea y la registra bajo `kind`.
    pub fn spawn<F, Fut>(&self, kind: &str, policy: SupersedePolicy, work: F) -> TaskHandle<T>
        where F: FnOnce(CancellationToken) -> Fut,
              Fut: Future<Output = TaskOutcome<T>> + Send + 'static
    {
        let handle = TaskHandle::spawn(kind, work);
        self.set_task(kind, handle.clone(), policy);
        self.bus.publish(FlowEvent::AnalysisStarted { kind: kind.to_string() });
        handle
    }

    /// Guarda el handle reemplazando la tarea previa del mismo `kind`, que se
    /// cancela salvo `SupersedePolicy::Orphan`. Devuelve la reemplazada.
    pub fn set_task(&self, kind: &str, handle: TaskHandle<T>, policy: SupersedePolicy) -> Option<TaskHandle<T>> {
        let new_id = handle.id();
        let previous = self.entries.insert(kind.to_string(), handle);
        if let Some(prev) = &previous {
            if prev.id() != new_id {
                match policy {
                    SupersedePolicy::Cancel => {
                        info!("tarea {} de {} reemplazada y cancelada", prev.id(), kind);
                        prev.cancel();
                    }
                    SupersedePolicy::Orphan => debug!("tarea {} de {} queda huérfana", prev.id(), kind),
                }
            }
        }
        previous
    }

    /// Permite a una vista recién presentada engancharse a la tarea en vuelo
    /// en lugar de lanzar un duplicado.
    pub fn get_task(&self, kind: &str) -> Option<TaskHandle<T>> {
        self.entries.get(kind).map(|e| e.value().clone())
    }

    /// Cancela y retira la tarea de `kind`. Idempotente. Con `broadcast`
    /// publica `AnalysisCancelled`, pero sólo si había entrada: así un
    /// oyente que reaccione cancelando de nuevo no genera otro evento.
    pub fn cancel_analysis(&self, kind: &str, broadcast: bool) -> bool {
        match self.entries.remove(kind) {
            Some((_, handle)) => {
                info!("cancelando tarea {} de {}", handle.id(), kind);
                handle.cancel();
                if broadcast {
                    self.bus.publish(FlowEvent::AnalysisCancelled { kind: kind.to_string() });
                }
                true
            }
            None => false,
        }
    }

    /// Retira la entrada tras entregar el resultado, sólo si sigue siendo
    /// la misma tarea (una más nueva no se toca).
    pub fn finish(&self, kind: &str, task_id: Uuid) -> bool {
        let removed = self.entries.remove_if(kind, |_, h| h.id() == task_id).is_some();
        if removed {
            self.bus.publish(FlowEvent::AnalysisFinished { kind: kind.to_string() });
        }
        removed
    }

    pub fn active_kinds(&self) -> Vec<String> {
        self.entries.iter().map(|e| e.key().clone()).collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<T> Default for BackgroundTaskRegistry<T> where T: Clone + Send + Sync + 'static
{
    fn default() -> Self {
        Self::new(FlowEventBus::default())
    }
}
