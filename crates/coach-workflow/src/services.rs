use crate::{WorkflowConfig, WorkflowError};
use flow::{AccessProvider, AnalysisPipeline, AnalysisService, BackgroundTaskRegistry, FlowEventBus, MediaStore,
           PipelineReport, SnapshotStore};
use std::sync::Arc;

/// Servicios compartidos por todas las sesiones de feature del proceso.
///
/// El registro de tareas vive aquí y no en la sesión: una sesión cerrada
/// puede dejar su análisis corriendo y otra sesión de la misma feature se
/// engancha a él.
#[derive(Clone)]
pub struct CoachServices {
  pub config: WorkflowConfig,
  pub registry: Arc<BackgroundTaskRegistry<PipelineReport>>,
  pub pipeline: AnalysisPipeline,
  pub access: Arc<dyn AccessProvider>,
  pub media: Arc<dyn MediaStore>,
  pub snapshots: Arc<dyn SnapshotStore>,
}

impl CoachServices {
  pub fn new(config: WorkflowConfig,
             analysis: Arc<dyn AnalysisService>,
             access: Arc<dyn AccessProvider>,
             media: Arc<dyn MediaStore>,
             snapshots: Arc<dyn SnapshotStore>)
             -> Self {
    let bus = FlowEventBus::new(config.event_bus_capacity);
    Self { registry: Arc::new(BackgroundTaskRegistry::new(bus)),
           pipeline: AnalysisPipeline::new(analysis),
           config,
           access,
           media,
           snapshots }
  }

  /// Configuración y almacenamiento en disco desde el entorno
  /// (`COACH_STORAGE_DIR`, `COACH_*_POLICY`, `COACH_EVENT_CAPACITY`).
  pub fn from_env(analysis: Arc<dyn AnalysisService>, access: Arc<dyn AccessProvider>) -> Result<Self, WorkflowError> {
    let config = WorkflowConfig::from_env()?;
    let storage = coach_persistence::new_from_env();
    Ok(Self::new(config, analysis, access, storage.media, storage.snapshots))
  }

  pub fn bus(&self) -> &FlowEventBus {
    self.registry.bus()
  }
}
