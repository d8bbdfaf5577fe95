// Archivo: stubs.rs
// Propósito: implementaciones en memoria para pruebas y wiring rápido.
//
// Incluye un almacén de media y de snapshots en memoria, un servicio de IA
// guionizado (resultados configurables, contadores de llamadas y fases que
// pueden quedarse "colgadas" hasta que el test las libere) y un proveedor de
// acceso fijo. No son durables y se usan para demos o pruebas locales.
use crate::context::MediaReference;
use crate::errors::{FlowError, Result};
use crate::gate::{AccessDecision, AccessProvider};
use crate::pipeline::{AnalysisRequest, AnalysisService, PipelineError, PipelineResult, ValidationOutcome};
use crate::repository::{MediaStore, SnapshotStore};
use crate::snapshot::FlowSnapshot;
use async_trait::async_trait;
use std::collections::{HashMap, HashSet, VecDeque};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Mutex, MutexGuard};
use tokio::sync::Notify;

/// Helper para mapear `Mutex::lock()` recuperando un mutex envenenado.
fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(|e| e.into_inner())
}

/// Almacén de media en memoria: las "rutas" son claves virtuales.
#[derive(Debug, Default)]
pub struct InMemoryMediaStore {
    files: Mutex<HashMap<PathBuf, Vec<u8>>>,
}

impl InMemoryMediaStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Simula que el sistema borró un archivo.
    pub fn delete(&self, path: &Path) -> bool {
        lock(&self.files).remove(path).is_some()
    }

    /// Registra una ruta existente sin pasar por `save_media`.
    pub fn insert(&self, path: impl Into<PathBuf>, bytes: Vec<u8>) {
        lock(&self.files).insert(path.into(), bytes);
    }
}

#[async_trait]
impl MediaStore for InMemoryMediaStore {
    async fn save_media(&self, bytes: &[u8], identifier: &str, flow_type: &str) -> Result<PathBuf> {
        if identifier.trim().is_empty() {
            return Err(FlowError::Storage("identificador de media vacío".into()));
        }
        let path = PathBuf::from(format!("memory://{}/{}", flow_type, identifier));
        lock(&self.files).insert(path.clone(), bytes.to_vec());
        Ok(path)
    }

    fn media_file_exists(&self, path: &Path) -> bool {
        lock(&self.files).contains_key(path)
    }
}

/// Snapshots en memoria indexados por `kind`.
#[derive(Debug, Default)]
pub struct InMemorySnapshotStore {
    snapshots: Mutex<HashMap<String, FlowSnapshot>>,
}

impl InMemorySnapshotStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl SnapshotStore for InMemorySnapshotStore {
    fn save(&self, snapshot: &FlowSnapshot) -> Result<()> {
        lock(&self.snapshots).insert(snapshot.kind.clone(), snapshot.clone());
        Ok(())
    }

    fn load(&self, kind: &str) -> Result<Option<FlowSnapshot>> {
        Ok(lock(&self.snapshots).get(kind).cloned())
    }

    fn clear(&self, kind: &str) -> Result<()> {
        lock(&self.snapshots).remove(kind);
        Ok(())
    }
}

/// Servicio de IA guionizado.
///
/// Por defecto valida todo y devuelve `Success({})`. `hold_validation` /
/// `hold_analysis` hacen que la fase correspondiente espere a
/// `release_validation` / `release_analysis`.
pub struct ScriptedAnalysisService {
    validation: Mutex<std::result::Result<ValidationOutcome, PipelineError>>,
    analysis: Mutex<VecDeque<PipelineResult>>,
    hold_validation: AtomicBool,
    hold_analysis: AtomicBool,
    validation_gate: Notify,
    analysis_gate: Notify,
    validate_calls: AtomicUsize,
    analyze_calls: AtomicUsize,
    seen_kinds: Mutex<HashSet<String>>,
}

impl Default for ScriptedAnalysisService {
    fn default() -> Self {
        Self::new()
    }
}

impl ScriptedAnalysisService {
    pub fn new() -> Self {
        Self { validation: Mutex::new(Ok(ValidationOutcome::Valid)),
               analysis: Mutex::new(VecDeque::from(vec![PipelineResult::Success(serde_json::json!({}))])),
               hold_validation: AtomicBool::new(false),
               hold_analysis: AtomicBool::new(false),
               validation_gate: Notify::new(),
               analysis_gate: Notify::new(),
               validate_calls: AtomicUsize::new(0),
               analyze_calls: AtomicUsize::new(0),
               seen_kinds: Mutex::new(HashSet::new()) }
    }

    /// Respuesta fija de `validate`.
    pub fn with_validation(self, outcome: ValidationOutcome) -> Self {
        *lock(&self.validation) = Ok(outcome);
        self
    }

    /// `validate` falla con `error` hasta que se cambie con `set_validation`.
    pub fn with_validation_error(self, error: PipelineError) -> Self {
        *lock(&self.validation) = Err(error);
        self
    }

    /// Cambia la respuesta de `validate` con el servicio ya compartido.
    pub fn set_validation(&self, outcome: std::result::Result<ValidationOutcome, PipelineError>) {
        *lock(&self.validation) = outcome;
    }

    pub fn with_analysis(self, result: PipelineResult) -> Self {
        self.queue_analysis(vec![result]);
        self
    }

    /// Respuestas sucesivas de `analyze`; la última se repite.
    pub fn queue_analysis(&self, results: Vec<PipelineResult>) {
        let mut queue = lock(&self.analysis);
        queue.clear();
        queue.extend(results);
    }

    /// `validate` espera a `release_validation`.
    pub fn hold_validation(self) -> Self {
        self.hold_validation.store(true, Ordering::SeqCst);
        self
    }

    /// `analyze` espera a `release_analysis`.
    pub fn hold_analysis(self) -> Self {
        self.hold_analysis.store(true, Ordering::SeqCst);
        self
    }

    pub fn release_validation(&self) {
        self.hold_validation.store(false, Ordering::SeqCst);
        self.validation_gate.notify_one();
    }

    pub fn release_analysis(&self) {
        self.hold_analysis.store(false, Ordering::SeqCst);
        self.analysis_gate.notify_one();
    }

    /// Llamadas a `validate` hasta ahora.
    pub fn validate_calls(&self) -> usize {
        self.validate_calls.load(Ordering::SeqCst)
    }

    /// Llamadas a `analyze` hasta ahora.
    pub fn analyze_calls(&self) -> usize {
        self.analyze_calls.load(Ordering::SeqCst)
    }

    /// Si algún `analyze` recibió ese kind.
    pub fn saw_kind(&self, kind: &str) -> bool {
        lock(&self.seen_kinds).contains(kind)
    }

    fn next_analysis(&self) -> PipelineResult {
        let mut queue = lock(&self.analysis);
        if queue.len() > 1 {
            if let Some(result) = queue.pop_front() {
                return result;
            }
        }
        queue.front()
             .cloned()
             .unwrap_or(PipelineResult::Failure(PipelineError::AiProcessingFailed("sin guion".into())))
    }
}

#[async_trait]
impl AnalysisService for ScriptedAnalysisService {
    async fn validate(&self, _media: &[MediaReference], kind: &str) -> std::result::Result<ValidationOutcome, PipelineError> {
        self.validate_calls.fetch_add(1, Ordering::SeqCst);
        lock(&self.seen_kinds).insert(kind.to_string());
        if self.hold_validation.load(Ordering::SeqCst) {
            self.validation_gate.notified().await;
        }
        lock(&self.validation).clone()
    }

    async fn analyze(&self, request: &AnalysisRequest) -> PipelineResult {
        self.analyze_calls.fetch_add(1, Ordering::SeqCst);
        lock(&self.seen_kinds).insert(request.kind.clone());
        if self.hold_analysis.load(Ordering::SeqCst) {
            self.analysis_gate.notified().await;
        }
        self.next_analysis()
    }
}

/// Proveedor de acceso con respuesta fija; cuenta las peticiones.
pub struct StaticAccessProvider {
    decision: AccessDecision,
    requests: AtomicUsize,
}

impl StaticAccessProvider {
    pub fn granting() -> Self {
        Self { decision: AccessDecision::Granted,
               requests: AtomicUsize::new(0) }
    }

    pub fn denying(reason: &str) -> Self {
        Self { decision: AccessDecision::Denied(reason.to_string()),
               requests: AtomicUsize::new(0) }
    }

    pub fn requests(&self) -> usize {
        self.requests.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl AccessProvider for StaticAccessProvider {
    async fn request_access(&self, _feature: &str) -> AccessDecision {
        self.requests.fetch_add(1, Ordering::SeqCst);
        self.decision.clone()
    }
}
