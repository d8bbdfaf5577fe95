// Archivo: definition.rs
// Propósito: definir el contrato `FlowDefinition` (catálogo ordenado de
// stages + reglas de navegación) y `StageCatalog`, la lista ordenada con ids
// únicos que reutilizan las definiciones concretas.
use crate::context::{FlowContext, FlowKey};
use crate::errors::{FlowError, Result};
use crate::stage::Stage;
use indexmap::IndexMap;

/// Catálogo ordenado e inmutable de stages con ids únicos.
#[derive(Debug, Clone)]
pub struct StageCatalog {
    stages: Vec<Stage>,
    index: IndexMap<String, usize>,
}

impl StageCatalog {
    /// Construye el catálogo. Falla si está vacío o si hay ids duplicados.
    pub fn new(stages: Vec<Stage>) -> Result<Self> {
        if stages.is_empty() {
            return Err(FlowError::Validation("un flujo necesita al menos un stage".into()));
        }
        let mut index = IndexMap::with_capacity(stages.len());
        for (i, stage) in stages.iter().enumerate() {
            if index.insert(stage.id.clone(), i).is_some() {
                return Err(FlowError::Validation(format!("stage id duplicado: {}", stage.id)));
            }
        }
        Ok(Self { stages, index })
    }

    /// Stages en orden de definición.
    pub fn stages(&self) -> &[Stage] {
        &self.stages
    }

    /// Posición del stage `id`.
    pub fn index_of(&self, id: &str) -> Option<usize> {
        self.index.get(id).copied()
    }

    /// Stage por id.
    pub fn get(&self, id: &str) -> Option<&Stage> {
        self.index_of(id).map(|i| &self.stages[i])
    }

    /// Stage por posición.
    pub fn at(&self, i: usize) -> Option<&Stage> {
        self.stages.get(i)
    }
}

/// Contrato de un flujo. `next_stage` y `previous_stage` deben ser funciones
/// puras y deterministas de `(stage actual, data bag)`: recalcularlas tras un
/// reinicio del proceso reproduce la misma secuencia de stages.
pub trait FlowDefinition: Send + Sync {
    /// Nombre estable del flujo (se guarda en los snapshots).
    fn name(&self) -> &str;

    fn catalog(&self) -> &StageCatalog;

    fn stages(&self) -> &[Stage] {
        self.catalog().stages()
    }

    /// Claves del data bag que sobreviven a `restart()`.
    fn retained_keys(&self) -> &[FlowKey] {
        &[]
    }

    /// Capacidad de pago requerida por la transición `from -> to`, si
    /// existe. La definición sólo la declara; el cobro lo resuelve el gate.
    fn gated_capability(&self, _from: &Stage, _to: &Stage) -> Option<&str> {
        None
    }

    fn stage(&self, id: &str) -> Option<&Stage> {
        self.catalog().get(id)
    }

    fn first_stage(&self) -> Option<&Stage> {
        self.catalog().at(0)
    }

    fn index_of(&self, id: &str) -> Option<usize> {
        self.catalog().index_of(id)
    }

    /// Siguiente stage. `None` como actual significa "flujo sin iniciar".
    /// Por defecto lineal (índice + 1).
    fn next_stage(&self, current: Option<&str>, _ctx: &FlowContext) -> Option<&Stage> {
        match current {
            None => self.first_stage(),
            Some(id) => self.index_of(id).and_then(|i| self.catalog().at(i + 1)),
        }
    }

    /// Stage anterior. Por defecto lineal (índice - 1).
    fn previous_stage(&self, current: &str, _ctx: &FlowContext) -> Option<&Stage> {
        self.index_of(current)
            .and_then(|i| i.checked_sub(1))
            .and_then(|i| self.catalog().at(i))
    }
}

/// Definición lineal lista para usar.
#[derive(Debug, Clone)]
pub struct LinearFlow {
    name: String,
    catalog: StageCatalog,
    retained: Vec<FlowKey>,
}

impl LinearFlow {
    pub fn new(name: &str, stages: Vec<Stage>) -> Result<Self> {
        Ok(Self { name: name.to_string(),
                  catalog: StageCatalog::new(stages)?,
                  retained: Vec::new() })
    }

    pub fn retaining(mut self, keys: Vec<FlowKey>) -> Self {
        self.retained = keys;
        self
    }
}

impl FlowDefinition for LinearFlow {
    fn name(&self) -> &str {
        &self.name
    }

    fn catalog(&self) -> &StageCatalog {
        &self.catalog
    }

    fn retained_keys(&self) -> &[FlowKey] {
        &self.retained
    }
}
