// Archivo: context.rs
// Propósito: "data bag" tipado del flujo. Un conjunto cerrado de claves
// (`FlowKey`) se asocia a valores etiquetados (`FlowValue`) para evitar
// casts en tiempo de ejecución al leer los datos acumulados por los stages.
use crate::pipeline::PipelineResult;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;

/// Clave bien conocida del data bag.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(tag = "type", content = "name", rename_all = "snake_case")]
pub enum FlowKey {
    /// Valor producido por un stage (opción elegida, media capturada...).
    Stage(String),
    /// Entrada libre del usuario específica de la feature.
    Input(String),
    /// Pre-selección aportada por quien abre la feature (p.ej. tipo de tiro).
    PreSelection(String),
    /// Resultado del pipeline; lo consume el stage de resultados.
    PipelineResult,
    /// La media actual superó la validación. Acompaña al resultado y decide
    /// si un reintento puede saltarse la validación.
    MediaValidated,
}

impl FlowKey {
    /// Clave del valor que produce el stage `id`.
    pub fn stage(id: &str) -> Self {
        FlowKey::Stage(id.to_string())
    }

    /// Clave de una entrada libre del usuario.
    pub fn input(name: &str) -> Self {
        FlowKey::Input(name.to_string())
    }

    /// Clave de una pre-selección hecha antes de abrir el flujo.
    pub fn pre_selection(name: &str) -> Self {
        FlowKey::PreSelection(name.to_string())
    }
}

/// Tipo de media aceptado por un stage de captura.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaKind {
    Image,
    Video,
}

/// Referencia a media guardada en disco. El motor nunca interpreta bytes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MediaReference {
    pub path: PathBuf,
    pub kind: MediaKind,
}

impl MediaReference {
    /// Referencia a `path`, sin comprobar que exista.
    pub fn new(path: impl Into<PathBuf>, kind: MediaKind) -> Self {
        Self { path: path.into(), kind }
    }
}

/// Valor etiquetado almacenado en el data bag.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum FlowValue {
    /// Id de la opción elegida en un stage de selección.
    Choice(String),
    /// Media capturada, en orden de captura.
    Media(Vec<MediaReference>),
    Text(String),
    Number(f64),
    Flag(bool),
    Outcome(PipelineResult),
}

/// Data bag de un flujo: claves únicas, orden de inserción irrelevante.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FlowContext {
    values: HashMap<FlowKey, FlowValue>,
}

impl FlowContext {
    /// Bag vacío.
    pub fn new() -> Self {
        Self::default()
    }

    /// Upsert sin validación; la validación la dirigen los stages.
    pub fn set(&mut self, key: FlowKey, value: FlowValue) {
        self.values.insert(key, value);
    }

    /// Valor crudo de `key`.
    pub fn get(&self, key: &FlowKey) -> Option<&FlowValue> {
        self.values.get(key)
    }

    /// Quita `key` y devuelve su valor, si lo había.
    pub fn remove(&mut self, key: &FlowKey) -> Option<FlowValue> {
        self.values.remove(key)
    }

    /// Si `key` tiene valor, sea del tipo que sea.
    pub fn contains(&self, key: &FlowKey) -> bool {
        self.values.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Conserva sólo las claves para las que `keep` devuelve true.
    pub fn retain(&mut self, keep: impl Fn(&FlowKey) -> bool) {
        self.values.retain(|k, _| keep(k));
    }

    /// Pares clave/valor en orden arbitrario.
    pub fn iter(&self) -> impl Iterator<Item = (&FlowKey, &FlowValue)> {
        self.values.iter()
    }

    // Accesores tipados: None si falta la clave o el valor es de otro tipo.

    /// Opción elegida bajo `key`.
    pub fn choice(&self, key: &FlowKey) -> Option<&str> {
        match self.values.get(key) {
            Some(FlowValue::Choice(c)) => Some(c.as_str()),
            _ => None,
        }
    }

    /// Media capturada bajo `key`.
    pub fn media(&self, key: &FlowKey) -> Option<&[MediaReference]> {
        match self.values.get(key) {
            Some(FlowValue::Media(m)) => Some(m.as_slice()),
            _ => None,
        }
    }

    /// Texto libre bajo `key`.
    pub fn text(&self, key: &FlowKey) -> Option<&str> {
        match self.values.get(key) {
            Some(FlowValue::Text(t)) => Some(t.as_str()),
            _ => None,
        }
    }

    /// Número bajo `key`.
    pub fn number(&self, key: &FlowKey) -> Option<f64> {
        match self.values.get(key) {
            Some(FlowValue::Number(n)) => Some(*n),
            _ => None,
        }
    }

    /// Booleano bajo `key`.
    pub fn flag(&self, key: &FlowKey) -> Option<bool> {
        match self.values.get(key) {
            Some(FlowValue::Flag(b)) => Some(*b),
            _ => None,
        }
    }

    /// Resultado del pipeline pendiente de mostrar.
    pub fn outcome(&self) -> Option<&PipelineResult> {
        match self.values.get(&FlowKey::PipelineResult) {
            Some(FlowValue::Outcome(r)) => Some(r),
            _ => None,
        }
    }

    /// Todas las referencias de media presentes en el bag.
    pub fn all_media(&self) -> Vec<&MediaReference> {
        self.values
            .values()
            .filter_map(|v| match v {
                FlowValue::Media(m) => Some(m.iter()),
                _ => None,
            })
            .flatten()
            .collect()
    }
}
