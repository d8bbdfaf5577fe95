// Archivo: stage.rs
// Propósito: definir `Stage`, la unidad de trabajo/UI de un flujo, como un
// tipo de variantes cerradas con una capacidad de validación compartida.
use crate::context::{FlowContext, FlowKey, MediaKind};
use serde::{Deserialize, Serialize};

/// Opción de un stage de selección.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SelectionOption {
    pub id: String,
    pub title: String,
    pub subtitle: Option<String>,
    pub icon: Option<String>,
}

impl SelectionOption {
    /// Opción sin subtítulo ni icono.
    pub fn new(id: &str, title: &str) -> Self {
        Self { id: id.to_string(),
               title: title.to_string(),
               subtitle: None,
               icon: None }
    }

    pub fn with_subtitle(mut self, subtitle: &str) -> Self {
        self.subtitle = Some(subtitle.to_string());
        self
    }

    /// Nombre del icono a mostrar junto a la opción.
    pub fn with_icon(mut self, icon: &str) -> Self {
        self.icon = Some(icon.to_string());
        self
    }
}

/// Payload propio de cada variante de stage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "variant", rename_all = "snake_case")]
pub enum StageKind {
    /// Lista ordenada de opciones; la elegida se guarda bajo
    /// `FlowKey::Stage(id)`.
    Selection { options: Vec<SelectionOption> },
    /// Captura de media; las referencias se guardan bajo `FlowKey::Stage(id)`.
    MediaCapture {
        accepted: Vec<MediaKind>,
        min_items: usize,
        max_items: usize,
        instructions: String,
    },
    /// Validación/análisis en curso. Sólo valida cuando el resultado del
    /// pipeline ya está en el data bag.
    Processing {
        message: String,
        shows_header: bool,
        shows_cancel: bool,
    },
    /// Stage terminal: muestra el resultado o el error del pipeline.
    Results,
    /// Stage específico de una feature. `required_keys` deben existir en el
    /// data bag para que el stage valide.
    Custom { tag: String, required_keys: Vec<FlowKey> },
}

/// Resultado de validar un stage contra el data bag.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StageValidation {
    Valid,
    Invalid(String),
}

impl StageValidation {
    /// True para `Valid`.
    pub fn is_valid(&self) -> bool {
        matches!(self, StageValidation::Valid)
    }
}

/// Un paso con nombre dentro de un flujo.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Stage {
    pub id: String,
    pub title: String,
    pub subtitle: Option<String>,
    pub is_required: bool,
    pub can_skip: bool,
    pub can_go_back: bool,
    pub kind: StageKind,
}

impl Stage {
    fn new(id: &str, title: &str, kind: StageKind) -> Self {
        Self { id: id.to_string(),
               title: title.to_string(),
               subtitle: None,
               is_required: true,
               can_skip: false,
               can_go_back: true,
               kind }
    }

    /// Stage de selección entre `options`, en el orden dado.
    pub fn selection(id: &str, title: &str, options: Vec<SelectionOption>) -> Self {
        Self::new(id, title, StageKind::Selection { options })
    }

    /// Stage de captura que acepta entre `min_items` y `max_items` archivos
    /// de los tipos `accepted`.
    pub fn media_capture(id: &str,
                         title: &str,
                         accepted: Vec<MediaKind>,
                         min_items: usize,
                         max_items: usize,
                         instructions: &str)
                         -> Self {
        Self::new(id,
                  title,
                  StageKind::MediaCapture { accepted,
                                            min_items,
                                            max_items,
                                            instructions: instructions.to_string() })
    }

    /// Stage de procesamiento. No se puede volver atrás desde él mientras
    /// el análisis está en curso; se sale cancelando.
    pub fn processing(id: &str, title: &str, message: &str) -> Self {
        let mut stage = Self::new(id,
                                  title,
                                  StageKind::Processing { message: message.to_string(),
                                                          shows_header: true,
                                                          shows_cancel: true });
        stage.can_go_back = false;
        stage
    }

    /// Stage de resultados. No permite volver atrás: el stage anterior es el
    /// de procesamiento y ya no hay análisis que mostrar; se sale con una
    /// recaptura o un reinicio.
    pub fn results(id: &str, title: &str) -> Self {
        Self::new(id, title, StageKind::Results).locked_back()
    }

    /// Stage propio de una feature; valida que existan `required_keys`.
    pub fn custom(id: &str, title: &str, tag: &str, required_keys: Vec<FlowKey>) -> Self {
        Self::new(id, title, StageKind::Custom { tag: tag.to_string(), required_keys })
    }

    pub fn with_subtitle(mut self, subtitle: &str) -> Self {
        self.subtitle = Some(subtitle.to_string());
        self
    }

    /// Marca el stage como no requerido: `proceed` no lo valida.
    pub fn optional(mut self) -> Self {
        self.is_required = false;
        self
    }

    /// El usuario puede saltarlo; implica no requerido.
    pub fn skippable(mut self) -> Self {
        self.can_skip = true;
        self.is_required = false;
        self
    }

    /// Impide `go_back` desde este stage.
    pub fn locked_back(mut self) -> Self {
        self.can_go_back = false;
        self
    }

    /// Clave bajo la que el stage guarda su valor.
    pub fn key(&self) -> FlowKey {
        FlowKey::stage(&self.id)
    }

    pub fn is_processing(&self) -> bool {
        matches!(self.kind, StageKind::Processing { .. })
    }

    pub fn is_results(&self) -> bool {
        matches!(self.kind, StageKind::Results)
    }

    pub fn is_media_capture(&self) -> bool {
        matches!(self.kind, StageKind::MediaCapture { .. })
    }

    /// Valida el stage contra los datos acumulados.
    pub fn validate(&self, ctx: &FlowContext) -> StageValidation {
        match &self.kind {
            StageKind::Selection { options } => match ctx.choice(&self.key()) {
                None => StageValidation::Invalid(format!("'{}' requiere elegir una opción", self.title)),
                Some(choice) if options.iter().any(|o| o.id == choice) => StageValidation::Valid,
                Some(choice) => StageValidation::Invalid(format!("opción desconocida '{}'", choice)),
            },
            StageKind::MediaCapture { accepted,
                                      min_items,
                                      max_items,
                                      .. } => {
                let items = ctx.media(&self.key()).unwrap_or(&[]);
                if items.len() < *min_items {
                    return StageValidation::Invalid(format!("se requieren al menos {} archivos de media (hay {})",
                                                            min_items,
                                                            items.len()));
                }
                if items.len() > *max_items {
                    return StageValidation::Invalid(format!("se admiten como máximo {} archivos de media (hay {})",
                                                            max_items,
                                                            items.len()));
                }
                match items.iter().find(|m| !accepted.contains(&m.kind)) {
                    Some(bad) => StageValidation::Invalid(format!("tipo de media no aceptado: {:?}", bad.kind)),
                    None => StageValidation::Valid,
                }
            }
            StageKind::Custom { required_keys, .. } => match required_keys.iter().find(|k| !ctx.contains(k)) {
                Some(missing) => StageValidation::Invalid(format!("falta el dato requerido {:?}", missing)),
                None => StageValidation::Valid,
            },
            StageKind::Processing { .. } => match ctx.outcome() {
                Some(_) => StageValidation::Valid,
                None => StageValidation::Invalid(format!("'{}' sigue en curso: aún no hay resultado", self.title)),
            },
            StageKind::Results => StageValidation::Valid,
        }
    }
}
