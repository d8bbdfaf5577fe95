//! Crate `flow`: motor genérico de flujos de análisis por stages
//!
//! Este crate define los stages (`Stage`), el contrato de catálogo y
//! navegación (`FlowDefinition`), el cursor vivo (`FlowState`) con su data
//! bag tipado, el registro de tareas en segundo plano
//! (`BackgroundTaskRegistry`), el pipeline validar -> analizar, el gate de
//! monetización y los snapshots para reanudar tras reiniciar el proceso.
//! También incluye implementaciones en memoria útiles para pruebas
//! (`stubs`).
//!
//! Diseño resumido:
//! - Stages como variantes cerradas con validación compartida.
//! - Navegación pura: `next_stage`/`previous_stage` dependen sólo del stage
//!   actual y del data bag.
//! - Las tareas pertenecen al registro, no a la sesión que las lanzó; la
//!   sesión sólo guarda el `kind`.
//! - Fallos de validación/análisis viajan como datos hasta Results; la
//!   cancelación es un desenlace distinto.
//!
//! Ejemplo rápido:
//! ```rust
//! use flow::{FlowState, LinearFlow, PipelineResult, Stage, Transition};
//! use std::sync::Arc;
//! let def = LinearFlow::new("demo", vec![Stage::processing("run", "Analizando", "..."),
//!                                        Stage::results("done", "Resultado")]).unwrap();
//! let mut state = FlowState::new(Arc::new(def));
//! state.start();
//! // sin resultado del pipeline el stage de procesamiento no avanza
//! assert!(matches!(state.proceed(), Transition::Rejected { .. }));
//! state.store_result(PipelineResult::Success(serde_json::json!({})));
//! assert!(matches!(state.proceed(), Transition::Advanced { .. }));
//! assert!(state.is_on_results());
//! ```
pub mod context;
pub mod definition;
pub mod errors;
pub mod events;
pub mod gate;
pub mod pipeline;
pub mod registry;
pub mod repository;
pub mod snapshot;
pub mod stage;
pub mod state;
pub mod stubs;

pub use context::*;
pub use definition::*;
pub use errors::*;
pub use events::*;
pub use gate::*;
pub use pipeline::*;
pub use registry::*;
pub use repository::*;
pub use snapshot::*;
pub use stage::*;
pub use state::*;
pub use stubs::*;
