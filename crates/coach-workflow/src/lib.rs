//! coach-workflow: features de análisis del coach
//!
//! Define las features concretas (Shot Rater, Stick Analyzer, AI Coach) sobre
//! el motor genérico del crate `flow` y la `FeatureSession` que las conduce:
//! navegación, gate de monetización, análisis en segundo plano, entrega de
//! resultados y reanudación desde snapshot.

pub mod config;
pub mod errors;
pub mod factory;
pub mod flows;
pub mod services;
pub mod session;

pub use config::{SnapshotPolicy, WorkflowConfig};
pub use errors::WorkflowError;
pub use factory::FlowFactory;
pub use services::CoachServices;
pub use session::{FeatureSession, GatedAction, SessionStep};
