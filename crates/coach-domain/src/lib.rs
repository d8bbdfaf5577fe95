mod errors;
mod feature;
mod kind;
mod results;
mod shot;

pub use errors::DomainError;
pub use feature::FeatureKind;
pub use kind::AnalysisKind;
pub use results::{AnalysisPayload, CoachReport, Curve, ShotAnalysis, StickRecommendation};
pub use shot::{PlayerProfile, Position, ShotType};
