//! Common data model shared by every format adapter.

mod analysis;
mod catalog;
mod mappings;
mod validation;

pub use analysis::{AnalysisMetadata, Framework, StandardizedAnalysis};
pub use catalog::SystemEntity;
pub use mappings::{
    ControlMapping, ControlType, EntityMapping, EntityType, RelationshipMapping, RiskMapping,
    Severity, ThreatMapping,
};
pub use validation::ValidationResult;

/// Clamp a confidence value into [0, 1].
///
/// Every automatically inferred fact carries a confidence; adapters build
/// them from heuristic arithmetic, so the bounds are enforced here rather
/// than trusted at each call site.
#[must_use]
pub fn clamp_confidence(value: f64) -> f64 {
    value.clamp(0.0, 1.0)
}
