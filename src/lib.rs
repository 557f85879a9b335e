//! CONVERGE - Threat-model import and reconciliation library.
//!
//! This library ingests threat-model exports from heterogeneous tools and
//! methodologies (diagram-tool exports, delimited threat lists, structured
//! risk documents, schema-free CSV) and converts each into one standardized
//! analysis model, reconciles the extracted entities against a caller's
//! system catalog, and normalizes severities and risk scores onto a shared
//! 0-10 scale.
//!
//! # Example
//!
//! ```no_run
//! use converge::{AdapterRegistry, ImportItem};
//!
//! let registry = AdapterRegistry::new();
//! let csv = std::fs::read_to_string("threats.csv").unwrap();
//! let outcome = registry.import_item(&ImportItem::new("threats", csv));
//!
//! if let Some(analysis) = &outcome.analysis {
//!     for threat in &analysis.threats {
//!         println!("{}: {} ({:?})", threat.original_id, threat.name, threat.severity);
//!     }
//! }
//! ```

pub mod adapters;
pub mod cli;
pub mod error;
pub mod output;
pub mod parser;
pub mod reconcile;
pub mod registry;
pub mod severity;
pub mod similarity;
pub mod types;

// Re-export commonly used types at crate root
pub use adapters::{detect_format, Format, FormatAdapter, InputKind, RawData};
pub use error::{ConvergeError, Result};
pub use reconcile::{EntityMatch, MatchThresholds, MatchWeights, ReconciliationResult};
pub use registry::{AdapterRegistry, ImportItem, ImportOutcome};
pub use types::{
    AnalysisMetadata, ControlMapping, ControlType, EntityMapping, EntityType, Framework,
    RelationshipMapping, RiskMapping, Severity, StandardizedAnalysis, SystemEntity, ThreatMapping,
    ValidationResult,
};

/// Import a single in-memory document with a fresh default registry.
///
/// Convenience wrapper for callers that do not need adapter customization
/// or batching.
#[must_use]
pub fn import_str(content: &str, file_name: Option<&str>) -> ImportOutcome {
    let registry = AdapterRegistry::new();
    let mut item = ImportItem::new(file_name.unwrap_or("inline"), content);
    item.file_name = file_name.map(str::to_string);
    registry.import_item(&item)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_import_str_detects_threat_list() {
        let outcome = import_str(
            "Threat,Category,Asset,Mitigation\nSQLi,Tampering,Web API,Validate input\n",
            Some("export.csv"),
        );
        assert!(outcome.success);
        assert_eq!(outcome.format.as_deref(), Some("threat-list"));
        let analysis = outcome.analysis.unwrap();
        assert_eq!(analysis.metadata.file_name.as_deref(), Some("export.csv"));
    }
}
