//! The standardized analysis - the one common output of every adapter.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::mappings::{
    ControlMapping, EntityMapping, RelationshipMapping, RiskMapping, ThreatMapping,
};

/// Canonical name of the originating methodology.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum Framework {
    Stride,
    Pasta,
    Attack,
    #[default]
    Custom,
}

impl Framework {
    /// Map a free-form framework label onto the enumeration. Unrecognized
    /// input maps to `Custom`.
    #[must_use]
    pub fn from_label(label: &str) -> Self {
        match label.trim().to_lowercase().as_str() {
            "stride" => Self::Stride,
            "pasta" => Self::Pasta,
            "attack" | "att&ck" | "attack-tree" => Self::Attack,
            _ => Self::Custom,
        }
    }
}

/// Provenance and trust information for one transform.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisMetadata {
    /// Source label (adapter name or tool name)
    pub source: String,
    /// Wall-clock import timestamp
    pub imported_at: DateTime<Utc>,
    /// Version of the adapter that produced this analysis
    pub adapter_version: String,
    /// Overall transform trust, [0, 1]
    pub confidence: f64,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub author: Option<String>,
    /// Originating file name, when the caller supplied one
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub file_name: Option<String>,
}

/// Common analysis model produced by every format adapter.
///
/// Immutable once produced by `transform`: reconciliation and risk
/// extraction take it by reference and return new derived results. List
/// order is insertion order (first appearance in the source).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StandardizedAnalysis {
    pub framework: Framework,
    pub metadata: AnalysisMetadata,
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub entities: Vec<EntityMapping>,
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub relationships: Vec<RelationshipMapping>,
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub threats: Vec<ThreatMapping>,
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub controls: Vec<ControlMapping>,
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub risks: Vec<RiskMapping>,
    /// Opaque retained copy of the parsed input, for traceability and
    /// re-export. Never interpreted by downstream consumers.
    #[serde(skip_serializing_if = "serde_json::Value::is_null", default)]
    pub original_data: serde_json::Value,
}

impl StandardizedAnalysis {
    /// Create an empty analysis for the given framework, timestamped now.
    #[must_use]
    pub fn new(framework: Framework, metadata: AnalysisMetadata) -> Self {
        Self {
            framework,
            metadata,
            entities: Vec::new(),
            relationships: Vec::new(),
            threats: Vec::new(),
            controls: Vec::new(),
            risks: Vec::new(),
            original_data: serde_json::Value::Null,
        }
    }

    /// Look up an entity by its original id.
    #[must_use]
    pub fn entity(&self, original_id: &str) -> Option<&EntityMapping> {
        self.entities.iter().find(|e| e.original_id == original_id)
    }

    /// Relationship endpoints that do not resolve to an extracted entity.
    /// Dangling references are a transform-time anomaly, retained by design.
    #[must_use]
    pub fn dangling_references(&self) -> Vec<&str> {
        let mut dangling = Vec::new();
        for rel in &self.relationships {
            for endpoint in [rel.source.as_str(), rel.target.as_str()] {
                if !endpoint.is_empty() && self.entity(endpoint).is_none() {
                    dangling.push(endpoint);
                }
            }
        }
        dangling
    }
}

impl AnalysisMetadata {
    /// Metadata stamped with the current time.
    #[must_use]
    pub fn new(source: &str, adapter_version: &str, confidence: f64) -> Self {
        Self::new_with_timestamp(source, adapter_version, confidence, Utc::now())
    }

    /// Metadata with an explicit timestamp (useful for testing).
    #[must_use]
    pub fn new_with_timestamp(
        source: &str,
        adapter_version: &str,
        confidence: f64,
        imported_at: DateTime<Utc>,
    ) -> Self {
        Self {
            source: source.to_string(),
            imported_at,
            adapter_version: adapter_version.to_string(),
            confidence: super::clamp_confidence(confidence),
            author: None,
            file_name: None,
        }
    }
}
