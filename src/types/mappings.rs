//! Mapping records - the normalized building blocks of a standardized analysis.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Canonical entity category that every adapter's native type vocabulary is
/// mapped onto.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "snake_case")]
pub enum EntityType {
    Software,
    Datastore,
    Network,
    Human,
    ExternalEntity,
    Adversary,
    CloudService,
    Infrastructure,
    Component,
    #[default]
    Unknown,
}

impl EntityType {
    /// Stable lowercase token, matching the serialized form.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Software => "software",
            Self::Datastore => "datastore",
            Self::Network => "network",
            Self::Human => "human",
            Self::ExternalEntity => "external_entity",
            Self::Adversary => "adversary",
            Self::CloudService => "cloud_service",
            Self::Infrastructure => "infrastructure",
            Self::Component => "component",
            Self::Unknown => "unknown",
        }
    }
}

/// Ordinal severity scale shared by all adapters.
///
/// Ordering is by criticality so `Ord::max` picks the worst severity.
#[derive(
    Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash, Default,
)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Info,
    Low,
    #[default]
    Medium,
    High,
    Critical,
}

impl Severity {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Info => "info",
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
            Self::Critical => "critical",
        }
    }
}

/// Control classification.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum ControlType {
    Preventive,
    Detective,
    Corrective,
    Compensating,
    #[default]
    Mitigation,
}

/// An entity extracted from an imported analysis.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EntityMapping {
    /// Identifier stable within one import
    pub original_id: String,
    pub name: String,
    /// Canonical category
    #[serde(rename = "type")]
    pub entity_type: EntityType,
    /// Adapter-native type label, kept for traceability
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub original_type: Option<String>,
    /// Adapter-specific attributes
    #[serde(skip_serializing_if = "HashMap::is_empty", default)]
    pub properties: HashMap<String, String>,
    /// Trust in this extraction, [0, 1]
    pub confidence: f64,
}

/// A relationship between two imported entities.
///
/// `source`/`target` reference entity `original_id` values. Dangling
/// references are retained as-is rather than dropped; downstream consumers
/// decide policy.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RelationshipMapping {
    pub original_id: String,
    pub source: String,
    pub target: String,
    /// e.g. "dataflow", "composition"
    #[serde(rename = "type")]
    pub relationship_type: String,
    /// Human-readable verb phrase
    pub action: String,
    #[serde(skip_serializing_if = "HashMap::is_empty", default)]
    pub properties: HashMap<String, String>,
    pub confidence: f64,
}

/// A threat extracted from an imported analysis.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ThreatMapping {
    pub original_id: String,
    pub name: String,
    #[serde(skip_serializing_if = "String::is_empty", default)]
    pub description: String,
    /// Normalized taxonomy token (one of the six canonical categories) or a
    /// free-form category for non-categorized methodologies
    pub category: String,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub original_category: Option<String>,
    pub severity: Severity,
    /// Free-form lifecycle label ("identified", "mitigated", ...)
    pub state: String,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub affected_entity: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub affected_flow: Option<String>,
    #[serde(skip_serializing_if = "HashMap::is_empty", default)]
    pub properties: HashMap<String, String>,
    pub confidence: f64,
}

/// A mitigating or compensating control.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ControlMapping {
    pub original_id: String,
    pub name: String,
    #[serde(skip_serializing_if = "String::is_empty", default)]
    pub description: String,
    #[serde(rename = "type")]
    pub control_type: ControlType,
    pub state: String,
    /// Threat this control addresses, when declared
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub threat_id: Option<String>,
    #[serde(skip_serializing_if = "HashMap::is_empty", default)]
    pub properties: HashMap<String, String>,
    pub confidence: f64,
}

/// A risk entry, either declared by the source format or derived from a
/// threat's severity.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RiskMapping {
    pub id: String,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub description: Option<String>,
    /// Numeric score, conventionally 0-10
    pub score: f64,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub category: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub entity_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub entity_name: Option<String>,
    #[serde(skip_serializing_if = "HashMap::is_empty", default)]
    pub properties: HashMap<String, String>,
}
