//! Adapter for structured diagram-tool exports (.tm7 and equivalent JSON).
//!
//! Elements become entities through a fixed kind-mapping table, flows become
//! dataflow relationships, threats carry the six-category taxonomy and a
//! direct priority-to-severity mapping, and each threat's nested remediation
//! notes become separate mitigation controls referencing the parent threat.

use serde::Deserialize;
use serde_json::Value;
use std::collections::HashMap;
use tracing::warn;

use super::{FormatAdapter, InputKind, RawData};
use crate::error::{ConvergeError, Result};
use crate::reconcile::{reconcile, MatchThresholds, MatchWeights, ReconciliationResult};
use crate::severity;
use crate::types::{
    AnalysisMetadata, ControlMapping, ControlType, EntityMapping, EntityType, Framework,
    RelationshipMapping, RiskMapping, Severity, StandardizedAnalysis, SystemEntity, ThreatMapping,
    ValidationResult,
};

const ADAPTER_VERSION: &str = "1.2.0";

/// Element kind -> canonical entity type. Kinds outside the table map to
/// `Unknown` with the native label retained in `original_type`.
const ELEMENT_TYPE_MAP: [(&str, EntityType); 13] = [
    ("process", EntityType::Software),
    ("web application", EntityType::Software),
    ("web service", EntityType::Software),
    ("data store", EntityType::Datastore),
    ("datastore", EntityType::Datastore),
    ("database", EntityType::Datastore),
    ("external interactor", EntityType::ExternalEntity),
    ("external entity", EntityType::ExternalEntity),
    ("human actor", EntityType::Human),
    ("actor", EntityType::Human),
    ("trust boundary", EntityType::Network),
    ("network segment", EntityType::Network),
    ("cloud service", EntityType::CloudService),
];

#[derive(Debug, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
struct ToolExportDocument {
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    author: Option<String>,
    #[serde(default)]
    elements: Vec<Element>,
    #[serde(default)]
    flows: Vec<Flow>,
    #[serde(default)]
    threats: Vec<Threat>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
struct Element {
    #[serde(default)]
    id: String,
    #[serde(default)]
    name: String,
    #[serde(rename = "type", default)]
    kind: String,
    #[serde(default)]
    properties: HashMap<String, String>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
struct Flow {
    #[serde(default)]
    id: String,
    #[serde(default)]
    name: String,
    #[serde(default)]
    source: String,
    #[serde(default)]
    target: String,
    #[serde(default)]
    properties: HashMap<String, String>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
struct Threat {
    #[serde(default)]
    id: String,
    #[serde(default, alias = "name")]
    title: String,
    #[serde(default)]
    description: String,
    #[serde(default)]
    category: String,
    #[serde(default)]
    priority: String,
    #[serde(default)]
    state: String,
    #[serde(default)]
    element_id: Option<String>,
    #[serde(default)]
    flow_id: Option<String>,
    #[serde(default)]
    mitigations: Vec<Mitigation>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
struct Mitigation {
    #[serde(default)]
    name: String,
    #[serde(default)]
    description: String,
    #[serde(default)]
    state: Option<String>,
}

/// Adapter for diagram-tool exports.
#[derive(Debug, Default)]
pub struct ToolExportAdapter;

impl ToolExportAdapter {
    #[must_use]
    pub fn new() -> Self {
        Self
    }

    fn parse_document(raw: &RawData) -> Result<ToolExportDocument> {
        let doc = raw.as_document()?;
        serde_json::from_value(doc.clone())
            .map_err(|e| ConvergeError::document_parse(format!("tool export: {e}")))
    }

    fn map_element_type(kind: &str) -> EntityType {
        let needle = kind.trim().to_lowercase();
        ELEMENT_TYPE_MAP
            .iter()
            .find(|(label, _)| *label == needle)
            .map_or(EntityType::Unknown, |(_, ty)| *ty)
    }

    fn parse_priority(priority: &str) -> Severity {
        match priority.trim().to_lowercase().as_str() {
            "critical" => Severity::Critical,
            "high" => Severity::High,
            "medium" => Severity::Medium,
            "low" => Severity::Low,
            "info" | "informational" => Severity::Info,
            _ => Severity::Medium,
        }
    }
}

impl FormatAdapter for ToolExportAdapter {
    fn format_id(&self) -> &'static str {
        "tool-export"
    }

    fn version(&self) -> &'static str {
        ADAPTER_VERSION
    }

    fn input_kind(&self) -> InputKind {
        InputKind::Document
    }

    fn claims_file(&self, file_name: &str) -> bool {
        file_name.to_lowercase().ends_with(".tm7")
    }

    fn validate(&self, raw: &RawData) -> Result<ValidationResult> {
        let doc = raw.as_document()?;
        let mut result = ValidationResult::valid();

        let Some(obj) = doc.as_object() else {
            result.add_error("tool export must be a JSON object");
            return Ok(result);
        };

        for section in ["elements", "threats"] {
            match obj.get(section) {
                None => result.add_error(format!("missing required section: {section}")),
                Some(Value::Array(_)) => {}
                Some(_) => result.add_error(format!("section '{section}' must be an array")),
            }
        }
        if let Some(flows) = obj.get("flows") {
            if !flows.is_array() {
                result.add_error("section 'flows' must be an array");
            }
        }
        if !result.is_valid {
            return Ok(result);
        }

        let parsed = Self::parse_document(raw)?;
        if parsed.elements.is_empty() && parsed.threats.is_empty() {
            result.add_error("export contains no elements and no threats");
            return Ok(result);
        }
        if parsed.threats.is_empty() {
            result.add_warning("export contains no threats");
        }
        for threat in &parsed.threats {
            if !threat.category.is_empty()
                && severity::normalize_category(&threat.category).is_none()
            {
                result.add_warning(format!(
                    "threat '{}' has unrecognized category '{}'",
                    threat.id, threat.category
                ));
            }
        }

        let element_ids: Vec<&str> = parsed.elements.iter().map(|e| e.id.as_str()).collect();
        for flow in &parsed.flows {
            for endpoint in [&flow.source, &flow.target] {
                if !endpoint.is_empty() && !element_ids.contains(&endpoint.as_str()) {
                    result.add_warning(format!(
                        "flow '{}' references unknown element '{endpoint}'",
                        flow.id
                    ));
                }
            }
        }

        Ok(result)
    }

    fn transform(&self, raw: &RawData) -> Result<StandardizedAnalysis> {
        let parsed = Self::parse_document(raw)?;

        let mut metadata = AnalysisMetadata::new(
            parsed.name.as_deref().unwrap_or("tool-export"),
            ADAPTER_VERSION,
            1.0,
        );
        metadata.author = parsed.author.clone();

        let mut analysis = StandardizedAnalysis::new(Framework::Stride, metadata);
        analysis.original_data = raw.as_document()?.clone();

        for element in &parsed.elements {
            let entity_type = Self::map_element_type(&element.kind);
            analysis.entities.push(EntityMapping {
                original_id: element.id.clone(),
                name: element.name.clone(),
                entity_type,
                original_type: Some(element.kind.clone()),
                properties: element.properties.clone(),
                confidence: if entity_type == EntityType::Unknown { 0.6 } else { 0.9 },
            });
        }

        for flow in &parsed.flows {
            for endpoint in [&flow.source, &flow.target] {
                if !endpoint.is_empty() && analysis.entity(endpoint).is_none() {
                    warn!(flow = %flow.id, %endpoint, "dangling flow endpoint; retained as-is");
                }
            }
            analysis.relationships.push(RelationshipMapping {
                original_id: flow.id.clone(),
                source: flow.source.clone(),
                target: flow.target.clone(),
                relationship_type: "dataflow".to_string(),
                action: if flow.name.is_empty() {
                    "sends data to".to_string()
                } else {
                    flow.name.clone()
                },
                properties: flow.properties.clone(),
                confidence: 0.9,
            });
        }

        for threat in &parsed.threats {
            let category = severity::normalize_category(&threat.category)
                .map_or_else(|| threat.category.trim().to_lowercase(), str::to_string);
            analysis.threats.push(ThreatMapping {
                original_id: threat.id.clone(),
                name: threat.title.clone(),
                description: threat.description.clone(),
                category,
                original_category: Some(threat.category.clone()),
                severity: Self::parse_priority(&threat.priority),
                state: if threat.state.is_empty() {
                    "identified".to_string()
                } else {
                    threat.state.clone()
                },
                affected_entity: threat.element_id.clone(),
                affected_flow: threat.flow_id.clone(),
                properties: HashMap::new(),
                confidence: 0.9,
            });

            for (idx, mitigation) in threat.mitigations.iter().enumerate() {
                analysis.controls.push(ControlMapping {
                    original_id: format!("{}-m{}", threat.id, idx + 1),
                    name: mitigation.name.clone(),
                    description: mitigation.description.clone(),
                    control_type: ControlType::Mitigation,
                    state: mitigation.state.clone().unwrap_or_else(|| "proposed".to_string()),
                    threat_id: Some(threat.id.clone()),
                    properties: HashMap::new(),
                    confidence: 0.85,
                });
            }
        }

        Ok(analysis)
    }

    fn map_to_entities(
        &self,
        analysis: &StandardizedAnalysis,
        system_entities: &[SystemEntity],
    ) -> ReconciliationResult {
        reconcile(
            &analysis.entities,
            system_entities,
            MatchWeights::SCHEMA_RICH,
            MatchThresholds::SCHEMA_RICH,
        )
    }

    /// The export format has no explicit risk section: derive one risk per
    /// threat, applying the lifecycle-state adjustment to the base score.
    fn extract_risks(&self, analysis: &StandardizedAnalysis) -> Vec<RiskMapping> {
        analysis
            .threats
            .iter()
            .map(|threat| {
                let base = severity::severity_to_score(threat.severity);
                let score = severity::adjust_for_state(base, &threat.state);
                let entity_name = threat
                    .affected_entity
                    .as_deref()
                    .and_then(|id| analysis.entity(id))
                    .map(|e| e.name.clone());
                let mut properties = HashMap::new();
                properties.insert("base_score".to_string(), format!("{base}"));
                properties.insert("state".to_string(), threat.state.clone());
                RiskMapping {
                    id: format!("risk-{}", threat.original_id),
                    name: threat.name.clone(),
                    description: if threat.description.is_empty() {
                        None
                    } else {
                        Some(threat.description.clone())
                    },
                    score,
                    category: Some(threat.category.clone()),
                    entity_id: threat.affected_entity.clone(),
                    entity_name,
                    properties,
                }
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sample_export() -> RawData {
        RawData::Document(json!({
            "name": "Storefront model",
            "author": "sec-team",
            "elements": [
                {"id": "1", "name": "Web App", "type": "Process"},
                {"id": "2", "name": "Orders DB", "type": "Data Store"},
                {"id": "3", "name": "Customer", "type": "External Interactor"}
            ],
            "flows": [
                {"id": "f1", "name": "places order", "source": "3", "target": "1"},
                {"id": "f2", "name": "persists order", "source": "1", "target": "2"}
            ],
            "threats": [
                {
                    "id": "t1",
                    "title": "Order record tampering",
                    "description": "Orders modified in transit",
                    "category": "Tampering",
                    "priority": "High",
                    "state": "Mitigated",
                    "elementId": "2",
                    "mitigations": [
                        {"name": "TLS everywhere", "description": "Encrypt all flows"}
                    ]
                },
                {
                    "id": "t2",
                    "title": "Customer impersonation",
                    "category": "Spoofing",
                    "priority": "Critical",
                    "state": "Not Started",
                    "elementId": "3"
                }
            ]
        }))
    }

    // ==================== Validate Tests ====================

    #[test]
    fn test_validate_accepts_sample() {
        let adapter = ToolExportAdapter::new();
        let result = adapter.validate(&sample_export()).unwrap();
        assert!(result.is_valid, "errors: {:?}", result.errors);
        assert!(result.warnings.is_empty());
    }

    #[test]
    fn test_validate_missing_elements_section() {
        let adapter = ToolExportAdapter::new();
        let raw = RawData::Document(json!({"threats": []}));
        let result = adapter.validate(&raw).unwrap();
        assert!(!result.is_valid);
        assert!(result.errors.iter().any(|e| e.contains("elements")));
    }

    #[test]
    fn test_validate_non_array_section() {
        let adapter = ToolExportAdapter::new();
        let raw = RawData::Document(json!({"elements": {}, "threats": []}));
        let result = adapter.validate(&raw).unwrap();
        assert!(!result.is_valid);
        assert!(result.errors.iter().any(|e| e.contains("'elements' must be an array")));
    }

    #[test]
    fn test_validate_entirely_empty_export() {
        let adapter = ToolExportAdapter::new();
        let raw = RawData::Document(json!({"elements": [], "threats": []}));
        let result = adapter.validate(&raw).unwrap();
        assert!(!result.is_valid);
    }

    #[test]
    fn test_validate_warns_on_zero_threats() {
        let adapter = ToolExportAdapter::new();
        let raw = RawData::Document(json!({
            "elements": [{"id": "1", "name": "App", "type": "Process"}],
            "threats": []
        }));
        let result = adapter.validate(&raw).unwrap();
        assert!(result.is_valid);
        assert!(result.warnings.iter().any(|w| w.contains("no threats")));
    }

    #[test]
    fn test_validate_warns_on_dangling_flow() {
        let adapter = ToolExportAdapter::new();
        let raw = RawData::Document(json!({
            "elements": [{"id": "1", "name": "App", "type": "Process"}],
            "flows": [{"id": "f1", "source": "1", "target": "ghost"}],
            "threats": [{"id": "t1", "title": "x", "category": "S", "priority": "Low"}]
        }));
        let result = adapter.validate(&raw).unwrap();
        assert!(result.is_valid);
        assert!(result.warnings.iter().any(|w| w.contains("ghost")));
    }

    #[test]
    fn test_validate_rejects_delimited_input() {
        let adapter = ToolExportAdapter::new();
        let raw = RawData::Text("Threat,Asset\n".to_string());
        assert!(adapter.validate(&raw).is_err());
    }

    // ==================== Transform Tests ====================

    #[test]
    fn test_transform_maps_element_kinds() {
        let adapter = ToolExportAdapter::new();
        let analysis = adapter.transform(&sample_export()).unwrap();

        assert_eq!(analysis.framework, Framework::Stride);
        assert_eq!(analysis.entities.len(), 3);
        assert_eq!(analysis.entities[0].entity_type, EntityType::Software);
        assert_eq!(analysis.entities[1].entity_type, EntityType::Datastore);
        assert_eq!(analysis.entities[2].entity_type, EntityType::ExternalEntity);
        assert_eq!(analysis.entities[1].original_type.as_deref(), Some("Data Store"));
    }

    #[test]
    fn test_transform_unknown_kind_keeps_native_label() {
        let adapter = ToolExportAdapter::new();
        let raw = RawData::Document(json!({
            "elements": [{"id": "1", "name": "Thing", "type": "Quantum Widget"}],
            "threats": [{"id": "t1", "title": "x", "category": "S", "priority": "Low"}]
        }));
        let analysis = adapter.transform(&raw).unwrap();
        assert_eq!(analysis.entities[0].entity_type, EntityType::Unknown);
        assert_eq!(analysis.entities[0].original_type.as_deref(), Some("Quantum Widget"));
        assert!(analysis.entities[0].confidence < 0.9);
    }

    #[test]
    fn test_transform_flows_become_dataflows() {
        let adapter = ToolExportAdapter::new();
        let analysis = adapter.transform(&sample_export()).unwrap();

        assert_eq!(analysis.relationships.len(), 2);
        assert!(analysis.relationships.iter().all(|r| r.relationship_type == "dataflow"));
        assert_eq!(analysis.relationships[0].action, "places order");
    }

    #[test]
    fn test_transform_threats_and_nested_mitigations() {
        let adapter = ToolExportAdapter::new();
        let analysis = adapter.transform(&sample_export()).unwrap();

        assert_eq!(analysis.threats.len(), 2);
        let t1 = &analysis.threats[0];
        assert_eq!(t1.category, "tampering");
        assert_eq!(t1.original_category.as_deref(), Some("Tampering"));
        assert_eq!(t1.severity, Severity::High);
        assert_eq!(t1.affected_entity.as_deref(), Some("2"));

        assert_eq!(analysis.controls.len(), 1);
        let control = &analysis.controls[0];
        assert_eq!(control.control_type, ControlType::Mitigation);
        assert_eq!(control.threat_id.as_deref(), Some("t1"));
        assert_eq!(control.name, "TLS everywhere");
    }

    #[test]
    fn test_transform_retains_original_data() {
        let adapter = ToolExportAdapter::new();
        let analysis = adapter.transform(&sample_export()).unwrap();
        assert_eq!(analysis.original_data["name"], "Storefront model");
    }

    #[test]
    fn test_transform_is_deterministic_apart_from_timestamp() {
        let adapter = ToolExportAdapter::new();
        let a = adapter.transform(&sample_export()).unwrap();
        let b = adapter.transform(&sample_export()).unwrap();
        assert_eq!(
            serde_json::to_string(&a.entities).unwrap(),
            serde_json::to_string(&b.entities).unwrap()
        );
        assert_eq!(
            serde_json::to_string(&a.threats).unwrap(),
            serde_json::to_string(&b.threats).unwrap()
        );
    }

    // ==================== Risk Extraction Tests ====================

    #[test]
    fn test_mitigated_high_threat_scores_one_point_six() {
        let adapter = ToolExportAdapter::new();
        let analysis = adapter.transform(&sample_export()).unwrap();
        let risks = adapter.extract_risks(&analysis);

        let tampering = risks.iter().find(|r| r.id == "risk-t1").unwrap();
        // High -> 8.0, mitigated -> x0.2
        assert!((tampering.score - 1.6).abs() < f64::EPSILON);
        assert_eq!(tampering.entity_name.as_deref(), Some("Orders DB"));
    }

    #[test]
    fn test_not_started_critical_threat_clamps_at_ten() {
        let adapter = ToolExportAdapter::new();
        let analysis = adapter.transform(&sample_export()).unwrap();
        let risks = adapter.extract_risks(&analysis);

        let spoofing = risks.iter().find(|r| r.id == "risk-t2").unwrap();
        // Critical -> 10.0, not started -> x1.2, clamped to 10
        assert_eq!(spoofing.score, 10.0);
    }

    #[test]
    fn test_claims_tm7_files() {
        let adapter = ToolExportAdapter::new();
        assert!(adapter.claims_file("diagrams/model.TM7"));
        assert!(!adapter.claims_file("model.csv"));
    }
}
