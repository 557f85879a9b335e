//! Adapter for seven-stage structured risk documents.
//!
//! The source methodology works through business objectives, technical
//! scope, application decomposition, threat analysis, vulnerability
//! analysis, attack scenarios and risk analysis. Scope assets and
//! components become entities carrying a `pastaType` provenance property,
//! threat agents become adversary entities, data flows and
//! component-to-application links become relationships, raw threats and
//! composite attack scenarios both become threat mappings, and declared
//! controls and risks map through verbatim.

use serde::Deserialize;
use serde_json::Value;
use std::collections::HashMap;

use super::{FormatAdapter, InputKind, RawData};
use crate::error::{ConvergeError, Result};
use crate::reconcile::{reconcile, MatchThresholds, MatchWeights, ReconciliationResult};
use crate::severity;
use crate::types::{
    AnalysisMetadata, ControlMapping, ControlType, EntityMapping, EntityType, Framework,
    RelationshipMapping, RiskMapping, Severity, StandardizedAnalysis, SystemEntity, ThreatMapping,
    ValidationResult,
};

const ADAPTER_VERSION: &str = "1.0.3";

/// Sections a well-formed document must carry.
const REQUIRED_SECTIONS: [&str; 2] = ["technicalScope", "threatAnalysis"];

#[derive(Debug, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
struct RiskDocument {
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    author: Option<String>,
    #[serde(default)]
    business_objectives: Vec<Value>,
    #[serde(default)]
    technical_scope: TechnicalScope,
    #[serde(default)]
    application_decomposition: Decomposition,
    #[serde(default)]
    threat_analysis: ThreatAnalysis,
    #[serde(default)]
    vulnerability_analysis: VulnerabilityAnalysis,
    #[serde(default)]
    attack_scenarios: Vec<AttackScenario>,
    #[serde(default)]
    risk_analysis: RiskAnalysis,
}

#[derive(Debug, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
struct TechnicalScope {
    #[serde(default)]
    applications: Vec<ScopeAsset>,
    #[serde(default)]
    infrastructure: Vec<ScopeAsset>,
    #[serde(default)]
    data_assets: Vec<ScopeAsset>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
struct ScopeAsset {
    #[serde(default)]
    id: String,
    #[serde(default)]
    name: String,
    #[serde(rename = "type", default)]
    kind: Option<String>,
    #[serde(default)]
    criticality: Option<String>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
struct Decomposition {
    #[serde(default)]
    components: Vec<Component>,
    #[serde(default)]
    data_flows: Vec<DataFlow>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
struct Component {
    #[serde(default)]
    id: String,
    #[serde(default)]
    name: String,
    #[serde(default)]
    application_id: Option<String>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
struct DataFlow {
    #[serde(default)]
    id: String,
    #[serde(default)]
    source: String,
    #[serde(default)]
    target: String,
    #[serde(default)]
    description: Option<String>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
struct ThreatAnalysis {
    #[serde(default)]
    threats: Vec<RawThreat>,
    #[serde(default)]
    threat_agents: Vec<ThreatAgent>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
struct RawThreat {
    #[serde(default)]
    id: String,
    #[serde(default)]
    name: String,
    #[serde(default)]
    description: String,
    #[serde(default)]
    category: Option<String>,
    #[serde(default)]
    likelihood: Option<String>,
    #[serde(default)]
    target_id: Option<String>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
struct ThreatAgent {
    #[serde(default)]
    id: String,
    #[serde(default)]
    name: String,
    #[serde(default)]
    motivation: Option<String>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
struct VulnerabilityAnalysis {
    #[serde(default)]
    vulnerabilities: Vec<Vulnerability>,
}

#[derive(Debug, Deserialize, Default)]
struct Vulnerability {
    #[serde(default)]
    id: String,
    #[serde(default)]
    name: String,
}

#[derive(Debug, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
struct AttackScenario {
    #[serde(default)]
    id: String,
    #[serde(default)]
    name: String,
    #[serde(default)]
    description: String,
    #[serde(default)]
    threat_id: Option<String>,
    #[serde(default)]
    vulnerability_ids: Vec<String>,
    #[serde(default)]
    attack_vector: Option<String>,
    #[serde(default)]
    likelihood: Option<String>,
    #[serde(default)]
    impact: Option<String>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
struct RiskAnalysis {
    #[serde(default)]
    risks: Vec<DeclaredRisk>,
    #[serde(default, alias = "mitigations")]
    controls: Vec<DeclaredControl>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
struct DeclaredRisk {
    #[serde(default)]
    id: String,
    #[serde(default)]
    name: String,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    scenario_id: Option<String>,
    #[serde(default)]
    score: Option<f64>,
    #[serde(default)]
    severity: Option<String>,
    #[serde(default)]
    category: Option<String>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
struct DeclaredControl {
    #[serde(default)]
    id: String,
    #[serde(default)]
    name: String,
    #[serde(default)]
    description: String,
    #[serde(rename = "type", default)]
    kind: Option<String>,
    #[serde(default)]
    state: Option<String>,
    #[serde(default, alias = "scenarioId")]
    threat_id: Option<String>,
}

/// Adapter for seven-stage structured risk documents.
#[derive(Debug, Default)]
pub struct RiskDocumentAdapter;

impl RiskDocumentAdapter {
    #[must_use]
    pub fn new() -> Self {
        Self
    }

    fn parse_document(raw: &RawData) -> Result<RiskDocument> {
        let doc = raw.as_document()?;
        serde_json::from_value(doc.clone())
            .map_err(|e| ConvergeError::document_parse(format!("risk document: {e}")))
    }

    fn scope_entity(
        asset: &ScopeAsset,
        entity_type: EntityType,
        pasta_type: &str,
    ) -> EntityMapping {
        let mut properties = HashMap::new();
        properties.insert("pastaType".to_string(), pasta_type.to_string());
        if let Some(criticality) = &asset.criticality {
            properties.insert("criticality".to_string(), criticality.clone());
        }
        EntityMapping {
            original_id: asset.id.clone(),
            name: asset.name.clone(),
            entity_type,
            original_type: asset.kind.clone(),
            properties,
            confidence: 0.9,
        }
    }

    fn control_type(kind: Option<&str>) -> ControlType {
        match kind.map(str::trim).map(str::to_lowercase).as_deref() {
            Some("preventive") => ControlType::Preventive,
            Some("detective") => ControlType::Detective,
            Some("corrective") => ControlType::Corrective,
            Some("compensating") => ControlType::Compensating,
            _ => ControlType::Mitigation,
        }
    }

    fn scenario_severity(scenario: &AttackScenario) -> Severity {
        let likelihood = scenario
            .likelihood
            .as_deref()
            .map_or(3.0, severity::qualitative_score);
        let impact = scenario.impact.as_deref().map_or(3.0, severity::qualitative_score);
        // Five-point mean scaled onto the 0-10 table
        let combined = severity::combine_likelihood_impact(likelihood, impact) * 2.0;
        severity::score_to_severity(combined)
    }
}

impl FormatAdapter for RiskDocumentAdapter {
    fn format_id(&self) -> &'static str {
        "risk-document"
    }

    fn version(&self) -> &'static str {
        ADAPTER_VERSION
    }

    fn input_kind(&self) -> InputKind {
        InputKind::Document
    }

    fn validate(&self, raw: &RawData) -> Result<ValidationResult> {
        let doc = raw.as_document()?;
        let mut result = ValidationResult::valid();

        let Some(obj) = doc.as_object() else {
            result.add_error("risk document must be a JSON object");
            return Ok(result);
        };

        for section in REQUIRED_SECTIONS {
            if !obj.contains_key(section) {
                result.add_error(format!("missing required section: {section}"));
            }
        }
        if let Some(scenarios) = obj.get("attackScenarios") {
            if !scenarios.is_array() {
                result.add_error("section 'attackScenarios' must be an array");
            }
        }
        if !result.is_valid {
            return Ok(result);
        }

        let parsed = Self::parse_document(raw)?;
        if parsed.threat_analysis.threats.is_empty() && parsed.attack_scenarios.is_empty() {
            result.add_warning("document declares no threats or attack scenarios");
        }
        if parsed.business_objectives.is_empty() {
            result.add_warning("document declares no business objectives");
        }
        for scenario in &parsed.attack_scenarios {
            for vuln_id in &scenario.vulnerability_ids {
                let declared = parsed
                    .vulnerability_analysis
                    .vulnerabilities
                    .iter()
                    .any(|v| &v.id == vuln_id);
                if !declared {
                    result.add_warning(format!(
                        "scenario '{}' references undeclared vulnerability '{vuln_id}'",
                        scenario.id
                    ));
                }
            }
        }
        if parsed.technical_scope.applications.is_empty()
            && parsed.technical_scope.infrastructure.is_empty()
            && parsed.technical_scope.data_assets.is_empty()
        {
            result.add_warning("technical scope is empty; no entities will be extracted");
        }

        Ok(result)
    }

    fn transform(&self, raw: &RawData) -> Result<StandardizedAnalysis> {
        let parsed = Self::parse_document(raw)?;

        let mut metadata = AnalysisMetadata::new(
            parsed.name.as_deref().unwrap_or("risk-document"),
            ADAPTER_VERSION,
            0.95,
        );
        metadata.author = parsed.author.clone();

        let mut analysis = StandardizedAnalysis::new(Framework::Pasta, metadata);
        analysis.original_data = raw.as_document()?.clone();

        // Stage 2: technical scope
        for app in &parsed.technical_scope.applications {
            analysis
                .entities
                .push(Self::scope_entity(app, EntityType::Software, "application"));
        }
        for infra in &parsed.technical_scope.infrastructure {
            analysis
                .entities
                .push(Self::scope_entity(infra, EntityType::Infrastructure, "infrastructure"));
        }
        for data in &parsed.technical_scope.data_assets {
            analysis
                .entities
                .push(Self::scope_entity(data, EntityType::Datastore, "dataAsset"));
        }

        // Stage 3: decomposition
        for component in &parsed.application_decomposition.components {
            let mut properties = HashMap::new();
            properties.insert("pastaType".to_string(), "component".to_string());
            analysis.entities.push(EntityMapping {
                original_id: component.id.clone(),
                name: component.name.clone(),
                entity_type: EntityType::Component,
                original_type: None,
                properties,
                confidence: 0.9,
            });
            if let Some(app_id) = &component.application_id {
                analysis.relationships.push(RelationshipMapping {
                    original_id: format!("{}-parent", component.id),
                    source: component.id.clone(),
                    target: app_id.clone(),
                    relationship_type: "composition".to_string(),
                    action: "is part of".to_string(),
                    properties: HashMap::new(),
                    confidence: 0.9,
                });
            }
        }
        for flow in &parsed.application_decomposition.data_flows {
            analysis.relationships.push(RelationshipMapping {
                original_id: flow.id.clone(),
                source: flow.source.clone(),
                target: flow.target.clone(),
                relationship_type: "dataflow".to_string(),
                action: flow.description.clone().unwrap_or_else(|| "sends data to".to_string()),
                properties: HashMap::new(),
                confidence: 0.85,
            });
        }

        // Stage 4: threat analysis
        for agent in &parsed.threat_analysis.threat_agents {
            let mut properties = HashMap::new();
            properties.insert("pastaType".to_string(), "threatAgent".to_string());
            if let Some(motivation) = &agent.motivation {
                properties.insert("motivation".to_string(), motivation.clone());
            }
            analysis.entities.push(EntityMapping {
                original_id: agent.id.clone(),
                name: agent.name.clone(),
                entity_type: EntityType::Adversary,
                original_type: None,
                properties,
                confidence: 0.85,
            });
        }
        for threat in &parsed.threat_analysis.threats {
            let likelihood = threat.likelihood.as_deref().map_or(3.0, severity::qualitative_score);
            analysis.threats.push(ThreatMapping {
                original_id: threat.id.clone(),
                name: threat.name.clone(),
                description: threat.description.clone(),
                // Free-form category: this methodology is not STRIDE-bound
                category: threat
                    .category
                    .as_deref()
                    .unwrap_or("uncategorized")
                    .trim()
                    .to_lowercase(),
                original_category: threat.category.clone(),
                severity: severity::score_to_severity(likelihood * 2.0),
                state: "identified".to_string(),
                affected_entity: threat.target_id.clone(),
                affected_flow: None,
                properties: HashMap::new(),
                confidence: 0.85,
            });
        }

        // Stage 6: attack scenarios become composite threats
        for scenario in &parsed.attack_scenarios {
            let mut properties = HashMap::new();
            properties.insert("pastaType".to_string(), "attackScenario".to_string());
            if let Some(vector) = &scenario.attack_vector {
                properties.insert("attackVector".to_string(), vector.clone());
            }
            if !scenario.vulnerability_ids.is_empty() {
                properties
                    .insert("vulnerabilities".to_string(), scenario.vulnerability_ids.join(","));
            }
            // Resolve declared vulnerability names for readability
            let vuln_names: Vec<&str> = parsed
                .vulnerability_analysis
                .vulnerabilities
                .iter()
                .filter(|v| scenario.vulnerability_ids.contains(&v.id))
                .map(|v| v.name.as_str())
                .collect();
            if !vuln_names.is_empty() {
                properties.insert("vulnerabilityNames".to_string(), vuln_names.join(", "));
            }
            analysis.threats.push(ThreatMapping {
                original_id: scenario.id.clone(),
                name: scenario.name.clone(),
                description: scenario.description.clone(),
                category: "attack_scenario".to_string(),
                original_category: None,
                severity: Self::scenario_severity(scenario),
                state: "identified".to_string(),
                affected_entity: None,
                affected_flow: None,
                properties,
                confidence: 0.8,
            });
        }

        // Stage 7: declared controls and risks
        for control in &parsed.risk_analysis.controls {
            analysis.controls.push(ControlMapping {
                original_id: control.id.clone(),
                name: control.name.clone(),
                description: control.description.clone(),
                control_type: Self::control_type(control.kind.as_deref()),
                state: control.state.clone().unwrap_or_else(|| "proposed".to_string()),
                threat_id: control.threat_id.clone(),
                properties: HashMap::new(),
                confidence: 0.9,
            });
        }
        for risk in &parsed.risk_analysis.risks {
            let score = risk.score.unwrap_or_else(|| {
                // Qualitative five-point severity scaled onto 0-10
                risk.severity.as_deref().map_or(5.0, |s| severity::qualitative_score(s) * 2.0)
            });
            let mut properties = HashMap::new();
            if let Some(scenario_id) = &risk.scenario_id {
                properties.insert("scenarioId".to_string(), scenario_id.clone());
            }
            analysis.risks.push(RiskMapping {
                id: risk.id.clone(),
                name: risk.name.clone(),
                description: risk.description.clone(),
                score: score.clamp(0.0, 10.0),
                category: risk.category.clone(),
                entity_id: None,
                entity_name: None,
                properties,
            });
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

    /// This format enumerates risk-equivalent records: return them verbatim.
    fn extract_risks(&self, analysis: &StandardizedAnalysis) -> Vec<RiskMapping> {
        analysis.risks.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sample_document() -> RawData {
        RawData::Document(json!({
            "name": "Payments platform assessment",
            "businessObjectives": [
                {"id": "o1", "description": "Process card payments reliably"}
            ],
            "technicalScope": {
                "applications": [
                    {"id": "app1", "name": "Checkout", "type": "web", "criticality": "high"}
                ],
                "infrastructure": [
                    {"id": "inf1", "name": "K8s Cluster"}
                ],
                "dataAssets": [
                    {"id": "da1", "name": "Cardholder Data"}
                ]
            },
            "applicationDecomposition": {
                "components": [
                    {"id": "c1", "name": "Payment Gateway Client", "applicationId": "app1"}
                ],
                "dataFlows": [
                    {"id": "df1", "source": "c1", "target": "da1", "description": "writes PAN"}
                ]
            },
            "threatAnalysis": {
                "threats": [
                    {"id": "t1", "name": "Card data exfiltration",
                     "description": "Bulk read of stored PANs",
                     "category": "data theft", "likelihood": "high", "targetId": "da1"}
                ],
                "threatAgents": [
                    {"id": "ta1", "name": "Organized crime", "motivation": "financial"}
                ]
            },
            "vulnerabilityAnalysis": {
                "vulnerabilities": [
                    {"id": "v1", "name": "Unencrypted backup", "severity": "high",
                     "componentId": "c1"}
                ]
            },
            "attackScenarios": [
                {"id": "as1", "name": "Backup theft", "description": "Steal backup media",
                 "threatId": "t1", "vulnerabilityIds": ["v1"],
                 "attackVector": "physical", "likelihood": "medium", "impact": "very high"}
            ],
            "riskAnalysis": {
                "risks": [
                    {"id": "r1", "name": "Cardholder data breach", "scenarioId": "as1",
                     "score": 9.0, "category": "business"}
                ],
                "controls": [
                    {"id": "ctl1", "name": "Encrypt backups", "description": "AES-256 at rest",
                     "type": "preventive", "state": "planned", "scenarioId": "as1"}
                ]
            }
        }))
    }

    // ==================== Validate Tests ====================

    #[test]
    fn test_validate_accepts_sample() {
        let adapter = RiskDocumentAdapter::new();
        let result = adapter.validate(&sample_document()).unwrap();
        assert!(result.is_valid, "errors: {:?}", result.errors);
    }

    #[test]
    fn test_validate_missing_threat_analysis_names_the_section() {
        let adapter = RiskDocumentAdapter::new();
        let raw = RawData::Document(json!({"technicalScope": {}}));
        let result = adapter.validate(&raw).unwrap();
        assert!(!result.is_valid);
        assert!(result.errors.iter().any(|e| e.contains("threatAnalysis")));
    }

    #[test]
    fn test_validate_warns_on_empty_scope() {
        let adapter = RiskDocumentAdapter::new();
        let raw = RawData::Document(json!({
            "technicalScope": {},
            "threatAnalysis": {"threats": [{"id": "t1", "name": "x"}]}
        }));
        let result = adapter.validate(&raw).unwrap();
        assert!(result.is_valid);
        assert!(result.warnings.iter().any(|w| w.contains("technical scope is empty")));
    }

    // ==================== Transform Tests ====================

    #[test]
    fn test_entities_carry_pasta_type_provenance() {
        let adapter = RiskDocumentAdapter::new();
        let analysis = adapter.transform(&sample_document()).unwrap();

        assert_eq!(analysis.framework, Framework::Pasta);
        let by_id = |id: &str| analysis.entity(id).unwrap();
        assert_eq!(by_id("app1").entity_type, EntityType::Software);
        assert_eq!(by_id("app1").properties["pastaType"], "application");
        assert_eq!(by_id("inf1").entity_type, EntityType::Infrastructure);
        assert_eq!(by_id("da1").entity_type, EntityType::Datastore);
        assert_eq!(by_id("c1").entity_type, EntityType::Component);
        assert_eq!(by_id("ta1").entity_type, EntityType::Adversary);
        assert_eq!(by_id("ta1").properties["pastaType"], "threatAgent");
    }

    #[test]
    fn test_component_links_and_data_flows_become_relationships() {
        let adapter = RiskDocumentAdapter::new();
        let analysis = adapter.transform(&sample_document()).unwrap();

        let composition = analysis
            .relationships
            .iter()
            .find(|r| r.relationship_type == "composition")
            .unwrap();
        assert_eq!(composition.source, "c1");
        assert_eq!(composition.target, "app1");

        let dataflow = analysis
            .relationships
            .iter()
            .find(|r| r.relationship_type == "dataflow")
            .unwrap();
        assert_eq!(dataflow.action, "writes PAN");
    }

    #[test]
    fn test_raw_threats_and_scenarios_both_become_threats() {
        let adapter = RiskDocumentAdapter::new();
        let analysis = adapter.transform(&sample_document()).unwrap();

        assert_eq!(analysis.threats.len(), 2);
        let raw_threat = &analysis.threats[0];
        assert_eq!(raw_threat.category, "data theft");
        // high likelihood (4) * 2 = 8 -> high
        assert_eq!(raw_threat.severity, Severity::High);

        let scenario = &analysis.threats[1];
        assert_eq!(scenario.category, "attack_scenario");
        assert_eq!(scenario.properties["attackVector"], "physical");
        assert_eq!(scenario.properties["vulnerabilities"], "v1");
        // (medium 3 + very high 5) / 2 = 4 -> 8 on 0-10 -> high
        assert_eq!(scenario.severity, Severity::High);
    }

    #[test]
    fn test_declared_controls_and_risks_map_through() {
        let adapter = RiskDocumentAdapter::new();
        let analysis = adapter.transform(&sample_document()).unwrap();

        assert_eq!(analysis.controls.len(), 1);
        assert_eq!(analysis.controls[0].control_type, ControlType::Preventive);
        assert_eq!(analysis.controls[0].threat_id.as_deref(), Some("as1"));

        assert_eq!(analysis.risks.len(), 1);
        assert_eq!(analysis.risks[0].score, 9.0);
        assert_eq!(analysis.risks[0].properties["scenarioId"], "as1");
    }

    // ==================== Risk Extraction Tests ====================

    #[test]
    fn test_extract_risks_returns_declared_risks_verbatim() {
        let adapter = RiskDocumentAdapter::new();
        let analysis = adapter.transform(&sample_document()).unwrap();
        let risks = adapter.extract_risks(&analysis);
        assert_eq!(risks.len(), 1);
        assert_eq!(risks[0].id, "r1");
        assert_eq!(risks[0].score, 9.0);
    }

    #[test]
    fn test_risk_without_score_falls_back_to_severity() {
        let adapter = RiskDocumentAdapter::new();
        let raw = RawData::Document(json!({
            "technicalScope": {"applications": [{"id": "a", "name": "App"}]},
            "threatAnalysis": {"threats": [{"id": "t1", "name": "x"}]},
            "riskAnalysis": {
                "risks": [{"id": "r1", "name": "unscored", "severity": "critical"}]
            }
        }));
        let analysis = adapter.transform(&raw).unwrap();
        // critical -> 5 on the five-point scale -> 10 on 0-10
        assert_eq!(analysis.risks[0].score, 10.0);
    }
}
