//! Adapter for delimited STRIDE-style threat lists.
//!
//! Each record's asset column becomes (at most once) an entity with a
//! keyword-inferred type, the threat column becomes a threat mapping with a
//! normalized category, severity is computed from an explicit risk column or
//! averaged likelihood/impact, and a mitigation column becomes one control
//! per threat.

use std::collections::HashMap;

use super::{FormatAdapter, InputKind, RawData};
use crate::error::Result;
use crate::parser;
use crate::reconcile::{reconcile, MatchThresholds, MatchWeights, ReconciliationResult};
use crate::severity;
use crate::types::{
    AnalysisMetadata, ControlMapping, ControlType, EntityMapping, EntityType, Framework,
    RiskMapping, Severity, StandardizedAnalysis, SystemEntity, ThreatMapping, ValidationResult,
};

const ADAPTER_VERSION: &str = "1.1.0";

/// Asset-name keywords -> inferred canonical type. First hit wins.
const ASSET_TYPE_KEYWORDS: [(&str, EntityType); 13] = [
    ("user", EntityType::Human),
    ("admin", EntityType::Human),
    ("operator", EntityType::Human),
    ("database", EntityType::Datastore),
    ("storage", EntityType::Datastore),
    ("api", EntityType::Software),
    ("service", EntityType::Software),
    ("server", EntityType::Software),
    ("network", EntityType::Network),
    ("firewall", EntityType::Network),
    ("router", EntityType::Network),
    ("external", EntityType::ExternalEntity),
    ("third-party", EntityType::ExternalEntity),
];

/// Five-point qualitative scale used by this format's risk, likelihood and
/// impact columns. Unrecognized values score 2.5.
const FIVE_POINT_SCALE: [(&str, f64); 7] = [
    ("very high", 5.0),
    ("very_high", 5.0),
    ("high", 4.0),
    ("medium", 3.0),
    ("low", 2.0),
    ("very low", 1.0),
    ("very_low", 1.0),
];

const FIVE_POINT_DEFAULT: f64 = 2.5;

/// Adapter for STRIDE threat-list CSVs.
#[derive(Debug, Default)]
pub struct ThreatListAdapter;

impl ThreatListAdapter {
    #[must_use]
    pub fn new() -> Self {
        Self
    }

    fn five_point_score(value: &str) -> f64 {
        if let Ok(numeric) = value.trim().parse::<f64>() {
            return numeric.clamp(0.0, 5.0);
        }
        let needle = value.trim().to_lowercase();
        FIVE_POINT_SCALE
            .iter()
            .find(|(label, _)| *label == needle)
            .map_or(FIVE_POINT_DEFAULT, |(_, score)| *score)
    }

    /// Severity on the five-point combined scale: explicit risk column first,
    /// else mean of likelihood and impact, else the unrecognized default.
    fn record_severity(record: &HashMap<String, String>) -> Severity {
        let combined = if let Some(risk) = non_empty(record, "risk") {
            Self::five_point_score(risk)
        } else {
            match (non_empty(record, "likelihood"), non_empty(record, "impact")) {
                (None, None) => FIVE_POINT_DEFAULT,
                (likelihood, impact) => severity::combine_likelihood_impact(
                    likelihood.map_or(FIVE_POINT_DEFAULT, Self::five_point_score),
                    impact.map_or(FIVE_POINT_DEFAULT, Self::five_point_score),
                ),
            }
        };

        if combined >= 4.0 {
            Severity::Critical
        } else if combined >= 3.0 {
            Severity::High
        } else if combined >= 2.0 {
            Severity::Medium
        } else {
            Severity::Low
        }
    }

    fn infer_asset_type(asset: &str) -> EntityType {
        let needle = asset.to_lowercase();
        ASSET_TYPE_KEYWORDS
            .iter()
            .find(|(keyword, _)| needle.contains(keyword))
            .map_or(EntityType::Unknown, |(_, ty)| *ty)
    }
}

fn non_empty<'a>(record: &'a HashMap<String, String>, key: &str) -> Option<&'a str> {
    record.get(key).map(String::as_str).filter(|v| !v.trim().is_empty())
}

impl FormatAdapter for ThreatListAdapter {
    fn format_id(&self) -> &'static str {
        "threat-list"
    }

    fn version(&self) -> &'static str {
        ADAPTER_VERSION
    }

    fn input_kind(&self) -> InputKind {
        InputKind::Delimited
    }

    fn validate(&self, raw: &RawData) -> Result<ValidationResult> {
        let table = parser::parse(raw.as_text()?);
        let mut result = ValidationResult::valid();

        if table.headers.is_empty() {
            result.add_error("input has no header row");
            return Ok(result);
        }
        if !table.has_column("threat") {
            result.add_error("missing required column: threat");
        }
        if table.records.is_empty() {
            result.add_error("input contains no parseable records");
        }
        if !result.is_valid {
            return Ok(result);
        }

        if !table.has_column("asset") {
            result.add_warning("no asset column; no entities will be extracted");
        }
        if !table.has_column("category") {
            result.add_warning("no category column; threats will be uncategorized");
        }
        for (idx, record) in table.records.iter().enumerate() {
            if let Some(category) = non_empty(record, "category") {
                if severity::normalize_category(category).is_none() {
                    result.add_warning(format!(
                        "record {}: unrecognized category '{category}'",
                        idx + 1
                    ));
                }
            }
        }

        Ok(result)
    }

    fn transform(&self, raw: &RawData) -> Result<StandardizedAnalysis> {
        let table = parser::parse(raw.as_text()?);

        let metadata = AnalysisMetadata::new("threat-list", ADAPTER_VERSION, 0.9);
        let mut analysis = StandardizedAnalysis::new(Framework::Stride, metadata);
        analysis.original_data = serde_json::to_value(&table.records)
            .unwrap_or(serde_json::Value::Null);

        // Asset name -> entity original_id, first appearance wins
        let mut seen_assets: HashMap<String, String> = HashMap::new();

        for (idx, record) in table.records.iter().enumerate() {
            let row = idx + 1;

            let entity_id = non_empty(record, "asset").map(|asset| {
                if let Some(existing) = seen_assets.get(&asset.to_lowercase()) {
                    existing.clone()
                } else {
                    let id = format!("asset-{}", seen_assets.len() + 1);
                    let entity_type = Self::infer_asset_type(asset);
                    analysis.entities.push(EntityMapping {
                        original_id: id.clone(),
                        name: asset.to_string(),
                        entity_type,
                        original_type: None,
                        properties: HashMap::new(),
                        confidence: if entity_type == EntityType::Unknown { 0.6 } else { 0.75 },
                    });
                    seen_assets.insert(asset.to_lowercase(), id.clone());
                    id
                }
            });

            let Some(threat_name) = non_empty(record, "threat") else {
                continue;
            };

            let raw_category = non_empty(record, "category");
            let category = raw_category
                .and_then(severity::normalize_category)
                .map_or_else(
                    || raw_category.unwrap_or("uncategorized").trim().to_lowercase(),
                    str::to_string,
                );
            let threat_id = non_empty(record, "id")
                .map_or_else(|| format!("threat-{row}"), str::to_string);

            analysis.threats.push(ThreatMapping {
                original_id: threat_id.clone(),
                name: threat_name.to_string(),
                description: non_empty(record, "description").unwrap_or("").to_string(),
                category,
                original_category: raw_category.map(str::to_string),
                severity: Self::record_severity(record),
                state: non_empty(record, "state").unwrap_or("identified").to_string(),
                affected_entity: entity_id.clone(),
                affected_flow: None,
                properties: HashMap::new(),
                confidence: 0.85,
            });

            if let Some(mitigation) = non_empty(record, "mitigation") {
                analysis.controls.push(ControlMapping {
                    original_id: format!("control-{row}"),
                    name: mitigation.to_string(),
                    description: String::new(),
                    control_type: ControlType::Mitigation,
                    state: "proposed".to_string(),
                    threat_id: Some(threat_id),
                    properties: HashMap::new(),
                    confidence: 0.8,
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

    /// The list format has no explicit risk section: derive one risk per
    /// threat from its normalized severity.
    fn extract_risks(&self, analysis: &StandardizedAnalysis) -> Vec<RiskMapping> {
        analysis
            .threats
            .iter()
            .map(|threat| {
                let entity_name = threat
                    .affected_entity
                    .as_deref()
                    .and_then(|id| analysis.entity(id))
                    .map(|e| e.name.clone());
                RiskMapping {
                    id: format!("risk-{}", threat.original_id),
                    name: threat.name.clone(),
                    description: if threat.description.is_empty() {
                        None
                    } else {
                        Some(threat.description.clone())
                    },
                    score: severity::severity_to_score(threat.severity),
                    category: Some(threat.category.clone()),
                    entity_id: threat.affected_entity.clone(),
                    entity_name,
                    properties: HashMap::new(),
                }
            })
            .collect()
    }
}
