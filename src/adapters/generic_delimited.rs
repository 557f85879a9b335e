//! Schema-free adapter for arbitrary delimited exports.
//!
//! Nothing about the input shape is known up front. Headers are classified
//! into role groups by keyword containment, then into sub-roles within each
//! group, and the transform works off whatever the classification found.
//! Everything here is heuristic, so confidences stay low and the metadata
//! marks the analysis as low-trust.

use regex::Regex;
use std::collections::HashMap;
use std::sync::OnceLock;

use super::{FormatAdapter, InputKind, RawData};
use crate::error::Result;
use crate::parser::{self, ParsedTable};
use crate::reconcile::{reconcile, MatchThresholds, MatchWeights, ReconciliationResult};
use crate::severity;
use crate::types::{
    AnalysisMetadata, ControlMapping, ControlType, EntityMapping, EntityType, Framework,
    RelationshipMapping, RiskMapping, Severity, StandardizedAnalysis, SystemEntity, ThreatMapping,
    ValidationResult,
};

const ADAPTER_VERSION: &str = "0.9.1";

/// Hard ceiling for entities recovered by the free-text fallback. The
/// heuristic trades precision for schema independence, so its output must
/// never outrank schema-derived entities.
const FREE_TEXT_CONFIDENCE_CAP: f64 = 0.4;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Role {
    Entity,
    Threat,
    Control,
    Risk,
    RelSource,
    RelTarget,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SubRole {
    Name,
    Type,
    Description,
    Severity,
    Category,
    Effectiveness,
    Score,
    Impact,
    Likelihood,
}

/// Role keywords, checked by containment in listed order; first hit wins.
const ROLE_KEYWORDS: [(&str, Role); 15] = [
    ("asset", Role::Entity),
    ("entity", Role::Entity),
    ("component", Role::Entity),
    ("threat", Role::Threat),
    ("vulnerability", Role::Threat),
    ("attack", Role::Threat),
    ("control", Role::Control),
    ("mitigation", Role::Control),
    ("risk", Role::Risk),
    ("score", Role::Risk),
    ("rating", Role::Risk),
    ("from", Role::RelSource),
    ("source", Role::RelSource),
    ("to", Role::RelTarget),
    ("target", Role::RelTarget),
];

/// Sub-role keywords within a classified group.
const SUB_ROLE_KEYWORDS: [(&str, SubRole); 9] = [
    ("name", SubRole::Name),
    ("type", SubRole::Type),
    ("description", SubRole::Description),
    ("severity", SubRole::Severity),
    ("category", SubRole::Category),
    ("effectiveness", SubRole::Effectiveness),
    ("score", SubRole::Score),
    ("impact", SubRole::Impact),
    ("likelihood", SubRole::Likelihood),
];

/// Headers that mark a column as carrying identifying values, used only by
/// the free-text entity fallback.
const IDENTITY_HINTS: [&str; 4] = ["name", "title", "label", "id"];

/// Keyword table reused for typing entities from name or type values.
const ENTITY_TYPE_KEYWORDS: [(&str, EntityType); 13] = [
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

const BOOLEAN_LITERALS: [&str; 6] = ["true", "false", "yes", "no", "y", "n"];

fn free_text_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    // Alphabetic with interior spaces/hyphens, 3 to 50 chars
    PATTERN.get_or_init(|| Regex::new(r"^[A-Za-z][A-Za-z \-]{1,48}[A-Za-z]$").unwrap())
}

/// Result of classifying a parsed header set. Each slot keeps the first
/// matching header only.
#[derive(Debug, Default)]
struct ColumnMap {
    entity_name: Option<String>,
    entity_type: Option<String>,
    threat_name: Option<String>,
    threat_description: Option<String>,
    threat_severity: Option<String>,
    threat_category: Option<String>,
    control_name: Option<String>,
    control_effectiveness: Option<String>,
    risk_name: Option<String>,
    risk_score: Option<String>,
    risk_impact: Option<String>,
    risk_likelihood: Option<String>,
    rel_source: Option<String>,
    rel_target: Option<String>,
    unclassified: Vec<String>,
}

impl ColumnMap {
    fn classify(headers: &[String]) -> Self {
        let mut map = Self::default();
        for header in headers {
            match role_of(header) {
                Some(Role::Entity) => match sub_role_of(header) {
                    Some(SubRole::Type) => assign(&mut map.entity_type, header),
                    _ => assign(&mut map.entity_name, header),
                },
                Some(Role::Threat) => match sub_role_of(header) {
                    Some(SubRole::Description) => assign(&mut map.threat_description, header),
                    Some(SubRole::Severity) => assign(&mut map.threat_severity, header),
                    Some(SubRole::Category) => assign(&mut map.threat_category, header),
                    _ => assign(&mut map.threat_name, header),
                },
                Some(Role::Control) => match sub_role_of(header) {
                    Some(SubRole::Effectiveness) => assign(&mut map.control_effectiveness, header),
                    _ => assign(&mut map.control_name, header),
                },
                Some(Role::Risk) => match sub_role_of(header) {
                    Some(SubRole::Name) => assign(&mut map.risk_name, header),
                    Some(SubRole::Impact) => assign(&mut map.risk_impact, header),
                    Some(SubRole::Likelihood) => assign(&mut map.risk_likelihood, header),
                    _ => assign(&mut map.risk_score, header),
                },
                Some(Role::RelSource) => assign(&mut map.rel_source, header),
                Some(Role::RelTarget) => assign(&mut map.rel_target, header),
                // Bare sub-role headers still carry signal: attach threat
                // descriptors to the threat group and scoring inputs to the
                // risk group.
                None => match sub_role_of(header) {
                    Some(SubRole::Severity) => assign(&mut map.threat_severity, header),
                    Some(SubRole::Category) => assign(&mut map.threat_category, header),
                    Some(SubRole::Description) => assign(&mut map.threat_description, header),
                    Some(SubRole::Impact) => assign(&mut map.risk_impact, header),
                    Some(SubRole::Likelihood) => assign(&mut map.risk_likelihood, header),
                    _ => map.unclassified.push(header.clone()),
                },
            }
        }
        map
    }

    fn recognized_any(&self) -> bool {
        self.entity_name.is_some()
            || self.threat_name.is_some()
            || self.control_name.is_some()
            || self.risk_score.is_some()
            || (self.rel_source.is_some() && self.rel_target.is_some())
    }
}

fn role_of(header: &str) -> Option<Role> {
    ROLE_KEYWORDS
        .iter()
        .find(|(keyword, _)| header.contains(keyword))
        .map(|(_, role)| *role)
}

fn sub_role_of(header: &str) -> Option<SubRole> {
    SUB_ROLE_KEYWORDS
        .iter()
        .find(|(keyword, _)| header.contains(keyword))
        .map(|(_, sub)| *sub)
}

fn assign(slot: &mut Option<String>, header: &str) {
    if slot.is_none() {
        *slot = Some(header.to_string());
    }
}

fn non_empty<'a>(record: &'a HashMap<String, String>, key: &str) -> Option<&'a str> {
    record.get(key).map(String::as_str).filter(|v| !v.trim().is_empty())
}

/// A cell value that plausibly names an entity: alphabetic, 3 to 50 chars,
/// not a boolean literal, not pure digits.
fn plausible_entity_name(value: &str) -> bool {
    let trimmed = value.trim();
    free_text_pattern().is_match(trimmed)
        && !BOOLEAN_LITERALS.contains(&trimmed.to_lowercase().as_str())
}

fn infer_entity_type(label: &str) -> EntityType {
    let lowered = label.to_lowercase();
    ENTITY_TYPE_KEYWORDS
        .iter()
        .find(|(keyword, _)| lowered.contains(keyword))
        .map_or(EntityType::Unknown, |(_, entity_type)| *entity_type)
}

/// Direct ordinal label, when the cell spells one out.
fn parse_severity_label(value: &str) -> Option<Severity> {
    match value.trim().to_lowercase().as_str() {
        "critical" | "very high" | "very_high" => Some(Severity::Critical),
        "high" => Some(Severity::High),
        "medium" | "moderate" => Some(Severity::Medium),
        "low" | "very low" | "very_low" => Some(Severity::Low),
        "info" | "informational" | "negligible" => Some(Severity::Info),
        _ => None,
    }
}

/// A score cell may be numeric on the 0-10 scale or a qualitative label.
fn parse_score(value: &str) -> f64 {
    value.trim().parse::<f64>().map_or_else(
        |_| severity::qualitative_score(value) * 2.0,
        |n| n.clamp(0.0, 10.0),
    )
}

/// Adapter for delimited text with no recognized schema.
#[derive(Debug, Default)]
pub struct GenericDelimitedAdapter;

impl GenericDelimitedAdapter {
    #[must_use]
    pub fn new() -> Self {
        Self
    }

    /// Entities from the classified entity column, or from the free-text
    /// fallback when no entity column was recognized. Returns a lookup from
    /// entity name to assigned id for relationship and threat wiring.
    fn extract_entities(
        table: &ParsedTable,
        columns: &ColumnMap,
        analysis: &mut StandardizedAnalysis,
    ) -> HashMap<String, String> {
        let mut ids_by_name: HashMap<String, String> = HashMap::new();
        let mut seen: HashMap<String, String> = HashMap::new();

        if let Some(name_col) = &columns.entity_name {
            for record in &table.records {
                let Some(name) = non_empty(record, name_col) else { continue };
                let key = name.to_lowercase();
                if seen.contains_key(&key) {
                    continue;
                }
                let id = format!("entity-{}", seen.len() + 1);
                seen.insert(key, id.clone());

                let declared_type = columns
                    .entity_type
                    .as_deref()
                    .and_then(|col| non_empty(record, col));
                let entity_type = declared_type
                    .map_or_else(|| infer_entity_type(name), infer_entity_type);
                let confidence = if declared_type.is_some() { 0.6 } else { 0.5 };

                ids_by_name.insert(name.to_string(), id.clone());
                analysis.entities.push(EntityMapping {
                    original_id: id,
                    name: name.to_string(),
                    entity_type,
                    original_type: declared_type.map(str::to_string),
                    properties: HashMap::new(),
                    confidence,
                });
            }
            return ids_by_name;
        }

        // Free-text fallback: scan identity-suggesting columns only
        let identity_columns: Vec<&String> = columns
            .unclassified
            .iter()
            .filter(|header| IDENTITY_HINTS.iter().any(|hint| header.contains(hint)))
            .collect();
        for record in &table.records {
            for column in &identity_columns {
                let Some(value) = non_empty(record, column) else { continue };
                if !plausible_entity_name(value) {
                    continue;
                }
                let key = value.to_lowercase();
                if seen.contains_key(&key) {
                    continue;
                }
                let id = format!("entity-{}", seen.len() + 1);
                seen.insert(key, id.clone());
                ids_by_name.insert(value.to_string(), id.clone());
                analysis.entities.push(EntityMapping {
                    original_id: id,
                    name: value.to_string(),
                    entity_type: infer_entity_type(value),
                    original_type: None,
                    properties: HashMap::new(),
                    confidence: FREE_TEXT_CONFIDENCE_CAP,
                });
            }
        }
        ids_by_name
    }

    fn record_severity(record: &HashMap<String, String>, columns: &ColumnMap) -> Severity {
        if let Some(col) = &columns.threat_severity {
            if let Some(value) = non_empty(record, col) {
                if let Some(severity) = parse_severity_label(value) {
                    return severity;
                }
                return severity::score_to_severity(parse_score(value));
            }
        }
        let likelihood = columns
            .risk_likelihood
            .as_deref()
            .and_then(|col| non_empty(record, col))
            .map(severity::qualitative_score);
        let impact = columns
            .risk_impact
            .as_deref()
            .and_then(|col| non_empty(record, col))
            .map(severity::qualitative_score);
        if let (Some(likelihood), Some(impact)) = (likelihood, impact) {
            let combined = severity::combine_likelihood_impact(likelihood, impact) * 2.0;
            return severity::score_to_severity(combined);
        }
        Severity::Medium
    }
}

impl FormatAdapter for GenericDelimitedAdapter {
    fn format_id(&self) -> &'static str {
        "generic-delimited"
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
        if table.records.is_empty() {
            result.add_error("input has no parsable records");
            return Ok(result);
        }

        let columns = ColumnMap::classify(&table.headers);
        if !columns.recognized_any() && columns.unclassified.is_empty() {
            result.add_error("no columns could be classified");
            return Ok(result);
        }
        if columns.entity_name.is_none() {
            result.add_warning(
                "no entity column recognized; free-text entity heuristics will apply",
            );
        }
        if columns.threat_name.is_none() {
            result.add_warning("no threat column recognized");
        }
        if !columns.unclassified.is_empty() {
            result.add_warning(format!(
                "unclassified columns: {}",
                columns.unclassified.join(", ")
            ));
        }

        Ok(result)
    }

    fn transform(&self, raw: &RawData) -> Result<StandardizedAnalysis> {
        let table = parser::parse(raw.as_text()?);
        let columns = ColumnMap::classify(&table.headers);

        let schema_confidence = if columns.entity_name.is_some() { 0.5 } else { 0.4 };
        let metadata =
            AnalysisMetadata::new("generic-delimited", ADAPTER_VERSION, schema_confidence);
        let mut analysis = StandardizedAnalysis::new(Framework::Custom, metadata);
        analysis.original_data = serde_json::to_value(&table.records).unwrap_or_default();

        let entity_ids = Self::extract_entities(&table, &columns, &mut analysis);

        if let Some(threat_col) = &columns.threat_name {
            for (row, record) in table.records.iter().enumerate() {
                let Some(name) = non_empty(record, threat_col) else { continue };
                let affected_entity = columns
                    .entity_name
                    .as_deref()
                    .and_then(|col| non_empty(record, col))
                    .and_then(|entity_name| entity_ids.get(entity_name).cloned());
                let raw_category = columns
                    .threat_category
                    .as_deref()
                    .and_then(|col| non_empty(record, col));
                let category = raw_category
                    .and_then(severity::normalize_category)
                    .map_or_else(
                        || raw_category.unwrap_or("uncategorized").trim().to_lowercase(),
                        str::to_string,
                    );

                analysis.threats.push(ThreatMapping {
                    original_id: format!("threat-{}", row + 1),
                    name: name.to_string(),
                    description: columns
                        .threat_description
                        .as_deref()
                        .and_then(|col| non_empty(record, col))
                        .unwrap_or_default()
                        .to_string(),
                    category,
                    original_category: raw_category.map(str::to_string),
                    severity: Self::record_severity(record, &columns),
                    state: "identified".to_string(),
                    affected_entity,
                    affected_flow: None,
                    properties: HashMap::new(),
                    confidence: 0.6,
                });
            }
        }

        if let Some(control_col) = &columns.control_name {
            for (row, record) in table.records.iter().enumerate() {
                let Some(name) = non_empty(record, control_col) else { continue };
                let threat_id = columns
                    .threat_name
                    .as_deref()
                    .and_then(|col| non_empty(record, col))
                    .map(|_| format!("threat-{}", row + 1));
                let mut properties = HashMap::new();
                if let Some(effectiveness) = columns
                    .control_effectiveness
                    .as_deref()
                    .and_then(|col| non_empty(record, col))
                {
                    properties.insert("effectiveness".to_string(), effectiveness.to_string());
                }
                analysis.controls.push(ControlMapping {
                    original_id: format!("control-{}", row + 1),
                    name: name.to_string(),
                    description: String::new(),
                    control_type: ControlType::Mitigation,
                    state: "proposed".to_string(),
                    threat_id,
                    properties,
                    confidence: 0.5,
                });
            }
        }

        // Relationship inference needs both endpoints and a severity signal;
        // endpoint values resolve by exact name match only.
        if columns.threat_severity.is_some() {
            if let (Some(source_col), Some(target_col)) =
                (&columns.rel_source, &columns.rel_target)
            {
                for (row, record) in table.records.iter().enumerate() {
                    let source = non_empty(record, source_col)
                        .and_then(|value| entity_ids.get(value));
                    let target = non_empty(record, target_col)
                        .and_then(|value| entity_ids.get(value));
                    if let (Some(source), Some(target)) = (source, target) {
                        analysis.relationships.push(RelationshipMapping {
                            original_id: format!("rel-{}", row + 1),
                            source: source.clone(),
                            target: target.clone(),
                            relationship_type: "association".to_string(),
                            action: "relates to".to_string(),
                            properties: HashMap::new(),
                            confidence: 0.4,
                        });
                    }
                }
            }
        }

        if let Some(score_col) = &columns.risk_score {
            for (row, record) in table.records.iter().enumerate() {
                let Some(score) = non_empty(record, score_col) else { continue };
                let name = columns
                    .risk_name
                    .as_deref()
                    .and_then(|col| non_empty(record, col))
                    .or_else(|| {
                        columns
                            .threat_name
                            .as_deref()
                            .and_then(|col| non_empty(record, col))
                    })
                    .unwrap_or("unnamed risk");
                analysis.risks.push(RiskMapping {
                    id: format!("risk-{}", row + 1),
                    name: name.to_string(),
                    description: None,
                    score: parse_score(score),
                    category: None,
                    entity_id: None,
                    entity_name: columns
                        .entity_name
                        .as_deref()
                        .and_then(|col| non_empty(record, col))
                        .map(str::to_string),
                    properties: HashMap::new(),
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
            MatchWeights::GENERIC,
            MatchThresholds::GENERIC,
        )
    }

    /// Explicit risk columns win; otherwise one derived risk per threat.
    fn extract_risks(&self, analysis: &StandardizedAnalysis) -> Vec<RiskMapping> {
        if !analysis.risks.is_empty() {
            return analysis.risks.clone();
        }
        analysis
            .threats
            .iter()
            .map(|threat| RiskMapping {
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
                entity_name: None,
                properties: HashMap::new(),
            })
            .collect()
    }
}
