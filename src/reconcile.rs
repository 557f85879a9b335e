//! Entity reconciliation: confidence-scored fuzzy matching of imported
//! entities against a caller-supplied catalog of system entities.
//!
//! Every adapter invokes the same algorithm with its own weights and
//! thresholds (schema-rich formats trust name+type more than the
//! schema-free generic adapter). Deterministic: same inputs, same result.

use serde::{Deserialize, Serialize};

use crate::similarity::similarity;
use crate::types::{clamp_confidence, EntityMapping, SystemEntity};

/// Mutually compatible type labels. A canonical entity type and a catalog
/// type label score a full type match when both fall in the same group.
const TYPE_COMPATIBILITY_GROUPS: [&[&str]; 8] = [
    &["software", "application", "service", "component", "process"],
    &["datastore", "database", "storage", "data_store"],
    &["network", "firewall", "router", "subnet"],
    &["human", "user", "actor", "person"],
    &["external_entity", "external", "third_party", "external_interactor"],
    &["adversary", "attacker", "threat_agent", "threat_actor"],
    &["cloud_service", "cloud", "saas"],
    &["infrastructure", "host", "server", "vm"],
];

/// Domain property keys compared when both sides provide a value.
const PROPERTY_KEYS: [&str; 3] = ["criticality", "trust_level", "zone"];

/// Per-adapter factor weights. Must sum to at most 1 across the factors in
/// use.
#[derive(Debug, Clone, Copy)]
pub struct MatchWeights {
    pub name: f64,
    pub entity_type: f64,
    pub property: f64,
}

impl MatchWeights {
    /// Weighting for schema-rich formats (tool exports, threat lists,
    /// structured risk documents).
    pub const SCHEMA_RICH: Self = Self { name: 0.5, entity_type: 0.3, property: 0.2 };

    /// Weighting for the generic/low-schema adapter: name is weighted
    /// higher because type is frequently unknown.
    pub const GENERIC: Self = Self { name: 0.6, entity_type: 0.2, property: 0.2 };
}

/// Per-adapter bucketing thresholds: score > `confident` is a mapping,
/// `suggestion` < score <= `confident` is a suggestion, the rest unmapped.
#[derive(Debug, Clone, Copy)]
pub struct MatchThresholds {
    pub confident: f64,
    pub suggestion: f64,
}

impl MatchThresholds {
    pub const SCHEMA_RICH: Self = Self { confident: 0.75, suggestion: 0.45 };
    pub const GENERIC: Self = Self { confident: 0.6, suggestion: 0.3 };
}

/// One scored pairing of an imported entity with its best catalog candidate.
///
/// Carries enough of both records to be rendered to a human reviewer
/// without further lookups.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EntityMatch {
    pub entity: EntityMapping,
    pub candidate_id: String,
    pub candidate_name: String,
    pub confidence: f64,
    /// Human-readable summary of which factors fired
    pub reason: String,
}

/// An imported entity with no acceptable catalog candidate.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UnmappedEntity {
    pub entity: EntityMapping,
    /// Best sub-threshold score observed, 0.0 for an empty catalog
    pub best_score: f64,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub closest_candidate: Option<String>,
}

/// Reconciliation output: three ordered buckets, exhaustive and mutually
/// exclusive over the imported entities.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ReconciliationResult {
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub mappings: Vec<EntityMatch>,
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub suggestions: Vec<EntityMatch>,
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub unmapped: Vec<UnmappedEntity>,
}

impl ReconciliationResult {
    /// Total number of imported entities across all buckets.
    #[must_use]
    pub fn total(&self) -> usize {
        self.mappings.len() + self.suggestions.len() + self.unmapped.len()
    }
}

/// Reconcile imported entities against the caller's catalog.
pub fn reconcile(
    imported: &[EntityMapping],
    catalog: &[SystemEntity],
    weights: MatchWeights,
    thresholds: MatchThresholds,
) -> ReconciliationResult {
    let mut result = ReconciliationResult::default();

    for entity in imported {
        match best_candidate(entity, catalog, weights) {
            Some((candidate, score, reason)) if score > thresholds.confident => {
                result.mappings.push(EntityMatch {
                    entity: entity.clone(),
                    candidate_id: candidate.id.clone(),
                    candidate_name: candidate.name.clone(),
                    confidence: score,
                    reason,
                });
            }
            Some((candidate, score, reason)) if score > thresholds.suggestion => {
                result.suggestions.push(EntityMatch {
                    entity: entity.clone(),
                    candidate_id: candidate.id.clone(),
                    candidate_name: candidate.name.clone(),
                    confidence: score,
                    reason,
                });
            }
            Some((candidate, score, _)) => {
                result.unmapped.push(UnmappedEntity {
                    entity: entity.clone(),
                    best_score: score,
                    closest_candidate: Some(candidate.name.clone()),
                });
            }
            None => {
                result.unmapped.push(UnmappedEntity {
                    entity: entity.clone(),
                    best_score: 0.0,
                    closest_candidate: None,
                });
            }
        }
    }

    result
}

/// Score every candidate and keep the single highest. Ties keep the earlier
/// catalog entry, so results are stable across runs.
fn best_candidate<'a>(
    entity: &EntityMapping,
    catalog: &'a [SystemEntity],
    weights: MatchWeights,
) -> Option<(&'a SystemEntity, f64, String)> {
    let mut best: Option<(&SystemEntity, f64, String)> = None;

    for candidate in catalog {
        let (score, reason) = score_pair(entity, candidate, weights);
        if best.as_ref().map_or(true, |(_, best_score, _)| score > *best_score) {
            best = Some((candidate, score, reason));
        }
    }

    best
}

/// Multi-factor confidence score for one imported/candidate pair.
fn score_pair(
    entity: &EntityMapping,
    candidate: &SystemEntity,
    weights: MatchWeights,
) -> (f64, String) {
    let name_score = similarity(&entity.name, &candidate.name);
    let type_score = type_compatibility(entity.entity_type.as_str(), &candidate.entity_type);
    let property_score = property_overlap(entity, candidate);

    let combined = clamp_confidence(
        name_score * weights.name
            + type_score * weights.entity_type
            + property_score * weights.property,
    );

    let mut factors = vec![format!("name similarity {name_score:.2}")];
    if type_score > 0.0 {
        factors.push(format!(
            "compatible types ({} ~ {})",
            entity.entity_type.as_str(),
            candidate.entity_type
        ));
    }
    if property_score > 0.0 {
        factors.push(format!("matching properties {property_score:.2}"));
    }
    (combined, factors.join(", "))
}

/// 1.0 when the two type labels are identical or fall in the same
/// compatibility group, else 0.0.
fn type_compatibility(imported: &str, candidate: &str) -> f64 {
    let imported = imported.trim().to_lowercase();
    let candidate = candidate.trim().to_lowercase();
    if candidate.is_empty() {
        return 0.0;
    }
    if imported == candidate {
        return 1.0;
    }
    let in_same_group = TYPE_COMPATIBILITY_GROUPS.iter().any(|group| {
        group.contains(&imported.as_str()) && group.contains(&candidate.as_str())
    });
    if in_same_group {
        1.0
    } else {
        0.0
    }
}

/// Fraction of the fixed domain property keys, provided by both sides, that
/// match exactly (case-insensitive). Mismatches contribute nothing, never a
/// negative.
fn property_overlap(entity: &EntityMapping, candidate: &SystemEntity) -> f64 {
    let mut compared = 0usize;
    let mut matched = 0usize;

    for key in PROPERTY_KEYS {
        let (Some(a), Some(b)) = (entity.properties.get(key), candidate.properties.get(key))
        else {
            continue;
        };
        compared += 1;
        if a.trim().eq_ignore_ascii_case(b.trim()) {
            matched += 1;
        }
    }

    if compared == 0 {
        0.0
    } else {
        matched as f64 / compared as f64
    }
}
