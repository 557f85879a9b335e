//! Severity/score normalization shared by all adapters.
//!
//! Maps each adapter's native qualitative and quantitative risk vocabulary
//! onto one ordinal severity scale and one 0-10 numeric scale. Tables are
//! kept as plain data so they can be unit-tested and extended independently
//! of parsing logic.

use crate::types::Severity;

/// The six canonical threat-category tokens.
pub const CANONICAL_CATEGORIES: [&str; 6] = [
    "spoofing",
    "tampering",
    "repudiation",
    "information_disclosure",
    "denial_of_service",
    "elevation_of_privilege",
];

/// Adapter-native category spellings and their canonical token. Single
/// letters, full words, spaced forms and common aliases all normalize to
/// exactly one token.
const CATEGORY_ALIASES: [(&str, &str); 21] = [
    ("s", "spoofing"),
    ("spoofing", "spoofing"),
    ("spoofing identity", "spoofing"),
    ("t", "tampering"),
    ("tampering", "tampering"),
    ("tampering with data", "tampering"),
    ("r", "repudiation"),
    ("repudiation", "repudiation"),
    ("i", "information_disclosure"),
    ("information disclosure", "information_disclosure"),
    ("information_disclosure", "information_disclosure"),
    ("info disclosure", "information_disclosure"),
    ("d", "denial_of_service"),
    ("denial of service", "denial_of_service"),
    ("denial_of_service", "denial_of_service"),
    ("dos", "denial_of_service"),
    ("e", "elevation_of_privilege"),
    ("elevation of privilege", "elevation_of_privilege"),
    ("elevation_of_privilege", "elevation_of_privilege"),
    ("eop", "elevation_of_privilege"),
    ("privilege escalation", "elevation_of_privilege"),
];

/// Qualitative label -> five-point score. Unrecognized labels default to the
/// medium value.
const QUALITATIVE_SCORES: [(&str, f64); 9] = [
    ("very high", 5.0),
    ("very_high", 5.0),
    ("critical", 5.0),
    ("high", 4.0),
    ("medium", 3.0),
    ("moderate", 3.0),
    ("low", 2.0),
    ("very low", 1.0),
    ("very_low", 1.0),
];

const QUALITATIVE_DEFAULT: f64 = 3.0;

/// Normalize an adapter-native category spelling onto one of the six
/// canonical tokens. Returns `None` for vocabulary outside the taxonomy,
/// letting the caller keep the free-form category and warn.
#[must_use]
pub fn normalize_category(raw: &str) -> Option<&'static str> {
    let needle = raw.trim().to_lowercase();
    CATEGORY_ALIASES
        .iter()
        .find(|(alias, _)| *alias == needle)
        .map(|(_, canonical)| *canonical)
}

/// Qualitative label -> numeric score on the five-point scale.
#[must_use]
pub fn qualitative_score(label: &str) -> f64 {
    let needle = label.trim().to_lowercase();
    if needle == "negligible" {
        return 1.0;
    }
    QUALITATIVE_SCORES
        .iter()
        .find(|(l, _)| *l == needle)
        .map_or(QUALITATIVE_DEFAULT, |(_, score)| *score)
}

/// Ordinal severity -> numeric score on the 0-10 scale.
#[must_use]
pub fn severity_to_score(severity: Severity) -> f64 {
    match severity {
        Severity::Critical => 10.0,
        Severity::High => 8.0,
        Severity::Medium => 5.0,
        Severity::Low => 2.0,
        Severity::Info => 1.0,
    }
}

/// Numeric score on the 0-10 scale -> ordinal severity.
#[must_use]
pub fn score_to_severity(score: f64) -> Severity {
    if score >= 9.0 {
        Severity::Critical
    } else if score >= 7.0 {
        Severity::High
    } else if score >= 4.0 {
        Severity::Medium
    } else {
        Severity::Low
    }
}

/// Combine likelihood-like and impact-like values by arithmetic mean. Used
/// when a format gives both but no direct score or severity.
#[must_use]
pub fn combine_likelihood_impact(likelihood: f64, impact: f64) -> f64 {
    (likelihood + impact) / 2.0
}

/// Lifecycle-state adjustment applied to a derived 0-10 score: a remediated
/// threat's effective score drops to a fifth, an unaddressed one is bumped.
/// Applied after base scoring and before ordinal reclassification.
#[must_use]
pub fn adjust_for_state(score: f64, state: &str) -> f64 {
    match state.trim().to_lowercase().as_str() {
        "mitigated" => score * 0.2,
        "not started" | "not_started" => (score * 1.2).min(10.0),
        _ => score,
    }
}
