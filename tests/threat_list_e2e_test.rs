//! End-to-end import of a delimited threat list through the public API:
//! detection, validation, transform, reconciliation and risk derivation.

use converge::{
    AdapterRegistry, EntityType, ImportItem, Severity, StandardizedAnalysis, SystemEntity,
};
use std::collections::HashMap;

const SINGLE_ROW: &str =
    "Threat,Category,Asset,Mitigation\nSQL Injection,Tampering,Web API,Input validation\n";

fn import(content: &str) -> StandardizedAnalysis {
    let registry = AdapterRegistry::new();
    let outcome = registry.import_item(&ImportItem::new("e2e", content));
    assert!(outcome.success, "import failed: {:?}", outcome.error);
    assert_eq!(outcome.format.as_deref(), Some("threat-list"));
    outcome.analysis.unwrap()
}

#[test]
fn test_single_row_produces_entity_threat_and_control() {
    let analysis = import(SINGLE_ROW);

    assert_eq!(analysis.entities.len(), 1);
    let entity = &analysis.entities[0];
    assert_eq!(entity.name, "Web API");
    assert_eq!(entity.entity_type, EntityType::Software);

    assert_eq!(analysis.threats.len(), 1);
    let threat = &analysis.threats[0];
    assert_eq!(threat.name, "SQL Injection");
    assert_eq!(threat.category, "tampering");
    assert_eq!(threat.affected_entity.as_deref(), Some(entity.original_id.as_str()));
    // No scoring columns: the five-point default lands on medium
    assert_eq!(threat.severity, Severity::Medium);

    assert_eq!(analysis.controls.len(), 1);
    let control = &analysis.controls[0];
    assert_eq!(control.name, "Input validation");
    assert_eq!(control.threat_id.as_deref(), Some(threat.original_id.as_str()));
}

#[test]
fn test_single_row_derives_one_medium_risk() {
    let registry = AdapterRegistry::new();
    let outcome = registry.import_item(&ImportItem::new("e2e", SINGLE_ROW));
    let analysis = outcome.analysis.unwrap();
    let adapter = registry.get("threat-list").unwrap();

    let risks = adapter.extract_risks(&analysis);
    assert_eq!(risks.len(), 1);
    // Medium on the shared numeric table
    assert_eq!(risks[0].score, 5.0);
    assert_eq!(risks[0].entity_name.as_deref(), Some("Web API"));
}

#[test]
fn test_reconciliation_against_catalog() {
    let registry = AdapterRegistry::new();
    let outcome = registry.import_item(&ImportItem::new("e2e", SINGLE_ROW));
    let analysis = outcome.analysis.unwrap();
    let adapter = registry.get("threat-list").unwrap();

    let catalog = vec![
        SystemEntity {
            id: "sys-1".to_string(),
            name: "Web API".to_string(),
            entity_type: "service".to_string(),
            properties: HashMap::new(),
        },
        SystemEntity {
            id: "sys-2".to_string(),
            name: "Billing Batch Job".to_string(),
            entity_type: "process".to_string(),
            properties: HashMap::new(),
        },
    ];

    let result = adapter.map_to_entities(&analysis, &catalog);
    assert_eq!(result.mappings.len(), 1);
    assert!(result.suggestions.is_empty());
    assert!(result.unmapped.is_empty());

    let mapping = &result.mappings[0];
    assert_eq!(mapping.candidate_id, "sys-1");
    // Exact name plus software/service compatibility
    assert!(mapping.confidence > 0.75);
    assert!(mapping.reason.contains("name similarity"));
}

#[test]
fn test_multi_row_list_deduplicates_assets() {
    let analysis = import(
        "Threat,Category,Asset,Mitigation,Risk\n\
         SQL Injection,Tampering,Web API,Input validation,High\n\
         Credential stuffing,Spoofing,Web API,Rate limiting,Very High\n\
         Log wipe,Repudiation,Audit Storage,Append-only logs,Low\n",
    );

    assert_eq!(analysis.entities.len(), 2);
    assert_eq!(analysis.threats.len(), 3);
    assert_eq!(analysis.controls.len(), 3);

    let severities: Vec<Severity> = analysis.threats.iter().map(|t| t.severity).collect();
    // Five-point: High=4 and Very High=5 both cross the critical line, Low=2 is medium
    assert_eq!(severities, vec![Severity::Critical, Severity::Critical, Severity::Medium]);

    let categories: Vec<&str> = analysis.threats.iter().map(|t| t.category.as_str()).collect();
    assert_eq!(categories, vec!["tampering", "spoofing", "repudiation"]);
}
