//! Caller-supplied system entity catalog used by reconciliation.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// One entity in the caller's catalog of known system entities.
///
/// The type label is free-form: catalogs predate any import and use their
/// own vocabulary ("application", "database", ...). Compatibility with
/// canonical entity types is resolved through the reconciler's synonym
/// groups, not here.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SystemEntity {
    pub id: String,
    pub name: String,
    #[serde(rename = "type", default)]
    pub entity_type: String,
    #[serde(skip_serializing_if = "HashMap::is_empty", default)]
    pub properties: HashMap<String, String>,
}

impl SystemEntity {
    #[must_use]
    pub fn new(id: &str, name: &str, entity_type: &str) -> Self {
        Self {
            id: id.to_string(),
            name: name.to_string(),
            entity_type: entity_type.to_string(),
            properties: HashMap::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_catalog_entry_deserializes_without_properties() {
        let entity: SystemEntity =
            serde_json::from_str(r#"{"id":"s1","name":"Orders DB","type":"database"}"#).unwrap();
        assert_eq!(entity.name, "Orders DB");
        assert_eq!(entity.entity_type, "database");
        assert!(entity.properties.is_empty());
    }
}
