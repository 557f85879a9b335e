//! Adapter registry and batch import orchestration.
//!
//! The registry owns the format-id to adapter table, resolves formats for
//! incoming items (explicit hint first, then core detection, then adapter
//! file claims), and runs batch imports in parallel with per-item failure
//! isolation: one malformed item never affects its neighbors.

use rayon::prelude::*;
use rustc_hash::FxHashMap;
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, warn};

use crate::adapters::{
    self, FormatAdapter, GenericDelimitedAdapter, InputKind, RawData, RiskDocumentAdapter,
    ThreatListAdapter, ToolExportAdapter,
};
use crate::error::ConvergeError;
use crate::types::{StandardizedAnalysis, ValidationResult};

/// One unit of work for an import run.
#[derive(Debug, Clone)]
pub struct ImportItem {
    pub id: String,
    pub file_name: Option<String>,
    pub content: String,
    pub format_hint: Option<String>,
}

impl ImportItem {
    #[must_use]
    pub fn new(id: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            file_name: None,
            content: content.into(),
            format_hint: None,
        }
    }

    #[must_use]
    pub fn with_file_name(mut self, file_name: impl Into<String>) -> Self {
        self.file_name = Some(file_name.into());
        self
    }

    #[must_use]
    pub fn with_hint(mut self, format_id: impl Into<String>) -> Self {
        self.format_hint = Some(format_id.into());
        self
    }
}

/// Per-item result of an import run. Failed items carry an error string and
/// whatever validation output was produced before the failure.
#[derive(Debug, Clone, Serialize)]
pub struct ImportOutcome {
    pub item_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub format: Option<String>,
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub analysis: Option<StandardizedAnalysis>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub validation: Option<ValidationResult>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ImportOutcome {
    fn succeeded(
        item_id: String,
        format: String,
        analysis: StandardizedAnalysis,
        validation: ValidationResult,
    ) -> Self {
        Self {
            item_id,
            format: Some(format),
            success: true,
            analysis: Some(analysis),
            validation: Some(validation),
            error: None,
        }
    }

    fn failed(item_id: String, format: Option<String>, error: impl Into<String>) -> Self {
        Self {
            item_id,
            format,
            success: false,
            analysis: None,
            validation: None,
            error: Some(error.into()),
        }
    }
}

/// Format-id to adapter table. `Default` pre-loads the four built-ins.
pub struct AdapterRegistry {
    adapters: FxHashMap<String, Arc<dyn FormatAdapter>>,
}

impl Default for AdapterRegistry {
    fn default() -> Self {
        let mut registry = Self { adapters: FxHashMap::default() };
        registry.register(Arc::new(ToolExportAdapter::new()));
        registry.register(Arc::new(ThreatListAdapter::new()));
        registry.register(Arc::new(RiskDocumentAdapter::new()));
        registry.register(Arc::new(GenericDelimitedAdapter::new()));
        registry
    }
}

impl AdapterRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an adapter under its declared format id. Re-registering an
    /// id replaces the previous adapter.
    pub fn register(&mut self, adapter: Arc<dyn FormatAdapter>) {
        let id = adapter.format_id().to_string();
        if self.adapters.insert(id.clone(), adapter).is_some() {
            debug!(format = %id, "replaced adapter registration");
        }
    }

    #[must_use]
    pub fn get(&self, format_id: &str) -> Option<&Arc<dyn FormatAdapter>> {
        self.adapters.get(format_id)
    }

    #[must_use]
    pub fn format_ids(&self) -> Vec<&str> {
        let mut ids: Vec<&str> = self.adapters.keys().map(String::as_str).collect();
        ids.sort_unstable();
        ids
    }

    /// Resolve a format id: core detection first, then adapters' declared
    /// file claims.
    #[must_use]
    pub fn detect_format(&self, file_name: Option<&str>, content: Option<&str>) -> Option<String> {
        if let Some(format) = adapters::detect_format(file_name, content) {
            return Some(format.id().to_string());
        }
        let name = file_name?;
        self.adapters
            .values()
            .find(|adapter| adapter.claims_file(name))
            .map(|adapter| adapter.format_id().to_string())
    }

    /// Import a single item: resolve the format, prepare the raw input for
    /// the adapter's input kind, validate, then transform.
    #[must_use]
    pub fn import_item(&self, item: &ImportItem) -> ImportOutcome {
        let format_id = item.format_hint.clone().or_else(|| {
            self.detect_format(item.file_name.as_deref(), Some(&item.content))
        });
        let Some(format_id) = format_id else {
            debug!(item = %item.id, "format not detected");
            return ImportOutcome::failed(item.id.clone(), None, "format not detected");
        };

        let Some(adapter) = self.get(&format_id) else {
            let err = ConvergeError::adapter_not_found(&format_id);
            warn!(item = %item.id, format = %format_id, "no adapter registered");
            return ImportOutcome::failed(item.id.clone(), Some(format_id), err.to_string());
        };

        let raw = match adapter.input_kind() {
            InputKind::Delimited => RawData::Text(item.content.clone()),
            InputKind::Document => match serde_json::from_str(&item.content) {
                Ok(doc) => RawData::Document(doc),
                Err(e) => {
                    let err = ConvergeError::document_parse(e.to_string());
                    return ImportOutcome::failed(
                        item.id.clone(),
                        Some(format_id),
                        err.to_string(),
                    );
                }
            },
        };

        let validation = match adapter.validate(&raw) {
            Ok(validation) => validation,
            Err(e) => {
                return ImportOutcome::failed(item.id.clone(), Some(format_id), e.to_string());
            }
        };
        if !validation.is_valid {
            let mut outcome = ImportOutcome::failed(
                item.id.clone(),
                Some(format_id),
                format!("validation failed: {}", validation.errors.join("; ")),
            );
            outcome.validation = Some(validation);
            return outcome;
        }

        match adapter.transform(&raw) {
            Ok(mut analysis) => {
                analysis.metadata.file_name = item.file_name.clone();
                debug!(
                    item = %item.id,
                    format = %format_id,
                    entities = analysis.entities.len(),
                    threats = analysis.threats.len(),
                    "import succeeded"
                );
                ImportOutcome::succeeded(item.id.clone(), format_id, analysis, validation)
            }
            Err(e) => ImportOutcome::failed(item.id.clone(), Some(format_id), e.to_string()),
        }
    }

    /// Import a batch in parallel. Results come back in input order and
    /// every item produces exactly one outcome, failed or not.
    #[must_use]
    pub fn batch_import(&self, items: &[ImportItem]) -> Vec<ImportOutcome> {
        items.par_iter().map(|item| self.import_item(item)).collect()
    }
}
