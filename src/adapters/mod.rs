//! Format adapters: one shared contract, four built-in implementations.
//!
//! Each adapter validates raw input, transforms it into the standardized
//! analysis model, reconciles entities against a caller's catalog, and
//! extracts a risk list. Adapters are independent modules selected at
//! runtime by format identifier; there is no shared base state.

pub mod generic_delimited;
pub mod risk_document;
pub mod threat_list;
pub mod tool_export;

use serde_json::Value;

use crate::error::{ConvergeError, Result};
use crate::reconcile::ReconciliationResult;
use crate::types::{RiskMapping, StandardizedAnalysis, SystemEntity, ValidationResult};

pub use generic_delimited::GenericDelimitedAdapter;
pub use risk_document::RiskDocumentAdapter;
pub use threat_list::ThreatListAdapter;
pub use tool_export::ToolExportAdapter;

/// Built-in format identifiers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    /// Diagram-tool export (.tm7 or equivalent JSON)
    ToolExport,
    /// Delimited STRIDE-style threat list
    ThreatList,
    /// Seven-stage structured risk document
    RiskDocument,
    /// Delimited text of unknown shape
    GenericDelimited,
    /// Structured document matching no known methodology signature.
    /// No built-in adapter handles this format.
    CustomDocument,
}

impl Format {
    /// Stable string identifier used for registry lookup and hints.
    #[must_use]
    pub fn id(&self) -> &'static str {
        match self {
            Self::ToolExport => "tool-export",
            Self::ThreatList => "threat-list",
            Self::RiskDocument => "risk-document",
            Self::GenericDelimited => "generic-delimited",
            Self::CustomDocument => "custom-document",
        }
    }

    /// Parse a format identifier string.
    #[must_use]
    pub fn parse_id(id: &str) -> Option<Self> {
        match id.trim().to_lowercase().as_str() {
            "tool-export" => Some(Self::ToolExport),
            "threat-list" => Some(Self::ThreatList),
            "risk-document" => Some(Self::RiskDocument),
            "generic-delimited" => Some(Self::GenericDelimited),
            "custom-document" => Some(Self::CustomDocument),
            _ => None,
        }
    }
}

/// The input family an adapter consumes. The registry uses this to prepare
/// `RawData` before calling into the adapter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputKind {
    /// Delimited text, fed through the record parser
    Delimited,
    /// Structured JSON document
    Document,
}

/// Raw input handed to an adapter.
///
/// Handing the wrong family to an adapter is the one fatal condition in
/// this engine: the accessors return a typed `WrongInputShape` error rather
/// than letting an adapter silently produce nonsense.
#[derive(Debug, Clone)]
pub enum RawData {
    Text(String),
    Document(Value),
}

impl RawData {
    pub fn as_text(&self) -> Result<&str> {
        match self {
            Self::Text(text) => Ok(text),
            Self::Document(_) => {
                Err(ConvergeError::wrong_input_shape("delimited text", "structured document"))
            }
        }
    }

    pub fn as_document(&self) -> Result<&Value> {
        match self {
            Self::Document(doc) => Ok(doc),
            Self::Text(_) => {
                Err(ConvergeError::wrong_input_shape("structured document", "delimited text"))
            }
        }
    }
}

/// Shared capability contract implemented by every format adapter.
pub trait FormatAdapter: Send + Sync {
    /// Format identifier this adapter is registered under by default.
    fn format_id(&self) -> &'static str;

    /// Adapter version recorded in analysis metadata.
    fn version(&self) -> &'static str;

    /// Input family this adapter consumes.
    fn input_kind(&self) -> InputKind;

    /// Check structural prerequisites. Errors are blocking; warnings are
    /// recoverable sparsity. An invalid input must not be transformed.
    fn validate(&self, raw: &RawData) -> Result<ValidationResult>;

    /// Pure transform into the standardized model. Same input yields
    /// identical content aside from the wall-clock import timestamp.
    fn transform(&self, raw: &RawData) -> Result<StandardizedAnalysis>;

    /// Reconcile the analysis' entities against the caller's catalog using
    /// this adapter's weights and thresholds.
    fn map_to_entities(
        &self,
        analysis: &StandardizedAnalysis,
        system_entities: &[SystemEntity],
    ) -> ReconciliationResult;

    /// Extract the risk list: declared risks verbatim when the format has
    /// them, otherwise one derived risk per threat.
    fn extract_risks(&self, analysis: &StandardizedAnalysis) -> Vec<RiskMapping>;

    /// Declared format capability: whether this adapter claims the given
    /// file name. Consulted by the registry when core detection fails.
    fn claims_file(&self, _file_name: &str) -> bool {
        false
    }
}

/// Required header set (case-sensitive) that selects the specialized
/// threat-list adapter during content sniffing.
const THREAT_LIST_SIGNATURE: [&str; 4] = ["Threat", "Category", "Asset", "Mitigation"];

/// Best-guess format for a file name and/or content sample.
///
/// Extension rules run first; ambiguous extensions (delimited text,
/// structured documents) fall through to content sniffing. Returns `None`
/// when neither input is informative - callers must then specify an adapter
/// explicitly.
#[must_use]
pub fn detect_format(file_name: Option<&str>, content: Option<&str>) -> Option<Format> {
    if let Some(name) = file_name {
        match extension(name).as_deref() {
            Some("tm7") => return Some(Format::ToolExport),
            Some("csv" | "tsv") => {
                return Some(content.map_or(Format::GenericDelimited, sniff_delimited));
            }
            Some("json") => {
                return Some(content.map_or(Format::CustomDocument, sniff_document));
            }
            _ => {}
        }
    }

    let sample = content?;
    let trimmed = sample.trim_start();
    if trimmed.starts_with('{') || trimmed.starts_with('[') {
        return Some(sniff_document(sample));
    }
    if looks_delimited(sample) {
        return Some(sniff_delimited(sample));
    }
    None
}

fn extension(file_name: &str) -> Option<String> {
    std::path::Path::new(file_name)
        .extension()
        .map(|ext| ext.to_string_lossy().to_lowercase())
}

/// A content sample is delimited-ish when its first line carries a known
/// delimiter.
fn looks_delimited(sample: &str) -> bool {
    sample
        .lines()
        .next()
        .is_some_and(|line| line.contains(',') || line.contains(';') || line.contains('\t'))
}

/// The specialized threat-list adapter requires its full header signature;
/// anything else delimited goes to the generic fallback.
fn sniff_delimited(sample: &str) -> Format {
    let header = sample.lines().next().unwrap_or("");
    if THREAT_LIST_SIGNATURE.iter().all(|keyword| header.contains(keyword)) {
        Format::ThreatList
    } else {
        Format::GenericDelimited
    }
}

/// Signature-key checks unique to each known methodology's export shape,
/// evaluated top to bottom; first match wins.
fn sniff_document(sample: &str) -> Format {
    let Ok(doc) = serde_json::from_str::<Value>(sample) else {
        return Format::CustomDocument;
    };
    let Some(obj) = doc.as_object() else {
        return Format::CustomDocument;
    };

    if obj.contains_key("elements") && obj.contains_key("threats") {
        return Format::ToolExport;
    }
    if obj.contains_key("threatAnalysis") && obj.contains_key("technicalScope") {
        return Format::RiskDocument;
    }
    Format::CustomDocument
}

#[cfg(test)]
mod tests {
    use super::*;

    // ==================== Extension Rule Tests ====================

    #[test]
    fn test_tm7_extension_wins_regardless_of_content() {
        assert_eq!(detect_format(Some("model.tm7"), None), Some(Format::ToolExport));
        assert_eq!(
            detect_format(Some("model.tm7"), Some("Threat,Category,Asset,Mitigation\n")),
            Some(Format::ToolExport)
        );
    }

    #[test]
    fn test_csv_without_content_is_generic() {
        assert_eq!(detect_format(Some("export.csv"), None), Some(Format::GenericDelimited));
    }

    #[test]
    fn test_json_without_content_is_custom_document() {
        assert_eq!(detect_format(Some("export.json"), None), Some(Format::CustomDocument));
    }

    // ==================== Delimited Sniffing Tests ====================

    #[test]
    fn test_threat_list_header_signature() {
        let content = "Threat,Category,Asset,Mitigation,Notes\nSQLi,T,API,Validate,\n";
        assert_eq!(detect_format(Some("export.csv"), Some(content)), Some(Format::ThreatList));
        assert_eq!(detect_format(None, Some(content)), Some(Format::ThreatList));
    }

    #[test]
    fn test_incomplete_signature_falls_back_to_generic() {
        let content = "Threat,Category,Asset\nSQLi,T,API\n";
        assert_eq!(
            detect_format(Some("export.csv"), Some(content)),
            Some(Format::GenericDelimited)
        );
    }

    #[test]
    fn test_signature_is_case_sensitive() {
        let content = "threat,category,asset,mitigation\nSQLi,T,API,Validate\n";
        assert_eq!(
            detect_format(Some("export.csv"), Some(content)),
            Some(Format::GenericDelimited)
        );
    }

    // ==================== Document Sniffing Tests ====================

    #[test]
    fn test_tool_export_signature_keys() {
        let content = r#"{"elements": [], "flows": [], "threats": []}"#;
        assert_eq!(detect_format(None, Some(content)), Some(Format::ToolExport));
    }

    #[test]
    fn test_risk_document_signature_keys() {
        let content = r#"{"technicalScope": {}, "threatAnalysis": {}}"#;
        assert_eq!(detect_format(None, Some(content)), Some(Format::RiskDocument));
    }

    #[test]
    fn test_unknown_document_shape_is_custom() {
        let content = r#"{"nodes": [], "edges": []}"#;
        assert_eq!(detect_format(None, Some(content)), Some(Format::CustomDocument));
    }

    #[test]
    fn test_uninformative_input_returns_none() {
        assert_eq!(detect_format(None, None), None);
        assert_eq!(detect_format(Some("notes.txt"), None), None);
        assert_eq!(detect_format(None, Some("free text with no structure")), None);
    }

    // ==================== Format Id Tests ====================

    #[test]
    fn test_format_id_roundtrip() {
        for format in [
            Format::ToolExport,
            Format::ThreatList,
            Format::RiskDocument,
            Format::GenericDelimited,
            Format::CustomDocument,
        ] {
            assert_eq!(Format::parse_id(format.id()), Some(format));
        }
        assert_eq!(Format::parse_id("nope"), None);
    }

    // ==================== RawData Shape Tests ====================

    #[test]
    fn test_raw_data_wrong_shape_is_typed_error() {
        let doc = RawData::Document(serde_json::json!({}));
        let err = doc.as_text().unwrap_err();
        assert!(matches!(err, ConvergeError::WrongInputShape { .. }));

        let text = RawData::Text("a,b\n".to_string());
        let err = text.as_document().unwrap_err();
        assert!(matches!(err, ConvergeError::WrongInputShape { .. }));
    }
}
