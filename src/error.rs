use thiserror::Error;

/// Typed errors for the import/reconciliation engine.
///
/// The engine is designed to degrade to empty or low-confidence results
/// instead of failing, so most variants only surface at the batch layer as
/// per-item failures. The one hard stop is `WrongInputShape`: handing a
/// structured document to a delimited-text adapter (or vice versa) must not
/// silently return nonsense.
#[derive(Debug, Error)]
pub enum ConvergeError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("wrong input shape: expected {expected}, got {actual}")]
    WrongInputShape { expected: String, actual: String },

    #[error("failed to parse structured document: {message}")]
    DocumentParse { message: String },

    #[error("format not detected for input '{item}'")]
    FormatNotDetected { item: String },

    #[error("no adapter registered for format '{format}'")]
    AdapterNotFound { format: String },

    #[error("validation failed: {}", errors.join("; "))]
    Validation { errors: Vec<String> },

    #[error("invalid entity catalog: {message}")]
    Catalog { message: String },
}

pub type Result<T> = std::result::Result<T, ConvergeError>;

impl ConvergeError {
    pub fn wrong_input_shape<S1: Into<String>, S2: Into<String>>(expected: S1, actual: S2) -> Self {
        Self::WrongInputShape { expected: expected.into(), actual: actual.into() }
    }

    pub fn document_parse<S: Into<String>>(message: S) -> Self {
        Self::DocumentParse { message: message.into() }
    }

    pub fn format_not_detected<S: Into<String>>(item: S) -> Self {
        Self::FormatNotDetected { item: item.into() }
    }

    pub fn adapter_not_found<S: Into<String>>(format: S) -> Self {
        Self::AdapterNotFound { format: format.into() }
    }

    pub fn validation(errors: Vec<String>) -> Self {
        Self::Validation { errors }
    }

    pub fn catalog<S: Into<String>>(message: S) -> Self {
        Self::Catalog { message: message.into() }
    }

    /// Returns true if the error is per-item and batch processing can continue.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Self::FormatNotDetected { .. }
                | Self::AdapterNotFound { .. }
                | Self::DocumentParse { .. }
                | Self::Validation { .. }
        )
    }
}
