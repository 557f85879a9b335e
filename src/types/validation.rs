//! Validation results returned by every adapter's `validate` step.

use serde::{Deserialize, Serialize};

/// Outcome of structural validation of a raw input.
///
/// Errors are blocking: an import with `is_valid == false` must not proceed
/// to transform. Warnings are non-blocking observations (recoverable
/// sparsity, unusual vocabulary) reported alongside a still-valid result.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ValidationResult {
    pub is_valid: bool,
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub errors: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub warnings: Vec<String>,
}

impl ValidationResult {
    /// A passing result with no observations.
    #[must_use]
    pub fn valid() -> Self {
        Self { is_valid: true, errors: Vec::new(), warnings: Vec::new() }
    }

    /// A failing result carrying one or more blocking errors.
    #[must_use]
    pub fn invalid(errors: Vec<String>) -> Self {
        Self { is_valid: false, errors, warnings: Vec::new() }
    }

    pub fn add_error<S: Into<String>>(&mut self, error: S) {
        self.errors.push(error.into());
        self.is_valid = false;
    }

    pub fn add_warning<S: Into<String>>(&mut self, warning: S) {
        self.warnings.push(warning.into());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_result() {
        let result = ValidationResult::valid();
        assert!(result.is_valid);
        assert!(result.errors.is_empty());
        assert!(result.warnings.is_empty());
    }

    #[test]
    fn test_add_error_invalidates() {
        let mut result = ValidationResult::valid();
        result.add_error("missing section: threatAnalysis");
        assert!(!result.is_valid);
        assert_eq!(result.errors.len(), 1);
    }

    #[test]
    fn test_warnings_do_not_invalidate() {
        let mut result = ValidationResult::valid();
        result.add_warning("no threats found");
        assert!(result.is_valid);
        assert_eq!(result.warnings.len(), 1);
    }
}
