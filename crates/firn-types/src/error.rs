//! Assembly-time error model.
//!
//! [`BuildError`] covers everything that can go wrong while a task builder
//! turns its inputs into SQL text and step descriptions. Execution-time
//! failures (connection errors, SQL errors, constraint violations) are not
//! represented here; they pass through from the warehouse client unmodified.

use serde::{Deserialize, Serialize};

/// Error raised while assembling a step description.
///
/// Construct via [`BuildError::validation`] or [`BuildError::precondition`].
/// A `Validation` error means an input failed sanitization and no SQL text
/// was produced for it; a `Precondition` error means a required field was
/// missing or a structural rule (non-empty, unique column names) was broken.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, thiserror::Error)]
#[serde(rename_all = "snake_case", tag = "kind")]
pub enum BuildError {
    /// An input value failed sanitization.
    #[error("invalid {what}: {reason}")]
    Validation { what: String, reason: String },

    /// A required field is missing or a structural rule was violated.
    #[error("precondition failed: {reason}")]
    Precondition { reason: String },
}

impl BuildError {
    /// Sanitization failure for the named input.
    #[must_use]
    pub fn validation(what: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Validation {
            what: what.into(),
            reason: reason.into(),
        }
    }

    /// Missing required field or broken structural rule.
    #[must_use]
    pub fn precondition(reason: impl Into<String>) -> Self {
        Self::Precondition {
            reason: reason.into(),
        }
    }

    #[must_use]
    pub fn is_validation(&self) -> bool {
        matches!(self, Self::Validation { .. })
    }

    #[must_use]
    pub fn is_precondition(&self) -> bool {
        matches!(self, Self::Precondition { .. })
    }
}

/// Convenience alias used throughout the builder crates.
pub type Result<T> = std::result::Result<T, BuildError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validation_display_names_the_input() {
        let err = BuildError::validation("column name", "contains '-'");
        assert_eq!(err.to_string(), "invalid column name: contains '-'");
        assert!(err.is_validation());
        assert!(!err.is_precondition());
    }

    #[test]
    fn precondition_display() {
        let err = BuildError::precondition("output_columns must not be empty");
        assert_eq!(
            err.to_string(),
            "precondition failed: output_columns must not be empty"
        );
        assert!(err.is_precondition());
    }

    #[test]
    fn serde_roundtrip() {
        let err = BuildError::validation("column type", "unbalanced parentheses");
        let json = serde_json::to_string(&err).unwrap();
        let back: BuildError = serde_json::from_str(&json).unwrap();
        assert_eq!(err, back);
    }
}
