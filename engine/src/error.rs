//! Error types for the scoresync engine.

use thiserror::Error;

/// Validation failures for a single change record.
///
/// These are item-level: a malformed change is excluded from its batch
/// without affecting its siblings.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum Error {
    #[error("change must be a JSON object")]
    NotAnObject,

    #[error("record id must not be empty")]
    EmptyRecordId,

    #[error("invalid field '{field}': {reason}")]
    InvalidField { field: &'static str, reason: String },

    #[error("unknown change type: {0}")]
    UnknownChangeType(String),

    #[error("upsert requires a document object")]
    MissingDocument,

    #[error("unknown conflict policy: {0}")]
    UnknownConflictPolicy(String),
}

impl Error {
    pub(crate) fn invalid(field: &'static str, reason: impl Into<String>) -> Self {
        Error::InvalidField {
            field,
            reason: reason.into(),
        }
    }
}

/// Result type for engine operations.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display() {
        assert_eq!(
            Error::EmptyRecordId.to_string(),
            "record id must not be empty"
        );

        let err = Error::invalid("version", "expected a non-negative integer");
        assert_eq!(
            err.to_string(),
            "invalid field 'version': expected a non-negative integer"
        );

        let err = Error::UnknownChangeType("patch".into());
        assert_eq!(err.to_string(), "unknown change type: patch");
    }
}
