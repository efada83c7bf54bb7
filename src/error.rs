//! Error types for the quad store

use crate::rdf::RdfError;
use rusqlite::ffi;
use thiserror::Error;

/// Quad store errors
#[derive(Error, Debug)]
pub enum StoreError {
    /// Storage substrate error
    #[error("SQLite error: {0}")]
    Sqlite(rusqlite::Error),

    /// Literal rejected before interning (language and datatype both set, empty tag)
    #[error("Invalid literal: {0}")]
    InvalidLiteral(String),

    /// Malformed IRI, blank node id or language tag
    #[error("Invalid term: {0}")]
    InvalidTerm(#[from] RdfError),

    /// Caller broke a precondition (subject/object exclusivity, impossible shape)
    #[error("Contract violation: {0}")]
    ContractViolation(String),

    /// A dictionary key that does not exist was referenced
    #[error("Dangling reference: {0}")]
    DanglingReference(String),

    /// Stored data contradicts the schema invariants
    #[error("Store inconsistency: {0}")]
    Inconsistent(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// RDF document parse error
    #[error("Parse error: {0}")]
    Parse(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type StoreResult<T> = Result<T, StoreError>;

impl From<rusqlite::Error> for StoreError {
    fn from(err: rusqlite::Error) -> Self {
        match &err {
            rusqlite::Error::SqliteFailure(code, msg)
                if code.extended_code == ffi::SQLITE_CONSTRAINT_FOREIGNKEY =>
            {
                StoreError::DanglingReference(
                    msg.clone().unwrap_or_else(|| "FOREIGN KEY constraint failed".to_string()),
                )
            }
            rusqlite::Error::SqliteFailure(code, msg)
                if code.extended_code == ffi::SQLITE_CONSTRAINT_CHECK =>
            {
                StoreError::ContractViolation(
                    msg.clone().unwrap_or_else(|| "CHECK constraint failed".to_string()),
                )
            }
            _ => StoreError::Sqlite(err),
        }
    }
}

impl From<rio_turtle::TurtleError> for StoreError {
    fn from(err: rio_turtle::TurtleError) -> Self {
        StoreError::Parse(err.to_string())
    }
}

impl From<serde_yaml::Error> for StoreError {
    fn from(err: serde_yaml::Error) -> Self {
        StoreError::Config(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = StoreError::InvalidLiteral("language and datatype both set".to_string());
        assert_eq!(err.to_string(), "Invalid literal: language and datatype both set");
    }

    #[test]
    fn test_foreign_key_failure_is_dangling_reference() {
        let failure = rusqlite::Error::SqliteFailure(
            ffi::Error {
                code: ffi::ErrorCode::ConstraintViolation,
                extended_code: ffi::SQLITE_CONSTRAINT_FOREIGNKEY,
            },
            None,
        );
        assert!(matches!(StoreError::from(failure), StoreError::DanglingReference(_)));
    }

    #[test]
    fn test_other_failures_stay_sqlite() {
        let err = StoreError::from(rusqlite::Error::QueryReturnedNoRows);
        assert!(matches!(err, StoreError::Sqlite(_)));
    }
}
