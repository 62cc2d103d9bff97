// ⚠️ Engine Errors - Closed set of failure kinds
// Everything the session engine can fail with maps to one of three kinds:
// bad input, missing reference data, or a collaborator (storage) failure.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum EngineError {
    /// Malformed or out-of-contract input (invalid birth date, invalid
    /// response literal, transition called in the wrong phase).
    #[error("validation error: {0}")]
    Validation(String),

    /// Requested reference data does not exist (e.g. a named category
    /// with no questions).
    #[error("not found: {0}")]
    NotFound(String),

    /// Persistence or catalog failure. Not recoverable by the engine;
    /// surfaced to the caller unchanged, no retries.
    #[error("storage error: {0}")]
    Storage(String),
}

impl EngineError {
    pub fn validation(msg: impl Into<String>) -> Self {
        EngineError::Validation(msg.into())
    }

    pub fn not_found(msg: impl Into<String>) -> Self {
        EngineError::NotFound(msg.into())
    }

    pub fn storage(msg: impl Into<String>) -> Self {
        EngineError::Storage(msg.into())
    }

    pub fn is_validation(&self) -> bool {
        matches!(self, EngineError::Validation(_))
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, EngineError::NotFound(_))
    }

    pub fn is_storage(&self) -> bool {
        matches!(self, EngineError::Storage(_))
    }
}

impl From<rusqlite::Error> for EngineError {
    fn from(err: rusqlite::Error) -> Self {
        EngineError::Storage(err.to_string())
    }
}

/// Result alias used across the engine
pub type EngineResult<T> = Result<T, EngineError>;

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_kinds() {
        let v = EngineError::validation("bad date");
        assert!(v.is_validation());
        assert!(!v.is_storage());
        assert_eq!(v.to_string(), "validation error: bad date");

        let n = EngineError::not_found("category 'X'");
        assert!(n.is_not_found());
        assert_eq!(n.to_string(), "not found: category 'X'");

        let s = EngineError::storage("disk full");
        assert!(s.is_storage());
        assert_eq!(s.to_string(), "storage error: disk full");
    }

    #[test]
    fn test_sqlite_error_maps_to_storage() {
        let err: EngineError = rusqlite::Error::InvalidQuery.into();
        assert!(err.is_storage());
    }
}
