//! Error types for Atrium operations
//!
//! Every hard error carries a stable code string (see [`AtriumError::code`])
//! so the HTTP collaborator can map errors to status codes uniformly.

use thiserror::Error;

/// Query construction errors. These short-circuit before any query executes.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum QueryError {
    #[error("invalid operator `{operator}`, valid operators: {valid:?}")]
    InvalidOperator {
        operator: String,
        valid: &'static [&'static str],
    },

    #[error("invalid filter `{spec}`: {reason}")]
    InvalidFilter { spec: String, reason: String },
}

/// Schema resolution errors. Callers branch on "field exists but is a
/// different shape" vs "field absent", so these stay structured.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum SchemaError {
    #[error("field `{field}` not found on entity `{entity}`")]
    FieldNotFound { entity: &'static str, field: String },

    #[error("relation `{relation}` not found on entity `{entity}`")]
    RelationNotFound {
        entity: &'static str,
        relation: String,
    },

    #[error("field `{field}` on entity `{entity}` holds no value")]
    NullField { entity: &'static str, field: String },
}

/// Storage layer errors surfaced by the backend collaborator.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum StorageError {
    #[error("{entity} not found: {key}")]
    NotFound { entity: &'static str, key: String },

    #[error("conflict on {entity}.{column}: {reason}")]
    Conflict {
        entity: String,
        column: String,
        reason: String,
    },

    #[error("backend error: {reason}")]
    Backend { reason: String },

    #[error("serialization failed for {entity}: {reason}")]
    Serialization { entity: &'static str, reason: String },

    #[error("storage lock poisoned")]
    LockPoisoned,
}

/// Authorization errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum AccessError {
    #[error("forbidden: no authenticated owner in request context")]
    Forbidden,
}

/// Master error type for all Atrium errors.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum AtriumError {
    #[error("query error: {0}")]
    Query(#[from] QueryError),

    #[error("schema error: {0}")]
    Schema(#[from] SchemaError),

    #[error("storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("access error: {0}")]
    Access(#[from] AccessError),
}

impl AtriumError {
    /// Stable machine-readable code for the HTTP layer.
    pub fn code(&self) -> &'static str {
        match self {
            AtriumError::Query(QueryError::InvalidOperator { .. }) => "invalid_operator",
            AtriumError::Query(QueryError::InvalidFilter { .. }) => "invalid_filter",
            AtriumError::Schema(SchemaError::FieldNotFound { .. }) => "field_not_found",
            AtriumError::Schema(SchemaError::RelationNotFound { .. }) => "relation_not_found",
            AtriumError::Schema(SchemaError::NullField { .. }) => "null_field",
            AtriumError::Storage(StorageError::NotFound { .. }) => "not_found",
            AtriumError::Storage(StorageError::Conflict { .. }) => "conflict",
            AtriumError::Storage(StorageError::Backend { .. }) => "backend_error",
            AtriumError::Storage(StorageError::Serialization { .. }) => "serialization_error",
            AtriumError::Storage(StorageError::LockPoisoned) => "backend_error",
            AtriumError::Access(AccessError::Forbidden) => "forbidden",
        }
    }
}

/// Result type alias for Atrium operations.
pub type AtriumResult<T> = Result<T, AtriumError>;

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filter::VALID_OPERATORS;

    #[test]
    fn test_invalid_operator_carries_valid_set() {
        let err = QueryError::InvalidOperator {
            operator: "contains".to_string(),
            valid: VALID_OPERATORS,
        };
        let msg = format!("{}", err);
        assert!(msg.contains("contains"));
        assert!(msg.contains("eq"));
        assert!(msg.contains("is_deleted"));
    }

    #[test]
    fn test_not_found_display() {
        let err = StorageError::NotFound {
            entity: "asset",
            key: "00000000-0000-0000-0000-000000000000".to_string(),
        };
        let msg = format!("{}", err);
        assert!(msg.contains("asset not found"));
    }

    #[test]
    fn test_error_codes_are_stable() {
        let err: AtriumError = AccessError::Forbidden.into();
        assert_eq!(err.code(), "forbidden");

        let err: AtriumError = QueryError::InvalidFilter {
            spec: "Project".to_string(),
            reason: "odd segment count".to_string(),
        }
        .into();
        assert_eq!(err.code(), "invalid_filter");

        let err: AtriumError = SchemaError::FieldNotFound {
            entity: "staff",
            field: "nickname".to_string(),
        }
        .into();
        assert_eq!(err.code(), "field_not_found");
    }

    #[test]
    fn test_master_error_from_variants() {
        let query = AtriumError::from(QueryError::InvalidOperator {
            operator: "x".to_string(),
            valid: VALID_OPERATORS,
        });
        assert!(matches!(query, AtriumError::Query(_)));

        let storage = AtriumError::from(StorageError::LockPoisoned);
        assert!(matches!(storage, AtriumError::Storage(_)));

        let access = AtriumError::from(AccessError::Forbidden);
        assert!(matches!(access, AtriumError::Access(_)));
    }
}
