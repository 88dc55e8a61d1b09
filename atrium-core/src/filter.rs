//! Operator catalog for filter, search, and find queries
//!
//! Single source of truth for the comparison operators accepted by the
//! declarative filter tags and both runtime mini-languages. The static
//! filter walk and the dynamic search path must both resolve operators
//! through this catalog so their semantics never diverge.

use crate::error::QueryError;
use serde::{Deserialize, Serialize};

/// The complete set of wire names accepted by [`FilterOperator::parse`].
/// Attached to `InvalidOperator` errors for user-facing diagnostics.
pub const VALID_OPERATORS: &[&str] = &[
    "eq",
    "neq",
    "gt",
    "gte",
    "lt",
    "lte",
    "like",
    "in",
    "nnull",
    "is_deleted",
];

/// Filter operator for field comparisons.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FilterOperator {
    /// Equal to
    Eq,
    /// Not equal to
    Neq,
    /// Greater than
    Gt,
    /// Greater than or equal
    Gte,
    /// Less than
    Lt,
    /// Less than or equal
    Lte,
    /// Substring match with `%` wildcards
    Like,
    /// JSON containment (`@>`) against a jsonb column
    In,
    /// Column is present (`IS NOT NULL`), value ignored
    #[serde(rename = "nnull")]
    NotNull,
    /// Soft-delete marker is set; forces an unscoped query
    IsDeleted,
}

impl FilterOperator {
    /// Resolve a wire name into an operator. Unknown names return
    /// `InvalidOperator` carrying the full valid set.
    pub fn parse(name: &str) -> Result<Self, QueryError> {
        match name {
            "eq" => Ok(FilterOperator::Eq),
            "neq" => Ok(FilterOperator::Neq),
            "gt" => Ok(FilterOperator::Gt),
            "gte" => Ok(FilterOperator::Gte),
            "lt" => Ok(FilterOperator::Lt),
            "lte" => Ok(FilterOperator::Lte),
            "like" => Ok(FilterOperator::Like),
            "in" => Ok(FilterOperator::In),
            "nnull" => Ok(FilterOperator::NotNull),
            "is_deleted" => Ok(FilterOperator::IsDeleted),
            other => Err(QueryError::InvalidOperator {
                operator: other.to_string(),
                valid: VALID_OPERATORS,
            }),
        }
    }

    /// The wire name of this operator.
    pub fn as_str(&self) -> &'static str {
        match self {
            FilterOperator::Eq => "eq",
            FilterOperator::Neq => "neq",
            FilterOperator::Gt => "gt",
            FilterOperator::Gte => "gte",
            FilterOperator::Lt => "lt",
            FilterOperator::Lte => "lte",
            FilterOperator::Like => "like",
            FilterOperator::In => "in",
            FilterOperator::NotNull => "nnull",
            FilterOperator::IsDeleted => "is_deleted",
        }
    }

    /// SQL fragment this operator renders as.
    pub fn sql_fragment(&self) -> &'static str {
        match self {
            FilterOperator::Eq => "=",
            FilterOperator::Neq => "<>",
            FilterOperator::Gt => ">",
            FilterOperator::Gte => ">=",
            FilterOperator::Lt => "<",
            FilterOperator::Lte => "<=",
            FilterOperator::Like => "like",
            FilterOperator::In => "@>",
            FilterOperator::NotNull => "IS NOT NULL",
            FilterOperator::IsDeleted => "IS NOT NULL",
        }
    }

    /// Operators that ignore their literal value.
    pub fn is_unary(&self) -> bool {
        matches!(self, FilterOperator::NotNull | FilterOperator::IsDeleted)
    }

    /// Operators that require an unscoped (soft-delete-inclusive) query.
    pub fn needs_unscoped(&self) -> bool {
        matches!(self, FilterOperator::IsDeleted)
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_every_valid_name_parses() {
        for name in VALID_OPERATORS {
            let op = FilterOperator::parse(name).unwrap();
            assert_eq!(op.as_str(), *name);
        }
    }

    #[test]
    fn test_unknown_operator_returns_full_valid_set() {
        let err = FilterOperator::parse("between").unwrap_err();
        match err {
            QueryError::InvalidOperator { operator, valid } => {
                assert_eq!(operator, "between");
                assert_eq!(valid, VALID_OPERATORS);
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_sql_fragments() {
        assert_eq!(FilterOperator::Eq.sql_fragment(), "=");
        assert_eq!(FilterOperator::Neq.sql_fragment(), "<>");
        assert_eq!(FilterOperator::Gte.sql_fragment(), ">=");
        assert_eq!(FilterOperator::In.sql_fragment(), "@>");
        assert_eq!(FilterOperator::NotNull.sql_fragment(), "IS NOT NULL");
    }

    #[test]
    fn test_unary_and_unscoped_flags() {
        assert!(FilterOperator::NotNull.is_unary());
        assert!(FilterOperator::IsDeleted.is_unary());
        assert!(!FilterOperator::Like.is_unary());
        assert!(FilterOperator::IsDeleted.needs_unscoped());
        assert!(!FilterOperator::NotNull.needs_unscoped());
    }

    #[test]
    fn test_serde_wire_names() {
        let op: FilterOperator = serde_json::from_str("\"nnull\"").unwrap();
        assert_eq!(op, FilterOperator::NotNull);
        let op: FilterOperator = serde_json::from_str("\"is_deleted\"").unwrap();
        assert_eq!(op, FilterOperator::IsDeleted);
    }
}
