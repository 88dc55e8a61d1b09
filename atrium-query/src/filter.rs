//! Declarative struct filters.
//!
//! A filter struct declares one binding per optional field: the column
//! name, a spec string, and the value the caller supplied. Specs come in
//! two shapes:
//!
//! - `"eq"`, `"like,allowzero"`: apply the operator to the entity's own
//!   column. Zero values are skipped unless `allowzero` is present, so an
//!   unset struct field never becomes an accidental `= ''` clause.
//! - `"Project.eq"`: join the named relation and compare its `id` column.
//!   Segments must pair up relation-then-operator; an odd count is a
//!   malformed spec and fails the whole query.

use atrium_core::error::{AtriumError, QueryError};
use atrium_core::filter::FilterOperator;
use atrium_core::query::{ColumnRef, Join, Predicate, SelectQuery};
use atrium_core::schema::EntityDescriptor;
use serde_json::Value;

/// One column binding from a filter struct.
#[derive(Debug, Clone)]
pub struct FilterBinding {
    pub field: &'static str,
    pub spec: &'static str,
    pub value: Option<Value>,
}

impl FilterBinding {
    pub fn new(field: &'static str, spec: &'static str, value: Option<Value>) -> Self {
        Self { field, spec, value }
    }
}

/// Implemented by typed filter structs.
pub trait Filterable {
    fn bindings(&self) -> Vec<FilterBinding>;
}

#[derive(Debug, PartialEq)]
enum ParsedSpec {
    Plain {
        operator: FilterOperator,
        allow_zero: bool,
    },
    /// (relation alias, operator) pairs.
    Relation(Vec<(String, FilterOperator)>),
}

fn parse_spec(spec: &str) -> Result<ParsedSpec, QueryError> {
    if spec.contains('.') {
        let segments: Vec<&str> = spec.split('.').collect();
        if segments.len() % 2 != 0 {
            return Err(QueryError::InvalidFilter {
                spec: spec.to_string(),
                reason: "relation spec needs relation/operator pairs".to_string(),
            });
        }
        let mut pairs = Vec::with_capacity(segments.len() / 2);
        for chunk in segments.chunks(2) {
            pairs.push((chunk[0].to_string(), FilterOperator::parse(chunk[1])?));
        }
        return Ok(ParsedSpec::Relation(pairs));
    }
    let (name, allow_zero) = match spec.strip_suffix(",allowzero") {
        Some(name) => (name, true),
        None => (spec, false),
    };
    Ok(ParsedSpec::Plain {
        operator: FilterOperator::parse(name)?,
        allow_zero,
    })
}

/// GORM-style zero check: absent, null, empty, zero, and the nil uuid all
/// mean "not provided".
fn is_zero(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::Bool(b) => !b,
        Value::Number(n) => n.as_f64() == Some(0.0),
        Value::String(s) => s.is_empty() || s == "00000000-0000-0000-0000-000000000000",
        Value::Array(items) => items.is_empty(),
        Value::Object(map) => map.is_empty(),
    }
}

/// AND every bound filter onto the query.
pub fn apply_filters(
    query: &mut SelectQuery,
    descriptor: &EntityDescriptor,
    bindings: &[FilterBinding],
) -> Result<(), AtriumError> {
    for binding in bindings {
        let value = match &binding.value {
            Some(value) => value,
            None => continue,
        };
        match parse_spec(binding.spec)? {
            ParsedSpec::Plain {
                operator,
                allow_zero,
            } => {
                if !allow_zero && is_zero(value) {
                    continue;
                }
                query.and_where(Predicate::cond(
                    ColumnRef::own(descriptor.table, binding.field),
                    operator,
                    value.clone(),
                ));
            }
            ParsedSpec::Relation(pairs) => {
                if is_zero(value) {
                    continue;
                }
                for (alias, operator) in pairs {
                    let relation = descriptor.relation(&alias).map_err(AtriumError::from)?;
                    query.join(Join {
                        alias: relation.alias.to_string(),
                        table: relation.table.to_string(),
                        local_key: relation.local_key.to_string(),
                    });
                    query.and_where(Predicate::cond(
                        ColumnRef::foreign(relation.alias, "id"),
                        operator,
                        value.clone(),
                    ));
                }
            }
        }
    }
    Ok(())
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use atrium_core::entities::Asset;
    use atrium_core::schema::Entity;
    use serde_json::json;

    #[test]
    fn test_parse_plain_spec() {
        assert_eq!(
            parse_spec("eq").unwrap(),
            ParsedSpec::Plain {
                operator: FilterOperator::Eq,
                allow_zero: false
            }
        );
        assert_eq!(
            parse_spec("like,allowzero").unwrap(),
            ParsedSpec::Plain {
                operator: FilterOperator::Like,
                allow_zero: true
            }
        );
    }

    #[test]
    fn test_parse_relation_spec() {
        let spec = parse_spec("Project.eq").unwrap();
        assert_eq!(
            spec,
            ParsedSpec::Relation(vec![("Project".to_string(), FilterOperator::Eq)])
        );
    }

    #[test]
    fn test_odd_relation_segments_rejected() {
        let err = parse_spec("Project.name.like").unwrap_err();
        assert!(matches!(err, QueryError::InvalidFilter { .. }));
    }

    #[test]
    fn test_unknown_operator_rejected() {
        let err = parse_spec("contains").unwrap_err();
        assert!(matches!(err, QueryError::InvalidOperator { .. }));
    }

    #[test]
    fn test_zero_values_skipped() {
        let mut query = SelectQuery::table("assets");
        apply_filters(
            &mut query,
            Asset::descriptor(),
            &[
                FilterBinding::new("zone", "eq", Some(json!(""))),
                FilterBinding::new("price", "gte", Some(json!(0))),
                FilterBinding::new("no", "eq", None),
            ],
        )
        .unwrap();
        assert!(query.predicate.is_none());
    }

    #[test]
    fn test_allowzero_keeps_zero_value() {
        let mut query = SelectQuery::table("assets");
        apply_filters(
            &mut query,
            Asset::descriptor(),
            &[FilterBinding::new("price", "gte,allowzero", Some(json!(0)))],
        )
        .unwrap();
        assert!(query.predicate.is_some());
    }

    #[test]
    fn test_relation_binding_joins_and_compares_id() {
        let mut query = SelectQuery::table("assets");
        let project_id = "0192d3e0-4a58-7000-8000-000000000001";
        apply_filters(
            &mut query,
            Asset::descriptor(),
            &[FilterBinding::new("project_id", "Project.eq", Some(json!(project_id)))],
        )
        .unwrap();
        assert_eq!(query.joins.len(), 1);
        let (sql, params) = query.render_sql();
        assert!(sql.contains("\"Project\".id = $1"));
        assert_eq!(params, vec![json!(project_id)]);
    }

    #[test]
    fn test_unknown_relation_rejected() {
        let mut query = SelectQuery::table("assets");
        let err = apply_filters(
            &mut query,
            Asset::descriptor(),
            &[FilterBinding::new("owner_id", "Owner.eq", Some(json!("x")))],
        )
        .unwrap_err();
        assert_eq!(err.code(), "relation_not_found");
    }
}
