//! The `find` broadcast.
//!
//! Each find value is matched against every filtered field the entity
//! declares, using that field's declared operator. Typed columns only
//! participate when the value could bind to them, so searching for a name
//! never trips a cast error on a uuid column. Matches group with OR by
//! default; `operator_find=and` demands every clause hold.

use atrium_core::error::AtriumError;
use atrium_core::filter::FilterOperator;
use atrium_core::query::{ColumnRef, Join, Predicate, SelectQuery};
use atrium_core::schema::EntityDescriptor;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// How broadcast clauses combine.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FindOperator {
    #[default]
    Or,
    And,
}

fn is_json_array(raw: &str) -> bool {
    matches!(serde_json::from_str::<Value>(raw), Ok(Value::Array(_)))
}

/// Broadcast the find values across the entity's filtered fields and AND
/// the combined predicate onto the query.
pub fn apply_find(
    query: &mut SelectQuery,
    descriptor: &EntityDescriptor,
    finds: &[String],
    operator_find: FindOperator,
) -> Result<(), AtriumError> {
    let mut clauses = Vec::new();
    for field in descriptor.filtered_fields() {
        let filter = match &field.filter {
            Some(filter) => filter,
            None => continue,
        };
        for find in finds {
            if find.is_empty() || !field.kind.binds(find) {
                continue;
            }
            let column = match filter.relation {
                Some((alias, foreign_column)) => {
                    let relation = descriptor.relation(alias)?;
                    query.join(Join {
                        alias: relation.alias.to_string(),
                        table: relation.table.to_string(),
                        local_key: relation.local_key.to_string(),
                    });
                    ColumnRef::foreign(relation.alias, foreign_column)
                }
                None => ColumnRef::own(descriptor.table, field.name),
            };
            let value = match filter.operator {
                // containment only makes sense against an array literal
                FilterOperator::In => {
                    if !is_json_array(find) {
                        continue;
                    }
                    Value::String(find.clone())
                }
                FilterOperator::Like => Value::String(format!("%{find}%")),
                _ => Value::String(find.clone()),
            };
            clauses.push(Predicate::cond(column, filter.operator, value));
        }
    }
    if clauses.is_empty() {
        return Ok(());
    }
    let combined = match operator_find {
        FindOperator::Or => Predicate::Or(clauses),
        FindOperator::And => Predicate::And(clauses),
    };
    query.and_where(combined);
    Ok(())
}

// =============================================================================
// TESTS
// =============================================================================
