//! The `search` mini-language.
//!
//! A search string is a chain of `field,op,value` clauses joined by `|`
//! (or with the next clause) or `&` (and with the next clause):
//!
//! ```text
//! email,like,admin.com|email,like,example.com&first_name,eq,Ann
//! ```
//!
//! A dotted field prefix targets a table: the entity's own table renders
//! as a plain qualified column, while any other prefix resolves to a
//! joined relation. `like` values get `%` wildcards added; `nnull` and
//! `is_deleted` ignore their value, and `is_deleted` widens the query to
//! include soft-deleted rows.

use atrium_core::error::AtriumError;
use atrium_core::filter::FilterOperator;
use atrium_core::query::{ColumnRef, Join, Predicate, SelectQuery};
use atrium_core::schema::EntityDescriptor;
use convert_case::{Case, Casing};
use serde_json::Value;

/// How a clause chains with the one after it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Connector {
    And,
    Or,
}

#[derive(Debug, PartialEq, Eq)]
struct Clause {
    text: String,
    next: Connector,
}

/// Split a raw search string on top-level `|` and `&`, keeping which
/// connector followed each clause.
fn walk_connectors(raw: &str) -> Vec<Clause> {
    let mut clauses = Vec::new();
    let mut start = 0;
    for (i, ch) in raw.char_indices() {
        let next = match ch {
            '|' => Connector::Or,
            '&' => Connector::And,
            _ => continue,
        };
        clauses.push(Clause {
            text: raw[start..i].to_string(),
            next,
        });
        start = i + ch.len_utf8();
    }
    if start < raw.len() {
        clauses.push(Clause {
            text: raw[start..].to_string(),
            next: Connector::And,
        });
    }
    clauses
}

/// Resolve a possibly-dotted field name to a column reference, joining
/// the relation when the prefix is not the entity's own table. Names
/// land in identifier position of the rendered statement, so anything
/// the schema does not vouch for is rejected.
fn resolve_field(
    query: &mut SelectQuery,
    descriptor: &EntityDescriptor,
    field: &str,
) -> Result<ColumnRef, AtriumError> {
    let (prefix, column) = match field.split_once('.') {
        Some(parts) => parts,
        None => {
            descriptor.field(field)?;
            return Ok(ColumnRef::plain(field));
        }
    };
    if prefix == descriptor.table {
        descriptor.field(column)?;
        return Ok(ColumnRef::own(descriptor.table, column));
    }
    // accept either the relation's table name or its Pascal alias
    let alias = prefix.to_case(Case::Pascal);
    let relation = descriptor
        .relations
        .iter()
        .find(|r| r.table == prefix || r.alias == alias)
        .ok_or_else(|| {
            AtriumError::from(atrium_core::error::SchemaError::RelationNotFound {
                entity: descriptor.entity,
                relation: prefix.to_string(),
            })
        })?;
    // the related entity's descriptor is out of reach here, so the
    // column only has to look like a column
    if !is_identifier(column) {
        return Err(atrium_core::error::SchemaError::FieldNotFound {
            entity: relation.table,
            field: column.to_string(),
        }
        .into());
    }
    query.join(Join {
        alias: relation.alias.to_string(),
        table: relation.table.to_string(),
        local_key: relation.local_key.to_string(),
    });
    Ok(ColumnRef::foreign(relation.alias, column))
}

fn is_identifier(name: &str) -> bool {
    !name.is_empty()
        && name
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_')
}

/// Parse a search string and AND the resulting predicate onto the query.
/// An empty string is a no-op. Clauses that are not `field,op,value` are
/// skipped; an unknown operator fails the whole query.
pub fn apply_search(
    query: &mut SelectQuery,
    descriptor: &EntityDescriptor,
    raw: &str,
) -> Result<(), AtriumError> {
    if raw.is_empty() {
        return Ok(());
    }
    let mut acc: Option<Predicate> = None;
    let mut or_next = false;
    for clause in walk_connectors(raw) {
        let parts: Vec<&str> = clause.text.split(',').collect();
        if parts.len() != 3 {
            tracing::warn!(clause = %clause.text, "skipping malformed search clause");
            continue;
        }
        let (field, op, value) = (parts[0], parts[1], parts[2]);
        let operator = FilterOperator::parse(op).map_err(AtriumError::from)?;
        let column = resolve_field(query, descriptor, field)?;
        let value = if operator.is_unary() {
            Value::Null
        } else if operator == FilterOperator::Like {
            Value::String(format!("%{value}%"))
        } else {
            Value::String(value.to_string())
        };
        let cond = Predicate::cond(column, operator, value);
        acc = Some(match acc {
            None => cond,
            Some(prev) if or_next => prev.or_with(cond),
            Some(prev) => prev.and_with(cond),
        });
        or_next = clause.next == Connector::Or;
    }
    if let Some(predicate) = acc {
        query.and_where(predicate);
    }
    Ok(())
}

// =============================================================================
// TESTS
// =============================================================================
