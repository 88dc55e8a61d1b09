//! Static entity schema descriptors
//!
//! Every entity declares its queryable surface up front: which fields exist,
//! how each one filters, and which relations can be joined. The query layer
//! consults these descriptors instead of inspecting values at request time,
//! so a bad field name fails with a schema error rather than leaking into
//! generated SQL.

use crate::error::SchemaError;
use crate::filter::FilterOperator;
use crate::EntityId;
use serde::de::DeserializeOwned;
use serde::Serialize;
use uuid::Uuid;

/// The storage type of a field, used to gate which values may bind to it
/// during broadcast matching.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    Uuid,
    Text,
    Integer,
    Float,
    Boolean,
    Timestamp,
    /// A jsonb object column.
    Json,
    /// A jsonb array column, matched with containment.
    JsonCollection,
}

impl FieldKind {
    /// Whether a raw query value can bind to this field without a cast
    /// error. Text accepts anything stringly; typed columns require the
    /// value to parse.
    pub fn binds(&self, raw: &str) -> bool {
        match self {
            FieldKind::Text | FieldKind::Timestamp => true,
            FieldKind::Uuid => Uuid::parse_str(raw).is_ok(),
            FieldKind::Integer => raw.parse::<i64>().is_ok(),
            FieldKind::Float => raw.parse::<f64>().is_ok(),
            FieldKind::Boolean => matches!(raw, "true" | "false"),
            FieldKind::Json | FieldKind::JsonCollection => true,
        }
    }

    pub fn is_json_collection(&self) -> bool {
        matches!(self, FieldKind::JsonCollection)
    }
}

/// How a field participates in broadcast filtering. Fields without a
/// `FieldFilter` are stored and returned but never matched by `find`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldFilter {
    pub operator: FilterOperator,
    /// For virtual fields that live on a joined relation: the relation
    /// alias and the column on that relation's table.
    pub relation: Option<(&'static str, &'static str)>,
}

/// One declared field of an entity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldDescriptor {
    pub name: &'static str,
    pub kind: FieldKind,
    pub filter: Option<FieldFilter>,
}

impl FieldDescriptor {
    pub fn is_filtered(&self) -> bool {
        self.filter.is_some()
    }
}

/// A joinable relation: `LEFT JOIN table AS "Alias" ON "Alias".id =
/// base.local_key`. The alias is the Pascal-case relation name clients use
/// in dotted search fields.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RelationDescriptor {
    pub alias: &'static str,
    pub table: &'static str,
    pub local_key: &'static str,
}

/// The full queryable surface of one entity, built once per process.
#[derive(Debug, Clone)]
pub struct EntityDescriptor {
    pub entity: &'static str,
    pub table: &'static str,
    pub fields: Vec<FieldDescriptor>,
    pub relations: Vec<RelationDescriptor>,
}

impl EntityDescriptor {
    pub fn builder(entity: &'static str, table: &'static str) -> EntityDescriptorBuilder {
        // every table carries the bookkeeping columns, so sorting and
        // searching on them never needs a per-entity declaration
        let bookkeeping = ["created_at", "updated_at", "deleted_at"].map(|name| FieldDescriptor {
            name,
            kind: FieldKind::Timestamp,
            filter: None,
        });
        EntityDescriptorBuilder {
            descriptor: EntityDescriptor {
                entity,
                table,
                fields: bookkeeping.to_vec(),
                relations: Vec::new(),
            },
        }
    }

    /// Look up a declared field by name.
    pub fn field(&self, name: &str) -> Result<&FieldDescriptor, SchemaError> {
        self.fields
            .iter()
            .find(|f| f.name == name)
            .ok_or_else(|| SchemaError::FieldNotFound {
                entity: self.entity,
                field: name.to_string(),
            })
    }

    /// Look up a declared relation by alias.
    pub fn relation(&self, alias: &str) -> Result<&RelationDescriptor, SchemaError> {
        self.relations
            .iter()
            .find(|r| r.alias == alias)
            .ok_or_else(|| SchemaError::RelationNotFound {
                entity: self.entity,
                relation: alias.to_string(),
            })
    }

    /// Fields that participate in broadcast matching.
    pub fn filtered_fields(&self) -> impl Iterator<Item = &FieldDescriptor> {
        self.fields.iter().filter(|f| f.is_filtered())
    }

    /// The changelog table paired with this entity.
    pub fn log_table(&self) -> String {
        format!("{}_logs", self.entity)
    }
}

/// Fluent builder for descriptors, used from `once_cell::sync::Lazy`
/// statics so construction happens exactly once.
pub struct EntityDescriptorBuilder {
    descriptor: EntityDescriptor,
}

impl EntityDescriptorBuilder {
    /// A stored field that `find` never matches.
    pub fn field(mut self, name: &'static str, kind: FieldKind) -> Self {
        self.descriptor.fields.push(FieldDescriptor {
            name,
            kind,
            filter: None,
        });
        self
    }

    /// A stored field matched by `find` with the given operator.
    pub fn filtered(mut self, name: &'static str, kind: FieldKind, operator: FilterOperator) -> Self {
        self.descriptor.fields.push(FieldDescriptor {
            name,
            kind,
            filter: Some(FieldFilter {
                operator,
                relation: None,
            }),
        });
        self
    }

    /// A virtual field that resolves to a column on a joined relation.
    pub fn foreign_filtered(
        mut self,
        name: &'static str,
        kind: FieldKind,
        operator: FilterOperator,
        relation: &'static str,
        column: &'static str,
    ) -> Self {
        self.descriptor.fields.push(FieldDescriptor {
            name,
            kind,
            filter: Some(FieldFilter {
                operator,
                relation: Some((relation, column)),
            }),
        });
        self
    }

    pub fn relation(
        mut self,
        alias: &'static str,
        table: &'static str,
        local_key: &'static str,
    ) -> Self {
        self.descriptor.relations.push(RelationDescriptor {
            alias,
            table,
            local_key,
        });
        self
    }

    pub fn build(self) -> EntityDescriptor {
        self.descriptor
    }
}

/// Anything that round-trips through a storage row.
pub trait Record: Serialize + DeserializeOwned + Send + Sync + 'static {}

impl<T> Record for T where T: Serialize + DeserializeOwned + Send + Sync + 'static {}

/// A stored entity with a static descriptor.
pub trait Entity: Record {
    fn descriptor() -> &'static EntityDescriptor;
}

/// Rows that expose their primary key, required for update-by-id flows.
pub trait HasId {
    fn id(&self) -> EntityId;
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> EntityDescriptor {
        EntityDescriptor::builder("asset", "assets")
            .field("id", FieldKind::Uuid)
            .filtered("zone", FieldKind::Text, FilterOperator::Eq)
            .filtered("price", FieldKind::Integer, FilterOperator::Eq)
            .foreign_filtered(
                "project_name",
                FieldKind::Text,
                FilterOperator::Like,
                "Project",
                "name",
            )
            .relation("Project", "projects", "project_id")
            .build()
    }

    #[test]
    fn test_field_lookup() {
        let descriptor = sample();
        assert!(descriptor.field("zone").is_ok());
        let err = descriptor.field("nope").unwrap_err();
        assert!(matches!(err, SchemaError::FieldNotFound { .. }));
    }

    #[test]
    fn test_relation_lookup() {
        let descriptor = sample();
        assert_eq!(descriptor.relation("Project").unwrap().table, "projects");
        assert!(descriptor.relation("Owner").is_err());
    }

    #[test]
    fn test_filtered_fields_exclude_plain() {
        let descriptor = sample();
        let filtered: Vec<&str> = descriptor.filtered_fields().map(|f| f.name).collect();
        assert_eq!(filtered, vec!["zone", "price", "project_name"]);
    }

    #[test]
    fn test_bookkeeping_columns_always_declared() {
        let descriptor = sample();
        for name in ["created_at", "updated_at", "deleted_at"] {
            assert_eq!(descriptor.field(name).unwrap().kind, FieldKind::Timestamp);
        }
    }

    #[test]
    fn test_log_table_name() {
        assert_eq!(sample().log_table(), "asset_logs");
    }

    #[test]
    fn test_kind_binding_gates() {
        assert!(FieldKind::Uuid.binds("0192d3e0-4a58-7000-8000-000000000000"));
        assert!(!FieldKind::Uuid.binds("not-a-uuid"));
        assert!(FieldKind::Integer.binds("42"));
        assert!(!FieldKind::Integer.binds("forty-two"));
        assert!(FieldKind::Float.binds("1.5"));
        assert!(FieldKind::Boolean.binds("true"));
        assert!(!FieldKind::Boolean.binds("yes"));
        assert!(FieldKind::Text.binds("anything"));
    }
}
