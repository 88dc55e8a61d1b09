//! In-memory backend.
//!
//! Tables are vectors of JSON rows behind one RwLock. Predicates are
//! evaluated structurally with the same semantics the SQL renderer
//! produces, including jsonb containment and the soft-delete scope, so
//! store tests exercise real query behavior without a database.

use crate::backend::{Backend, SharedBackend};
use async_trait::async_trait;
use atrium_core::error::StorageError;
use atrium_core::filter::FilterOperator;
use atrium_core::query::{
    ColumnRef, Condition, DeleteMode, Predicate, Qualifier, SelectQuery, SortDirection,
};
use convert_case::{Case, Casing};
use serde_json::{Map, Value};
use std::cmp::Ordering;
use std::collections::HashMap;
use std::sync::{Arc, RwLock};

type Tables = HashMap<String, Vec<Value>>;

#[derive(Default)]
pub struct MemoryBackend {
    tables: RwLock<Tables>,
    /// table -> columns that must be unique across all rows, deleted
    /// or not.
    unique: HashMap<String, Vec<String>>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Declare a unique column, mirroring a database unique index.
    pub fn with_unique(mut self, table: &str, column: &str) -> Self {
        self.unique
            .entry(table.to_string())
            .or_default()
            .push(column.to_string());
        self
    }

    pub fn into_shared(self) -> SharedBackend {
        Arc::new(self)
    }

    fn read(&self) -> Result<std::sync::RwLockReadGuard<'_, Tables>, StorageError> {
        self.tables.read().map_err(|_| StorageError::LockPoisoned)
    }

    fn write(&self) -> Result<std::sync::RwLockWriteGuard<'_, Tables>, StorageError> {
        self.tables.write().map_err(|_| StorageError::LockPoisoned)
    }

    /// Clone the base row and embed each joined relation's live row under
    /// the snake-cased alias.
    fn augment(tables: &Tables, query: &SelectQuery, row: &Value) -> Value {
        let mut augmented = row.clone();
        for join in &query.joins {
            let fk = row.get(&join.local_key).cloned().unwrap_or(Value::Null);
            if fk.is_null() {
                continue;
            }
            let related = tables
                .get(&join.table)
                .and_then(|rows| {
                    rows.iter()
                        .find(|r| r.get("id") == Some(&fk) && is_live(r))
                })
                .cloned();
            if let (Some(obj), Some(related)) = (augmented.as_object_mut(), related) {
                obj.insert(join.alias.to_case(Case::Snake), related);
            }
        }
        augmented
    }

    fn matching_rows(tables: &Tables, query: &SelectQuery) -> Vec<Value> {
        let rows = match tables.get(&query.table) {
            Some(rows) => rows,
            None => return Vec::new(),
        };
        rows.iter()
            .filter(|row| query.unscoped || is_live(row))
            .map(|row| Self::augment(tables, query, row))
            .filter(|row| match &query.predicate {
                Some(predicate) => eval_predicate(row, predicate),
                None => true,
            })
            .collect()
    }
}

fn is_live(row: &Value) -> bool {
    matches!(row.get("deleted_at"), None | Some(Value::Null))
}

/// Resolve a column reference against an augmented row. Foreign references
/// go through the embedded relation object.
fn lookup<'a>(row: &'a Value, column: &ColumnRef) -> Option<&'a Value> {
    let base = match &column.qualifier {
        None | Some(Qualifier::Own(_)) => row.get(&column.column),
        Some(Qualifier::Foreign(alias)) => row
            .get(alias.to_case(Case::Snake))
            .and_then(|related| related.get(&column.column)),
    }?;
    match &column.json_key {
        Some(key) => base.get(key),
        None => Some(base),
    }
}

fn as_f64(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.parse().ok(),
        _ => None,
    }
}

fn loose_eq(stored: &Value, wanted: &Value) -> bool {
    if stored == wanted {
        return true;
    }
    if let (Some(a), Some(b)) = (as_f64(stored), as_f64(wanted)) {
        return a == b;
    }
    match (stored, wanted) {
        (Value::String(s), other) | (other, Value::String(s)) => s == &other.to_string(),
        _ => false,
    }
}

/// Case-insensitive `like` with `%` only at the pattern edges, which is
/// the only shape the query builders produce.
fn like_match(stored: &Value, pattern: &Value) -> bool {
    let (stored, pattern) = match (stored.as_str(), pattern.as_str()) {
        (Some(s), Some(p)) => (s.to_lowercase(), p.to_lowercase()),
        _ => return false,
    };
    let starts = pattern.starts_with('%');
    let ends = pattern.ends_with('%');
    let needle = pattern.trim_matches('%');
    match (starts, ends) {
        (true, true) => stored.contains(needle),
        (true, false) => stored.ends_with(needle),
        (false, true) => stored.starts_with(needle),
        (false, false) => stored == needle,
    }
}

/// jsonb containment. Arrays contain every element of `wanted`; objects
/// contain every key/value pair of `wanted`. A string that parses as JSON
/// is unwrapped first, matching how query-string values arrive.
fn contains_match(stored: &Value, wanted: &Value) -> bool {
    let parsed;
    let wanted = match wanted {
        Value::String(raw) => match serde_json::from_str::<Value>(raw) {
            Ok(v) => {
                parsed = v;
                &parsed
            }
            Err(_) => wanted,
        },
        other => other,
    };
    match (stored, wanted) {
        (Value::Array(haystack), Value::Array(needles)) => {
            needles.iter().all(|n| haystack.contains(n))
        }
        (Value::Array(haystack), needle) => haystack.contains(needle),
        (Value::Object(stored), Value::Object(wanted)) => wanted
            .iter()
            .all(|(key, value)| stored.get(key) == Some(value)),
        _ => false,
    }
}

fn eval_condition(row: &Value, cond: &Condition) -> bool {
    let stored = lookup(row, &cond.column);
    match cond.operator {
        FilterOperator::NotNull | FilterOperator::IsDeleted => {
            matches!(stored, Some(v) if !v.is_null())
        }
        FilterOperator::Eq => stored.is_some_and(|v| loose_eq(v, &cond.value)),
        FilterOperator::Neq => !stored.is_some_and(|v| loose_eq(v, &cond.value)),
        FilterOperator::Like => stored.is_some_and(|v| like_match(v, &cond.value)),
        FilterOperator::In => stored.is_some_and(|v| contains_match(v, &cond.value)),
        FilterOperator::Gt | FilterOperator::Gte | FilterOperator::Lt | FilterOperator::Lte => {
            let ordering = match stored {
                Some(v) => compare_values(v, &cond.value),
                None => return false,
            };
            let ordering = match ordering {
                Some(o) => o,
                None => return false,
            };
            match cond.operator {
                FilterOperator::Gt => ordering == Ordering::Greater,
                FilterOperator::Gte => ordering != Ordering::Less,
                FilterOperator::Lt => ordering == Ordering::Less,
                _ => ordering != Ordering::Greater,
            }
        }
    }
}

fn compare_values(a: &Value, b: &Value) -> Option<Ordering> {
    if let (Some(x), Some(y)) = (as_f64(a), as_f64(b)) {
        return x.partial_cmp(&y);
    }
    match (a.as_str(), b.as_str()) {
        (Some(x), Some(y)) => Some(x.cmp(y)),
        _ => None,
    }
}

pub(crate) fn eval_predicate(row: &Value, predicate: &Predicate) -> bool {
    match predicate {
        Predicate::Cond(cond) => eval_condition(row, cond),
        Predicate::And(parts) => parts.iter().all(|p| eval_predicate(row, p)),
        Predicate::Or(parts) => parts.iter().any(|p| eval_predicate(row, p)),
    }
}

fn sort_rows(rows: &mut [Value], query: &SelectQuery) {
    rows.sort_by(|a, b| {
        for key in &query.sort {
            let left = a.get(&key.column);
            let right = b.get(&key.column);
            let ordering = match (left, right) {
                (Some(l), Some(r)) => compare_values(l, r).unwrap_or(Ordering::Equal),
                (Some(_), None) => Ordering::Less,
                (None, Some(_)) => Ordering::Greater,
                (None, None) => Ordering::Equal,
            };
            let ordering = match key.direction {
                SortDirection::Asc => ordering,
                SortDirection::Desc => ordering.reverse(),
            };
            if ordering != Ordering::Equal {
                return ordering;
            }
        }
        Ordering::Equal
    });
}

#[async_trait]
impl Backend for MemoryBackend {
    async fn ensure_table(&self, table: &str) -> Result<(), StorageError> {
        self.write()?.entry(table.to_string()).or_default();
        Ok(())
    }

    async fn select(&self, query: &SelectQuery) -> Result<Vec<Value>, StorageError> {
        let tables = self.read()?;
        let mut rows = Self::matching_rows(&tables, query);
        sort_rows(&mut rows, query);
        let offset = query.offset.unwrap_or(0) as usize;
        let rows = rows.into_iter().skip(offset);
        Ok(match query.limit {
            Some(limit) => rows.take(limit as usize).collect(),
            None => rows.collect(),
        })
    }

    async fn count(&self, query: &SelectQuery) -> Result<u64, StorageError> {
        let tables = self.read()?;
        Ok(Self::matching_rows(&tables, query).len() as u64)
    }

    async fn insert(&self, table: &str, row: Value) -> Result<Value, StorageError> {
        let mut tables = self.write()?;
        if let Some(columns) = self.unique.get(table) {
            let existing = tables.entry(table.to_string()).or_default();
            for column in columns {
                let value = row.get(column).cloned().unwrap_or(Value::Null);
                if value.is_null() {
                    continue;
                }
                // the index spans soft-deleted rows too; freeing a value
                // requires a hard delete
                let taken = existing.iter().any(|r| r.get(column) == Some(&value));
                if taken {
                    return Err(StorageError::Conflict {
                        entity: table.to_string(),
                        column: column.clone(),
                        reason: format!("duplicate value {value}"),
                    });
                }
            }
        }
        tables.entry(table.to_string()).or_default().push(row.clone());
        Ok(row)
    }

    async fn insert_many(&self, table: &str, rows: Vec<Value>) -> Result<(), StorageError> {
        self.write()?.entry(table.to_string()).or_default().extend(rows);
        Ok(())
    }

    async fn update(
        &self,
        table: &str,
        predicate: &Predicate,
        patch: Value,
    ) -> Result<u64, StorageError> {
        let patch = match patch {
            Value::Object(map) => map,
            other => {
                return Err(StorageError::Serialization {
                    entity: "patch",
                    reason: format!("expected object, got {other}"),
                })
            }
        };
        let mut tables = self.write()?;
        let rows = tables.entry(table.to_string()).or_default();
        let mut touched = 0;
        for row in rows.iter_mut() {
            if !is_live(row) || !eval_predicate(row, predicate) {
                continue;
            }
            if let Some(obj) = row.as_object_mut() {
                merge_patch(obj, &patch);
                touched += 1;
            }
        }
        Ok(touched)
    }

    async fn delete(
        &self,
        table: &str,
        predicate: &Predicate,
        mode: DeleteMode,
    ) -> Result<u64, StorageError> {
        let mut tables = self.write()?;
        let rows = tables.entry(table.to_string()).or_default();
        match mode {
            DeleteMode::Soft => {
                let stamp = serde_json::to_value(atrium_core::now()).map_err(|e| {
                    StorageError::Serialization {
                        entity: "deleted_at",
                        reason: e.to_string(),
                    }
                })?;
                let mut touched = 0;
                for row in rows.iter_mut() {
                    if is_live(row) && eval_predicate(row, predicate) {
                        if let Some(obj) = row.as_object_mut() {
                            obj.insert("deleted_at".to_string(), stamp.clone());
                            touched += 1;
                        }
                    }
                }
                Ok(touched)
            }
            DeleteMode::Hard => {
                let before = rows.len();
                rows.retain(|row| !eval_predicate(row, predicate));
                Ok((before - rows.len()) as u64)
            }
        }
    }

    async fn group_count(&self, table: &str, column: &str) -> Result<Value, StorageError> {
        let tables = self.read()?;
        let mut counts: Map<String, Value> = Map::new();
        if let Some(rows) = tables.get(table) {
            for row in rows.iter().filter(|r| is_live(r)) {
                // arrays count per element, like jsonb_array_elements_text
                let keys: Vec<String> = match row.get(column) {
                    None | Some(Value::Null) => continue,
                    Some(Value::Array(items)) => items
                        .iter()
                        .map(|v| match v {
                            Value::String(s) => s.clone(),
                            other => other.to_string(),
                        })
                        .collect(),
                    Some(Value::String(s)) => vec![s.clone()],
                    Some(other) => vec![other.to_string()],
                };
                for key in keys {
                    let slot = counts.entry(key).or_insert(Value::from(0));
                    if let Some(n) = slot.as_u64() {
                        *slot = Value::from(n + 1);
                    }
                }
            }
        }
        Ok(Value::Object(counts))
    }
}

/// Null patch values mean "not provided" and never overwrite stored data.
fn merge_patch(row: &mut Map<String, Value>, patch: &Map<String, Value>) {
    for (key, value) in patch {
        if value.is_null() {
            continue;
        }
        row.insert(key.clone(), value.clone());
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use atrium_core::query::{Join, SortKey};
    use serde_json::json;

    fn cond(column: ColumnRef, operator: FilterOperator, value: Value) -> Predicate {
        Predicate::cond(column, operator, value)
    }

    #[tokio::test]
    async fn test_insert_and_select() {
        let backend = MemoryBackend::new();
        backend
            .insert("assets", json!({"id": "a", "zone": "Sukhumvit"}))
            .await
            .unwrap();
        backend
            .insert("assets", json!({"id": "b", "zone": "Silom"}))
            .await
            .unwrap();

        let mut query = SelectQuery::table("assets");
        query.and_where(cond(
            ColumnRef::plain("zone"),
            FilterOperator::Eq,
            json!("Sukhumvit"),
        ));
        let rows = backend.select(&query).await.unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0]["id"], json!("a"));
    }

    #[tokio::test]
    async fn test_unique_column_conflict() {
        let backend = MemoryBackend::new().with_unique("staffs", "email");
        backend
            .insert("staffs", json!({"id": "a", "email": "x@y.z"}))
            .await
            .unwrap();
        let err = backend
            .insert("staffs", json!({"id": "b", "email": "x@y.z"}))
            .await
            .unwrap_err();
        assert!(matches!(err, StorageError::Conflict { .. }));
    }

    #[tokio::test]
    async fn test_soft_delete_scopes_reads() {
        let backend = MemoryBackend::new();
        backend
            .insert("assets", json!({"id": "a", "zone": "Sukhumvit"}))
            .await
            .unwrap();
        let predicate = cond(ColumnRef::plain("id"), FilterOperator::Eq, json!("a"));
        backend
            .delete("assets", &predicate, DeleteMode::Soft)
            .await
            .unwrap();

        let query = SelectQuery::table("assets");
        assert!(backend.select(&query).await.unwrap().is_empty());

        let mut unscoped = SelectQuery::table("assets");
        unscoped.unscoped = true;
        assert_eq!(backend.select(&unscoped).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_update_skips_null_patch_values() {
        let backend = MemoryBackend::new();
        backend
            .insert("assets", json!({"id": "a", "zone": "Sukhumvit", "price": 100}))
            .await
            .unwrap();
        let predicate = cond(ColumnRef::plain("id"), FilterOperator::Eq, json!("a"));
        let touched = backend
            .update("assets", &predicate, json!({"zone": "Silom", "price": null}))
            .await
            .unwrap();
        assert_eq!(touched, 1);

        let mut query = SelectQuery::table("assets");
        query.unscoped = true;
        let rows = backend.select(&query).await.unwrap();
        assert_eq!(rows[0]["zone"], json!("Silom"));
        assert_eq!(rows[0]["price"], json!(100));
    }

    #[tokio::test]
    async fn test_join_embeds_relation_and_filters_foreign() {
        let backend = MemoryBackend::new();
        backend
            .insert("projects", json!({"id": "p1", "name": "Noble"}))
            .await
            .unwrap();
        backend
            .insert("assets", json!({"id": "a", "project_id": "p1"}))
            .await
            .unwrap();
        backend
            .insert("assets", json!({"id": "b", "project_id": null}))
            .await
            .unwrap();

        let mut query = SelectQuery::table("assets");
        query.join(Join {
            alias: "Project".to_string(),
            table: "projects".to_string(),
            local_key: "project_id".to_string(),
        });
        query.and_where(cond(
            ColumnRef::foreign("Project", "name"),
            FilterOperator::Like,
            json!("%noble%"),
        ));
        let rows = backend.select(&query).await.unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0]["project"]["name"], json!("Noble"));
    }

    #[tokio::test]
    async fn test_jsonb_containment() {
        let backend = MemoryBackend::new();
        backend
            .insert("users", json!({"id": "u1", "tag": ["condo", "sukhumvit"]}))
            .await
            .unwrap();
        backend
            .insert("users", json!({"id": "u2", "tag": ["house"]}))
            .await
            .unwrap();

        let mut query = SelectQuery::table("users");
        query.and_where(cond(
            ColumnRef::plain("tag"),
            FilterOperator::In,
            json!(["condo"]),
        ));
        let rows = backend.select(&query).await.unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0]["id"], json!("u1"));
    }

    #[tokio::test]
    async fn test_sort_offset_limit() {
        let backend = MemoryBackend::new();
        for (id, price) in [("a", 300), ("b", 100), ("c", 200)] {
            backend
                .insert("assets", json!({"id": id, "price": price}))
                .await
                .unwrap();
        }
        let mut query = SelectQuery::table("assets");
        query.sort.push(SortKey {
            column: "price".to_string(),
            direction: SortDirection::Asc,
        });
        query.offset = Some(1);
        query.limit = Some(1);
        let rows = backend.select(&query).await.unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0]["id"], json!("c"));
        // count ignores paging
        assert_eq!(backend.count(&query).await.unwrap(), 3);
    }

    #[tokio::test]
    async fn test_object_containment() {
        let backend = MemoryBackend::new();
        backend
            .insert(
                "asset_logs",
                json!({"id": "l1", "model": {"id": "a", "zone": "Sukhumvit"}}),
            )
            .await
            .unwrap();
        backend
            .insert("asset_logs", json!({"id": "l2", "model": {"id": "b"}}))
            .await
            .unwrap();

        let mut query = SelectQuery::table("asset_logs");
        query.and_where(cond(
            ColumnRef::plain("model"),
            FilterOperator::In,
            json!({"id": "a"}),
        ));
        let rows = backend.select(&query).await.unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0]["id"], json!("l1"));
    }

    #[tokio::test]
    async fn test_group_count_unrolls_arrays() {
        let backend = MemoryBackend::new();
        backend
            .insert("users", json!({"id": "u1", "tag": ["condo", "sukhumvit"]}))
            .await
            .unwrap();
        backend
            .insert("users", json!({"id": "u2", "tag": ["condo"]}))
            .await
            .unwrap();
        let counts = backend.group_count("users", "tag").await.unwrap();
        assert_eq!(counts["condo"], json!(2));
        assert_eq!(counts["sukhumvit"], json!(1));
    }

    #[tokio::test]
    async fn test_group_count() {
        let backend = MemoryBackend::new();
        for (id, zone) in [("a", "Sukhumvit"), ("b", "Sukhumvit"), ("c", "Silom")] {
            backend
                .insert("assets", json!({"id": id, "zone": zone}))
                .await
                .unwrap();
        }
        let counts = backend.group_count("assets", "zone").await.unwrap();
        assert_eq!(counts["Sukhumvit"], json!(2));
        assert_eq!(counts["Silom"], json!(1));
    }
}
