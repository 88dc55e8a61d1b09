//! Storage backend trait.

use async_trait::async_trait;
use atrium_core::error::StorageError;
use atrium_core::query::{DeleteMode, Predicate, SelectQuery};
use serde_json::Value;
use std::sync::Arc;

pub type SharedBackend = Arc<dyn Backend>;

/// Row storage behind the entity stores. Rows are JSON objects; the
/// backend owns matching, scoping, and uniqueness, while the stores own
/// ids, timestamps, and changelog fan-out.
#[async_trait]
pub trait Backend: Send + Sync {
    /// Create the table if it does not exist yet. Idempotent.
    async fn ensure_table(&self, table: &str) -> Result<(), StorageError>;

    /// Rows matching the query, with joined relations embedded under the
    /// snake-cased relation alias.
    async fn select(&self, query: &SelectQuery) -> Result<Vec<Value>, StorageError>;

    /// Row count for the query, ignoring its offset and limit.
    async fn count(&self, query: &SelectQuery) -> Result<u64, StorageError>;

    /// Insert one row, enforcing declared unique columns.
    async fn insert(&self, table: &str, row: Value) -> Result<Value, StorageError>;

    /// Insert a batch of rows into one table.
    async fn insert_many(&self, table: &str, rows: Vec<Value>) -> Result<(), StorageError>;

    /// Merge `patch` into every row matching `predicate`, skipping null
    /// patch values so absent fields never overwrite stored ones. Returns
    /// the number of rows touched.
    async fn update(
        &self,
        table: &str,
        predicate: &Predicate,
        patch: Value,
    ) -> Result<u64, StorageError>;

    /// Delete rows matching `predicate`. Soft delete sets the marker;
    /// hard delete removes rows regardless of the marker.
    async fn delete(
        &self,
        table: &str,
        predicate: &Predicate,
        mode: DeleteMode,
    ) -> Result<u64, StorageError>;

    /// Count live rows grouped by the distinct values of one column,
    /// returned as a JSON object from value to count.
    async fn group_count(&self, table: &str, column: &str) -> Result<Value, StorageError>;
}
