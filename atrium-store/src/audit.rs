//! Changelog engine.
//!
//! Stores emit [`LogEvent`]s into a bounded channel and move on; a single
//! background worker owns the writes. When the channel is full the event
//! is dropped with a warning rather than stalling the mutation that
//! produced it. Tests call [`AuditHandle::flush`] to wait for everything
//! queued so far to land.
//!
//! Every event writes one row into the entity's own `<entity>_logs` table.
//! When a staff member performed the action on some other entity, a copy
//! goes to `staff_logs` tagged with `from_table`; likewise `user_logs` for
//! user-performed actions. That gives each principal a single trail of
//! everything they touched.

use atrium_core::entities::Role;
use atrium_core::error::{AtriumError, StorageError};
use atrium_core::filter::FilterOperator;
use atrium_core::identity::{Doer, DoerType};
use atrium_core::query::{ColumnRef, Predicate, SelectQuery};
use atrium_storage::SharedBackend;
use serde_json::Value;
use std::collections::HashMap;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;

/// One changelog write request.
#[derive(Debug, Clone)]
pub struct LogEvent {
    pub entity: &'static str,
    pub log_table: String,
    pub action: String,
    pub model: Value,
    pub doer: Doer,
    /// Principal trail table to cross-post into, if any.
    pub cross_table: Option<&'static str>,
}

enum AuditJob {
    Events(Vec<LogEvent>),
    Flush(oneshot::Sender<()>),
}

/// Cheap cloneable sender half handed to every store.
#[derive(Clone)]
pub struct AuditHandle {
    tx: mpsc::Sender<AuditJob>,
}

impl AuditHandle {
    /// Queue one event. Never blocks; a full queue drops the event.
    pub fn record(&self, event: LogEvent) {
        self.record_batch(vec![event]);
    }

    /// Queue a batch that will be written together.
    pub fn record_batch(&self, events: Vec<LogEvent>) {
        if events.is_empty() {
            return;
        }
        if let Err(err) = self.tx.try_send(AuditJob::Events(events)) {
            tracing::warn!(error = %err, "audit queue full, dropping changelog events");
        }
    }

    /// Wait until every event queued before this call has been written.
    pub async fn flush(&self) -> Result<(), StorageError> {
        let (ack, done) = oneshot::channel();
        self.tx
            .send(AuditJob::Flush(ack))
            .await
            .map_err(|_| StorageError::Backend {
                reason: "audit worker stopped".to_string(),
            })?;
        done.await.map_err(|_| StorageError::Backend {
            reason: "audit worker stopped".to_string(),
        })
    }
}

/// Owns the worker that drains the changelog queue.
pub struct AuditEngine;

impl AuditEngine {
    /// Start the background worker. The worker exits once every handle is
    /// dropped and the queue has drained.
    pub fn spawn(backend: SharedBackend, capacity: usize) -> (AuditHandle, JoinHandle<()>) {
        let (tx, mut rx) = mpsc::channel(capacity);
        let worker = tokio::spawn(async move {
            while let Some(job) = rx.recv().await {
                match job {
                    AuditJob::Events(events) => {
                        if let Err(err) = write_events(&backend, events).await {
                            tracing::error!(error = %err, "changelog write failed");
                        }
                    }
                    AuditJob::Flush(ack) => {
                        let _ = ack.send(());
                    }
                }
            }
        });
        (AuditHandle { tx }, worker)
    }
}

/// Load the doer's role so the snapshot names what they were allowed to
/// do at the time, even if the role changes later.
async fn resolve_doer(backend: &SharedBackend, mut doer: Doer) -> Doer {
    if doer.doer_type != DoerType::Staff || doer.role.is_some() {
        return doer;
    }
    let role_id = match doer.role_id {
        Some(role_id) => role_id,
        None => return doer,
    };
    let mut query = SelectQuery::table("roles");
    query.and_where(Predicate::cond(
        ColumnRef::plain("id"),
        FilterOperator::Eq,
        Value::String(role_id.to_string()),
    ));
    query.limit = Some(1);
    match backend.select(&query).await {
        Ok(rows) => {
            if let Some(row) = rows.into_iter().next() {
                match serde_json::from_value::<Role>(row) {
                    Ok(role) => doer.role = Some(role),
                    Err(err) => tracing::warn!(error = %err, "doer role row did not decode"),
                }
            }
        }
        Err(err) => tracing::warn!(error = %err, "doer role lookup failed"),
    }
    doer
}

fn log_row(event: &LogEvent, doer: &Value, from_table: Option<&str>) -> Value {
    serde_json::json!({
        "id": atrium_core::new_entity_id(),
        "created_at": atrium_core::now(),
        "updated_at": atrium_core::now(),
        "model": &event.model,
        "action": event.action,
        "from_table": from_table,
        "doer": doer,
    })
}

async fn write_events(backend: &SharedBackend, events: Vec<LogEvent>) -> Result<(), AtriumError> {
    // group rows per table so each table gets one batched insert
    let mut by_table: HashMap<String, Vec<Value>> = HashMap::new();
    for event in events {
        let doer = resolve_doer(backend, event.doer.clone()).await;
        let doer = serde_json::to_value(&doer).map_err(|e| StorageError::Serialization {
            entity: "doer",
            reason: e.to_string(),
        })?;
        by_table
            .entry(event.log_table.clone())
            .or_default()
            .push(log_row(&event, &doer, None));
        if let Some(cross) = event.cross_table {
            by_table
                .entry(cross.to_string())
                .or_default()
                .push(log_row(&event, &doer, Some(event.entity)));
        }
    }
    for (table, rows) in by_table {
        backend.insert_many(&table, rows).await?;
    }
    Ok(())
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use atrium_storage::MemoryBackend;
    use serde_json::json;

    fn event(entity: &'static str, cross: Option<&'static str>) -> LogEvent {
        LogEvent {
            entity,
            log_table: format!("{entity}_logs"),
            action: "create".to_string(),
            model: json!({"id": "x"}),
            doer: Doer::system(),
            cross_table: cross,
        }
    }

    #[tokio::test]
    async fn test_primary_write_lands_after_flush() {
        let backend = MemoryBackend::new().into_shared();
        let (handle, _worker) = AuditEngine::spawn(backend.clone(), 16);
        handle.record(event("asset", None));
        handle.flush().await.unwrap();

        let query = SelectQuery::table("asset_logs");
        let rows = backend.select(&query).await.unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0]["action"], json!("create"));
        assert_eq!(rows[0]["from_table"], json!(null));
        assert_eq!(rows[0]["doer"]["type"], json!("system"));
    }

    #[tokio::test]
    async fn test_cross_post_carries_from_table() {
        let backend = MemoryBackend::new().into_shared();
        let (handle, _worker) = AuditEngine::spawn(backend.clone(), 16);
        handle.record(event("asset", Some("staff_logs")));
        handle.flush().await.unwrap();

        let rows = backend
            .select(&SelectQuery::table("staff_logs"))
            .await
            .unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0]["from_table"], json!("asset"));
        // primary row still written without the tag
        let primary = backend
            .select(&SelectQuery::table("asset_logs"))
            .await
            .unwrap();
        assert_eq!(primary.len(), 1);
        assert_eq!(primary[0]["from_table"], json!(null));
    }

    #[tokio::test]
    async fn test_flush_orders_after_prior_events() {
        let backend = MemoryBackend::new().into_shared();
        let (handle, _worker) = AuditEngine::spawn(backend.clone(), 64);
        for _ in 0..20 {
            handle.record(event("asset", None));
        }
        handle.flush().await.unwrap();
        let rows = backend
            .select(&SelectQuery::table("asset_logs"))
            .await
            .unwrap();
        assert_eq!(rows.len(), 20);
    }

    #[tokio::test]
    async fn test_worker_exits_when_handles_drop() {
        let backend = MemoryBackend::new().into_shared();
        let (handle, worker) = AuditEngine::spawn(backend, 4);
        drop(handle);
        worker.await.unwrap();
    }
}
