//! Engine configuration.

use std::time::Duration;

/// Process-wide tunables, fixed at construction. Stores take a copy, so
/// two engines with different settings can coexist in one process.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Rows per page when the request does not say.
    pub limit_per_page: u64,
    /// Ordering applied when the request does not say.
    pub default_sort: String,
    /// Changelog queue depth before writes are dropped.
    pub audit_queue_capacity: usize,
    /// Time-to-live for cached aggregate counts.
    pub cache_expire: Duration,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            limit_per_page: 10,
            default_sort: "created_at,desc".to_string(),
            audit_queue_capacity: 1024,
            cache_expire: Duration::from_secs(60),
        }
    }
}
