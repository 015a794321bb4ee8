use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Idempotence record keyed by packet URL, so re-running a sync does not
/// re-extract or re-summarize a packet whose content hasn't changed.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct ProcessingCacheEntry {
    pub packet_url: String,
    pub content_hash: String,
    pub method: String,
    pub elapsed_ms: i64,
    pub hit_count: i32,
    pub created_at: DateTime<Utc>,
    pub last_accessed_at: DateTime<Utc>,
}
