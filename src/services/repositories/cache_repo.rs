use sqlx::SqlitePool;

use crate::models::ProcessingCacheEntry;

#[derive(Clone)]
pub struct CacheRepo {
    pool: SqlitePool,
}

impl CacheRepo {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn get(&self, packet_url: &str) -> Result<Option<ProcessingCacheEntry>, sqlx::Error> {
        sqlx::query_as::<_, ProcessingCacheEntry>(
            "SELECT * FROM processing_cache WHERE packet_url = ?",
        )
        .bind(packet_url)
        .fetch_optional(&self.pool)
        .await
    }

    pub async fn record(
        &self,
        packet_url: &str,
        content_hash: &str,
        method: &str,
        elapsed_ms: i64,
    ) -> Result<(), sqlx::Error> {
        sqlx::query(
            r#"
            INSERT INTO processing_cache (packet_url, content_hash, method, elapsed_ms, hit_count, created_at, last_accessed_at)
            VALUES (?, ?, ?, ?, 0, datetime('now'), datetime('now'))
            ON CONFLICT(packet_url) DO UPDATE SET
                content_hash = excluded.content_hash,
                method = excluded.method,
                elapsed_ms = excluded.elapsed_ms,
                last_accessed_at = datetime('now')
            "#,
        )
        .bind(packet_url)
        .bind(content_hash)
        .bind(method)
        .bind(elapsed_ms)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    pub async fn record_hit(&self, packet_url: &str) -> Result<(), sqlx::Error> {
        sqlx::query(
            "UPDATE processing_cache SET hit_count = hit_count + 1, last_accessed_at = datetime('now') WHERE packet_url = ?",
        )
        .bind(packet_url)
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}
