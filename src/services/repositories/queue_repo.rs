use sqlx::SqlitePool;

use crate::models::{retry_backoff_secs, JobType, QueueJob};

#[derive(Clone)]
pub struct QueueRepo {
    pool: SqlitePool,
}

impl QueueRepo {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Unique by `source_url`. A terminal row is resurrected to `pending`
    /// with `retry_count` unchanged; a non-terminal row is left alone.
    pub async fn enqueue(
        &self,
        source_url: &str,
        meeting_id: Option<&str>,
        banana: Option<&str>,
        job_type: JobType,
        payload: &serde_json::Value,
        priority: i32,
    ) -> Result<(), sqlx::Error> {
        let job_type_str = match job_type {
            JobType::ItemLevel => "item_level",
            JobType::Monolithic => "monolithic",
        };

        sqlx::query(
            r#"
            INSERT INTO queue_jobs (
                source_url, meeting_id, banana, job_type, payload, status,
                priority, retry_count, created_at, available_at
            ) VALUES (?, ?, ?, ?, ?, 'pending', ?, 0, datetime('now'), datetime('now'))
            ON CONFLICT(source_url) DO UPDATE SET
                status = CASE
                    WHEN queue_jobs.status IN ('completed', 'failed', 'dead_letter')
                    THEN 'pending' ELSE queue_jobs.status
                END,
                priority = excluded.priority,
                available_at = CASE
                    WHEN queue_jobs.status IN ('completed', 'failed', 'dead_letter')
                    THEN datetime('now') ELSE queue_jobs.available_at
                END
            "#,
        )
        .bind(source_url)
        .bind(meeting_id)
        .bind(banana)
        .bind(job_type_str)
        .bind(sqlx::types::Json(payload))
        .bind(priority)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// Atomically claims the highest-priority eligible `pending` row
    /// (FIFO within a priority tier), including rows whose lease expired.
    pub async fn claim(&self, lease_ttl_secs: i64) -> Result<Option<QueueJob>, sqlx::Error> {
        let mut tx = self.pool.begin().await?;

        let candidate: Option<(i64,)> = sqlx::query_as(
            r#"
            SELECT id FROM queue_jobs
            WHERE (status = 'pending' AND available_at <= datetime('now'))
               OR (status = 'processing' AND started_at <= datetime('now', ? || ' seconds'))
            ORDER BY priority DESC, created_at ASC
            LIMIT 1
            "#,
        )
        .bind(format!("-{lease_ttl_secs}"))
        .fetch_optional(&mut *tx)
        .await?;

        let Some((id,)) = candidate else {
            tx.commit().await?;
            return Ok(None);
        };

        let lease_token = uuid::Uuid::new_v4().to_string();
        let job = sqlx::query_as::<_, QueueJob>(
            r#"
            UPDATE queue_jobs SET status = 'processing', started_at = datetime('now'), lease_token = ?
            WHERE id = ?
            RETURNING *
            "#,
        )
        .bind(&lease_token)
        .bind(id)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(Some(job))
    }

    /// A no-op if the job's lease was reclaimed by another worker in the
    /// meantime (the caller's `lease_token` no longer matches).
    pub async fn complete(&self, job_id: i64, lease_token: &str) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE queue_jobs SET status = 'completed', completed_at = datetime('now') WHERE id = ? AND lease_token = ?",
        )
        .bind(job_id)
        .bind(lease_token)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    pub async fn fail(
        &self,
        job_id: i64,
        lease_token: &str,
        retry_count: i32,
        max_retries: i32,
        error_message: &str,
    ) -> Result<bool, sqlx::Error> {
        if retry_count + 1 >= max_retries {
            let result = sqlx::query(
                r#"
                UPDATE queue_jobs SET
                    status = 'dead_letter', failed_at = datetime('now'),
                    retry_count = retry_count + 1, error_message = ?
                WHERE id = ? AND lease_token = ?
                "#,
            )
            .bind(error_message)
            .bind(job_id)
            .bind(lease_token)
            .execute(&self.pool)
            .await?;
            return Ok(result.rows_affected() > 0);
        }

        let backoff = retry_backoff_secs(retry_count);
        let result = sqlx::query(
            r#"
            UPDATE queue_jobs SET
                status = 'pending', retry_count = retry_count + 1, priority = priority - 1,
                error_message = ?, available_at = datetime('now', ? || ' seconds'),
                failed_at = datetime('now')
            WHERE id = ? AND lease_token = ?
            "#,
        )
        .bind(error_message)
        .bind(backoff as i64)
        .bind(job_id)
        .bind(lease_token)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    pub async fn has_completed_job(&self, source_url: &str) -> Result<bool, sqlx::Error> {
        let row: Option<(i64,)> =
            sqlx::query_as("SELECT id FROM queue_jobs WHERE source_url = ? AND status = 'completed'")
                .bind(source_url)
                .fetch_optional(&self.pool)
                .await?;
        Ok(row.is_some())
    }

    pub async fn count_by_status(&self, status: &str) -> Result<i64, sqlx::Error> {
        let (count,): (i64,) =
            sqlx::query_as("SELECT COUNT(*) FROM queue_jobs WHERE status = ?")
                .bind(status)
                .fetch_one(&self.pool)
                .await?;
        Ok(count)
    }

    pub async fn preview_pending(&self, limit: i64) -> Result<Vec<QueueJob>, sqlx::Error> {
        sqlx::query_as::<_, QueueJob>(
            "SELECT * FROM queue_jobs WHERE status = 'pending' ORDER BY priority DESC, created_at ASC LIMIT ?",
        )
        .bind(limit)
        .fetch_all(&self.pool)
        .await
    }
}
