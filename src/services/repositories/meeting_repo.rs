use sqlx::SqlitePool;

use crate::models::{Meeting, Participation};

#[derive(Clone)]
pub struct MeetingRepo {
    pool: SqlitePool,
}

impl MeetingRepo {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn get(&self, id: &str) -> Result<Option<Meeting>, sqlx::Error> {
        sqlx::query_as::<_, Meeting>("SELECT * FROM meetings WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
    }

    /// Creates the meeting if absent; leaves processing fields untouched if
    /// it already exists, since re-fetching a meeting must not clobber
    /// in-progress or completed summaries.
    #[allow(clippy::too_many_arguments)]
    pub async fn upsert(
        &self,
        id: &str,
        banana: &str,
        vendor_id: &str,
        title: &str,
        start_time: Option<chrono::DateTime<chrono::Utc>>,
        agenda_url: Option<&str>,
        packet_url: Option<&str>,
        status: Option<&str>,
        committee_id: Option<&str>,
        participation: &Participation,
    ) -> Result<(), sqlx::Error> {
        sqlx::query(
            r#"
            INSERT INTO meetings (
                id, banana, vendor_id, title, start_time, agenda_url, packet_url,
                status, committee_id, processing_status, participation, topics, created_at, updated_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, 'pending', ?, '[]', datetime('now'), datetime('now'))
            ON CONFLICT(id) DO UPDATE SET
                title = excluded.title,
                start_time = excluded.start_time,
                agenda_url = excluded.agenda_url,
                packet_url = excluded.packet_url,
                status = excluded.status,
                committee_id = excluded.committee_id,
                updated_at = datetime('now')
            "#,
        )
        .bind(id)
        .bind(banana)
        .bind(vendor_id)
        .bind(title)
        .bind(start_time)
        .bind(agenda_url)
        .bind(packet_url)
        .bind(status)
        .bind(committee_id)
        .bind(sqlx::types::Json(participation))
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    pub async fn set_item_summary_method(
        &self,
        id: &str,
        method: &str,
    ) -> Result<(), sqlx::Error> {
        sqlx::query(
            "UPDATE meetings SET processing_method = ?, processing_status = 'completed', updated_at = datetime('now') WHERE id = ?",
        )
        .bind(method)
        .bind(id)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    pub async fn mark_failed(&self, id: &str) -> Result<(), sqlx::Error> {
        sqlx::query(
            "UPDATE meetings SET processing_status = 'failed', updated_at = datetime('now') WHERE id = ?",
        )
        .bind(id)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    pub async fn set_monolithic_summary(
        &self,
        id: &str,
        summary: &str,
        method: &str,
        elapsed_ms: i64,
    ) -> Result<(), sqlx::Error> {
        sqlx::query(
            r#"
            UPDATE meetings SET
                summary = ?, processing_method = ?, processing_status = 'completed',
                processing_time_ms = ?, updated_at = datetime('now')
            WHERE id = ?
            "#,
        )
        .bind(summary)
        .bind(method)
        .bind(elapsed_ms)
        .bind(id)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// Recomputes a meeting's aggregated `topics` as the sorted union of its
    /// items' topics, to be called once the last item of a meeting completes.
    pub async fn recompute_aggregated_topics(&self, meeting_id: &str) -> Result<(), sqlx::Error> {
        let rows: Vec<(sqlx::types::Json<Vec<String>>,)> =
            sqlx::query_as("SELECT topics FROM agenda_items WHERE meeting_id = ?")
                .bind(meeting_id)
                .fetch_all(&self.pool)
                .await?;

        let mut union: std::collections::BTreeSet<String> = std::collections::BTreeSet::new();
        for (topics,) in rows {
            union.extend(topics.0);
        }
        let topics: Vec<String> = union.into_iter().collect();

        sqlx::query("UPDATE meetings SET topics = ?, updated_at = datetime('now') WHERE id = ?")
            .bind(sqlx::types::Json(topics))
            .bind(meeting_id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    /// Counts items still awaiting resolution: neither summarized nor
    /// marked `no_attachments` (which resolves an item without a summary).
    pub async fn count_items_without_summary(&self, meeting_id: &str) -> Result<i64, sqlx::Error> {
        let (count,): (i64,) = sqlx::query_as(
            r#"
            SELECT COUNT(*) FROM agenda_items
            WHERE meeting_id = ? AND summary IS NULL AND processing_method IS NOT 'no_attachments'
            "#,
        )
        .bind(meeting_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(count)
    }
}
