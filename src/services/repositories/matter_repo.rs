use sqlx::SqlitePool;

use crate::models::{Attachment, Matter};

#[derive(Clone)]
pub struct MatterRepo {
    pool: SqlitePool,
}

impl MatterRepo {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn get(&self, id: &str) -> Result<Option<Matter>, sqlx::Error> {
        sqlx::query_as::<_, Matter>("SELECT * FROM matters WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
    }

    /// Insert-then-merge: two workers racing on the same matter both issue
    /// this statement, and SQLite's single-writer serialization makes the
    /// `ON CONFLICT` branch the effective lock — whichever commits second
    /// sees the first's `appearance_count` and increments from there.
    #[allow(clippy::too_many_arguments)]
    pub async fn upsert_appearance(
        &self,
        id: &str,
        banana: &str,
        matter_file: Option<&str>,
        matter_type: Option<&str>,
        title: &str,
        sponsors: &[String],
    ) -> Result<(), sqlx::Error> {
        sqlx::query(
            r#"
            INSERT INTO matters (
                id, banana, matter_file, matter_type, title, sponsors,
                canonical_topics, attachments, metadata, first_seen, last_seen,
                appearance_count, status
            ) VALUES (?, ?, ?, ?, ?, ?, '[]', '[]', '{}', datetime('now'), datetime('now'), 1, 'active')
            ON CONFLICT(id) DO UPDATE SET
                title = excluded.title,
                sponsors = excluded.sponsors,
                last_seen = datetime('now'),
                appearance_count = matters.appearance_count + 1
            "#,
        )
        .bind(id)
        .bind(banana)
        .bind(matter_file)
        .bind(matter_type)
        .bind(title)
        .bind(sqlx::types::Json(sponsors))
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    pub async fn set_canonical_summary(
        &self,
        id: &str,
        summary: &str,
        topics: &[String],
        attachments: &[Attachment],
        attachment_hash: &str,
    ) -> Result<(), sqlx::Error> {
        sqlx::query(
            r#"
            UPDATE matters SET
                canonical_summary = ?, canonical_topics = ?, attachments = ?,
                attachment_hash = ?, last_seen = datetime('now')
            WHERE id = ?
            "#,
        )
        .bind(summary)
        .bind(sqlx::types::Json(topics))
        .bind(sqlx::types::Json(attachments))
        .bind(attachment_hash)
        .bind(id)
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}
