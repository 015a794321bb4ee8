use sqlx::SqlitePool;

use crate::models::{AgendaItem, Attachment};

#[derive(Clone)]
pub struct ItemRepo {
    pool: SqlitePool,
}

impl ItemRepo {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn get(&self, id: &str) -> Result<Option<AgendaItem>, sqlx::Error> {
        sqlx::query_as::<_, AgendaItem>("SELECT * FROM agenda_items WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
    }

    pub async fn list_for_meeting(&self, meeting_id: &str) -> Result<Vec<AgendaItem>, sqlx::Error> {
        sqlx::query_as::<_, AgendaItem>(
            "SELECT * FROM agenda_items WHERE meeting_id = ? ORDER BY sequence",
        )
        .bind(meeting_id)
        .fetch_all(&self.pool)
        .await
    }

    #[allow(clippy::too_many_arguments)]
    pub async fn upsert(
        &self,
        id: &str,
        meeting_id: &str,
        title: &str,
        sequence: i32,
        attachments: &[Attachment],
        attachment_hash: &str,
        matter_id: Option<&str>,
        matter_file: Option<&str>,
        matter_type: Option<&str>,
        agenda_number: Option<&str>,
        sponsors: &[String],
    ) -> Result<(), sqlx::Error> {
        sqlx::query(
            r#"
            INSERT INTO agenda_items (
                id, meeting_id, title, sequence, attachments, attachment_hash,
                matter_id, matter_file, matter_type, agenda_number, sponsors,
                topics, created_at, updated_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, '[]', datetime('now'), datetime('now'))
            ON CONFLICT(id) DO UPDATE SET
                title = excluded.title,
                sequence = excluded.sequence,
                attachments = excluded.attachments,
                attachment_hash = excluded.attachment_hash,
                matter_id = excluded.matter_id,
                matter_file = excluded.matter_file,
                matter_type = excluded.matter_type,
                agenda_number = excluded.agenda_number,
                sponsors = excluded.sponsors,
                updated_at = datetime('now')
            "#,
        )
        .bind(id)
        .bind(meeting_id)
        .bind(title)
        .bind(sequence)
        .bind(sqlx::types::Json(attachments))
        .bind(attachment_hash)
        .bind(matter_id)
        .bind(matter_file)
        .bind(matter_type)
        .bind(agenda_number)
        .bind(sqlx::types::Json(sponsors))
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// Marks an item as resolved with nothing to summarize, distinct from
    /// a real failure: `summary` stays `NULL` but `processing_method`
    /// records why, so completion checks don't wait on it forever.
    pub async fn mark_no_attachments(&self, id: &str) -> Result<(), sqlx::Error> {
        sqlx::query(
            "UPDATE agenda_items SET processing_method = 'no_attachments', updated_at = datetime('now') WHERE id = ?",
        )
        .bind(id)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    pub async fn set_summary(
        &self,
        id: &str,
        summary: &str,
        topics: &[String],
        processing_method: &str,
    ) -> Result<(), sqlx::Error> {
        sqlx::query(
            r#"
            UPDATE agenda_items SET
                summary = ?, topics = ?, processing_method = ?, updated_at = datetime('now')
            WHERE id = ?
            "#,
        )
        .bind(summary)
        .bind(sqlx::types::Json(topics))
        .bind(processing_method)
        .bind(id)
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}
