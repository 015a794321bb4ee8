use sqlx::SqlitePool;

#[derive(Clone)]
pub struct AppearanceRepo {
    pool: SqlitePool,
}

impl AppearanceRepo {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Unique on (matter, meeting, item); re-linking the same triple is a no-op.
    pub async fn link(
        &self,
        matter_id: &str,
        meeting_id: &str,
        item_id: &str,
        sequence: i32,
    ) -> Result<(), sqlx::Error> {
        sqlx::query(
            r#"
            INSERT INTO matter_appearances (matter_id, meeting_id, item_id, appeared_at, vote_tally, sequence)
            VALUES (?, ?, ?, datetime('now'), '{"yes":0,"no":0,"abstain":0,"absent":0}', ?)
            ON CONFLICT(matter_id, meeting_id, item_id) DO NOTHING
            "#,
        )
        .bind(matter_id)
        .bind(meeting_id)
        .bind(item_id)
        .bind(sequence)
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}
