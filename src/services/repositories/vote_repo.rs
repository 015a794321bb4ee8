use sqlx::SqlitePool;

#[derive(Clone)]
pub struct VoteRepo {
    pool: SqlitePool,
}

impl VoteRepo {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn record(
        &self,
        council_member_id: &str,
        matter_id: &str,
        meeting_id: &str,
        value: &str,
        sequence: Option<i32>,
    ) -> Result<(), sqlx::Error> {
        sqlx::query(
            r#"
            INSERT INTO votes (council_member_id, matter_id, meeting_id, value, sequence)
            VALUES (?, ?, ?, ?, ?)
            ON CONFLICT(council_member_id, matter_id, meeting_id) DO UPDATE SET value = excluded.value
            "#,
        )
        .bind(council_member_id)
        .bind(matter_id)
        .bind(meeting_id)
        .bind(value)
        .bind(sequence)
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}
