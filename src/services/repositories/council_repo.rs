use sqlx::SqlitePool;

use crate::models::CouncilMember;

#[derive(Clone)]
pub struct CouncilRepo {
    pool: SqlitePool,
}

impl CouncilRepo {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn get(&self, id: &str) -> Result<Option<CouncilMember>, sqlx::Error> {
        sqlx::query_as::<_, CouncilMember>("SELECT * FROM council_members WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
    }

    pub async fn upsert(
        &self,
        id: &str,
        banana: &str,
        display_name: &str,
        normalized_name: &str,
    ) -> Result<(), sqlx::Error> {
        sqlx::query(
            r#"
            INSERT INTO council_members (
                id, banana, display_name, normalized_name, status,
                sponsorship_count, vote_count, first_seen, last_seen
            ) VALUES (?, ?, ?, ?, 'active', 0, 0, datetime('now'), datetime('now'))
            ON CONFLICT(id) DO UPDATE SET
                display_name = excluded.display_name,
                last_seen = datetime('now')
            "#,
        )
        .bind(id)
        .bind(banana)
        .bind(display_name)
        .bind(normalized_name)
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}
