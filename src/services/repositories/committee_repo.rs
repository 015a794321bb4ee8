use sqlx::SqlitePool;

use crate::models::Committee;

#[derive(Clone)]
pub struct CommitteeRepo {
    pool: SqlitePool,
}

impl CommitteeRepo {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn get(&self, id: &str) -> Result<Option<Committee>, sqlx::Error> {
        sqlx::query_as::<_, Committee>("SELECT * FROM committees WHERE id = ?")
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
            INSERT INTO committees (id, banana, display_name, normalized_name, created_at)
            VALUES (?, ?, ?, ?, datetime('now'))
            ON CONFLICT(id) DO NOTHING
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
