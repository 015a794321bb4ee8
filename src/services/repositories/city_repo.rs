use sqlx::SqlitePool;

use crate::models::City;

#[derive(Clone)]
pub struct CityRepo {
    pool: SqlitePool,
}

impl CityRepo {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn get(&self, banana: &str) -> Result<Option<City>, sqlx::Error> {
        sqlx::query_as::<_, City>("SELECT * FROM cities WHERE banana = ?")
            .bind(banana)
            .fetch_optional(&self.pool)
            .await
    }

    pub async fn list_active(&self) -> Result<Vec<City>, sqlx::Error> {
        sqlx::query_as::<_, City>("SELECT * FROM cities WHERE status = 'active' ORDER BY banana")
            .fetch_all(&self.pool)
            .await
    }
}
