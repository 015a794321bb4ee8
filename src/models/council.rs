use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct CouncilMember {
    pub id: String,
    pub banana: String,
    pub display_name: String,
    pub normalized_name: String,
    pub title: Option<String>,
    pub district: Option<String>,
    pub status: String,
    pub first_seen: DateTime<Utc>,
    pub last_seen: DateTime<Utc>,
    pub sponsorship_count: i32,
    pub vote_count: i32,
    pub metadata: sqlx::types::Json<serde_json::Value>,
}

pub fn normalize_member_name(name: &str) -> String {
    name.trim().to_lowercase().split_whitespace().collect::<Vec<_>>().join(" ")
}
