use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Committee {
    pub id: String,
    pub banana: String,
    pub display_name: String,
    pub normalized_name: String,
    pub created_at: DateTime<Utc>,
}

pub fn normalize_committee_name(name: &str) -> String {
    name.trim().to_lowercase().split_whitespace().collect::<Vec<_>>().join(" ")
}

#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct CommitteeMembership {
    pub id: i64,
    pub committee_id: String,
    pub council_member_id: String,
    pub joined_at: DateTime<Utc>,
    /// `None` means the membership is still active.
    pub left_at: Option<DateTime<Utc>>,
}

impl CommitteeMembership {
    pub fn is_active(&self) -> bool {
        self.left_at.is_none()
    }
}
