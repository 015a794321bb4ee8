use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use super::item::Attachment;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatterStatus {
    Active,
    Passed,
    Failed,
    Tabled,
    Withdrawn,
    Referred,
    Amended,
    Vetoed,
    Enacted,
}

impl MatterStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Passed => "passed",
            Self::Failed => "failed",
            Self::Tabled => "tabled",
            Self::Withdrawn => "withdrawn",
            Self::Referred => "referred",
            Self::Amended => "amended",
            Self::Vetoed => "vetoed",
            Self::Enacted => "enacted",
        }
    }

    pub fn parse(s: &str) -> Self {
        match s {
            "passed" => Self::Passed,
            "failed" => Self::Failed,
            "tabled" => Self::Tabled,
            "withdrawn" => Self::Withdrawn,
            "referred" => Self::Referred,
            "amended" => Self::Amended,
            "vetoed" => Self::Vetoed,
            "enacted" => Self::Enacted,
            _ => Self::Active,
        }
    }
}

/// The canonical legislative item: the unit that gets summarized once and
/// reused across every meeting it appears on.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Matter {
    pub id: String,
    pub banana: String,
    pub matter_file: Option<String>,
    pub matter_type: Option<String>,
    pub title: String,
    pub sponsors: sqlx::types::Json<Vec<String>>,
    pub canonical_summary: Option<String>,
    pub canonical_topics: sqlx::types::Json<Vec<String>>,
    pub attachments: sqlx::types::Json<Vec<Attachment>>,
    pub attachment_hash: Option<String>,
    pub metadata: sqlx::types::Json<serde_json::Value>,
    pub first_seen: DateTime<Utc>,
    pub last_seen: DateTime<Utc>,
    pub appearance_count: i32,
    pub status: String,
    pub final_vote_date: Option<DateTime<Utc>>,
    pub quality_score: Option<f64>,
}

impl Matter {
    pub fn status_enum(&self) -> MatterStatus {
        MatterStatus::parse(&self.status)
    }

    /// Matter-cache-hit eligibility: the item's attachments haven't changed
    /// since the matter's canonical summary was produced.
    pub fn cache_hit_for(&self, item_attachment_hash: &str) -> bool {
        self.canonical_summary.is_some()
            && self.attachment_hash.as_deref() == Some(item_attachment_hash)
    }
}

/// Preference order for deriving a Matter's key from an item:
/// `matter_file -> vendor matter_id -> normalized title`.
pub fn preferred_matter_key(
    matter_file: Option<&str>,
    vendor_matter_id: Option<&str>,
    title: &str,
) -> String {
    if let Some(f) = matter_file.filter(|s| !s.trim().is_empty()) {
        return format!("file:{}", f.trim());
    }
    if let Some(m) = vendor_matter_id.filter(|s| !s.trim().is_empty()) {
        return format!("vid:{}", m.trim());
    }
    format!("title:{}", normalize_title(title))
}

fn normalize_title(title: &str) -> String {
    title.trim().to_lowercase().split_whitespace().collect::<Vec<_>>().join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prefers_matter_file_over_everything() {
        let key = preferred_matter_key(Some("BL2025-1098"), Some("V-42"), "An ordinance");
        assert_eq!(key, "file:BL2025-1098");
    }

    #[test]
    fn falls_back_to_vendor_id_then_title() {
        assert_eq!(preferred_matter_key(None, Some("V-42"), "An ordinance"), "vid:V-42");
        assert_eq!(
            preferred_matter_key(None, None, "  An   Ordinance  "),
            "title:an ordinance"
        );
    }
}
