use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VoteOutcome {
    Passed,
    Failed,
    Tabled,
    Withdrawn,
    Referred,
    Amended,
    NoVote,
    Unknown,
}

impl VoteOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Passed => "passed",
            Self::Failed => "failed",
            Self::Tabled => "tabled",
            Self::Withdrawn => "withdrawn",
            Self::Referred => "referred",
            Self::Amended => "amended",
            Self::NoVote => "no_vote",
            Self::Unknown => "unknown",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "passed" => Some(Self::Passed),
            "failed" => Some(Self::Failed),
            "tabled" => Some(Self::Tabled),
            "withdrawn" => Some(Self::Withdrawn),
            "referred" => Some(Self::Referred),
            "amended" => Some(Self::Amended),
            "no_vote" => Some(Self::NoVote),
            "unknown" => Some(Self::Unknown),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct VoteTally {
    #[serde(default)]
    pub yes: i32,
    #[serde(default)]
    pub no: i32,
    #[serde(default)]
    pub abstain: i32,
    #[serde(default)]
    pub absent: i32,
}

/// A single (matter, meeting, item) occurrence of a matter.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct MatterAppearance {
    pub id: i64,
    pub matter_id: String,
    pub meeting_id: String,
    pub item_id: String,
    pub appeared_at: DateTime<Utc>,
    pub committee_id: Option<String>,
    pub action_label: Option<String>,
    pub vote_outcome: Option<String>,
    pub vote_tally: sqlx::types::Json<VoteTally>,
    pub sequence: i32,
}
