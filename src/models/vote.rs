use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VoteValue {
    Yes,
    No,
    Abstain,
    Absent,
    Present,
    Recused,
    NotVoting,
}

impl VoteValue {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Yes => "yes",
            Self::No => "no",
            Self::Abstain => "abstain",
            Self::Absent => "absent",
            Self::Present => "present",
            Self::Recused => "recused",
            Self::NotVoting => "not_voting",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "yes" => Some(Self::Yes),
            "no" => Some(Self::No),
            "abstain" => Some(Self::Abstain),
            "absent" => Some(Self::Absent),
            "present" => Some(Self::Present),
            "recused" => Some(Self::Recused),
            "not_voting" => Some(Self::NotVoting),
            _ => None,
        }
    }
}

/// A (council_member, matter, meeting) vote cast. Unique on that triple.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Vote {
    pub id: i64,
    pub council_member_id: String,
    pub matter_id: String,
    pub meeting_id: String,
    pub value: String,
    pub vote_date: Option<DateTime<Utc>>,
    pub sequence: Option<i32>,
}

impl Vote {
    pub fn value_enum(&self) -> Option<VoteValue> {
        VoteValue::parse(&self.value)
    }
}
