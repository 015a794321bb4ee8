use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MeetingStatus {
    Cancelled,
    Postponed,
    Deferred,
    Revised,
    Rescheduled,
}

impl MeetingStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Cancelled => "cancelled",
            Self::Postponed => "postponed",
            Self::Deferred => "deferred",
            Self::Revised => "revised",
            Self::Rescheduled => "rescheduled",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "cancelled" => Some(Self::Cancelled),
            "postponed" => Some(Self::Postponed),
            "deferred" => Some(Self::Deferred),
            "revised" => Some(Self::Revised),
            "rescheduled" => Some(Self::Rescheduled),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProcessingStatus {
    Pending,
    Processing,
    Completed,
    Failed,
}

impl ProcessingStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Processing => "processing",
            Self::Completed => "completed",
            Self::Failed => "failed",
        }
    }

    pub fn parse(s: &str) -> Self {
        match s {
            "processing" => Self::Processing,
            "completed" => Self::Completed,
            "failed" => Self::Failed,
            _ => Self::Pending,
        }
    }
}

/// Participation details extracted by the adapter at meeting creation time;
/// the Processor never derives or mutates this.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Participation {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub virtual_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub meeting_id: Option<String>,
    #[serde(default)]
    pub is_hybrid: bool,
    #[serde(default)]
    pub is_virtual_only: bool,
}

#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Meeting {
    pub id: String,
    pub banana: String,
    pub vendor_id: String,
    pub title: String,
    pub start_time: Option<DateTime<Utc>>,
    pub agenda_url: Option<String>,
    pub packet_url: Option<String>,
    pub committee_id: Option<String>,
    /// Populated only for the monolithic processing path.
    pub summary: Option<String>,
    pub participation: sqlx::types::Json<Participation>,
    pub status: Option<String>,
    pub processing_status: String,
    pub processing_method: Option<String>,
    pub processing_time_ms: Option<i64>,
    /// Sorted set-union of child item topics.
    pub topics: sqlx::types::Json<Vec<String>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Meeting {
    pub fn processing_status_enum(&self) -> ProcessingStatus {
        ProcessingStatus::parse(&self.processing_status)
    }

    pub fn meeting_status_enum(&self) -> Option<MeetingStatus> {
        self.status.as_deref().and_then(MeetingStatus::parse)
    }

    pub fn is_monolithic(&self) -> bool {
        self.processing_method.as_deref() == Some("monolithic")
    }
}
