use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AttachmentType {
    Pdf,
    Doc,
    Spreadsheet,
    Unknown,
}

impl AttachmentType {
    pub fn parse(s: &str) -> Self {
        match s {
            "pdf" => Self::Pdf,
            "doc" => Self::Doc,
            "spreadsheet" => Self::Spreadsheet,
            _ => Self::Unknown,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Attachment {
    pub name: String,
    pub url: String,
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub history_id: Option<String>,
}

/// One (meeting, item) agenda entry.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct AgendaItem {
    pub id: String,
    pub meeting_id: String,
    pub title: String,
    pub sequence: i32,
    pub attachments: sqlx::types::Json<Vec<Attachment>>,
    pub attachment_hash: String,
    pub matter_id: Option<String>,
    pub matter_file: Option<String>,
    pub matter_type: Option<String>,
    pub agenda_number: Option<String>,
    pub sponsors: sqlx::types::Json<Vec<String>>,
    pub summary: Option<String>,
    pub topics: sqlx::types::Json<Vec<String>>,
    pub processing_method: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl AgendaItem {
    pub fn has_summary(&self) -> bool {
        self.summary.is_some()
    }

    /// True once the item has either been summarized or found to have
    /// nothing to summarize; either way, nothing further drives it.
    pub fn is_resolved(&self) -> bool {
        self.has_summary() || self.processing_method.as_deref() == Some("no_attachments")
    }

    pub fn is_procedural(&self) -> bool {
        super::matter_filter::is_procedural_title(&self.title)
    }
}
