//! Vendor adapter contract: polymorphic over {fetch, normalize, rate-limit
//! delay}. Adapters never touch the database or queue; they only return
//! data, which makes each one independently unit-testable against a
//! recorded HTTP cassette.

mod civicplus;
mod granicus;
mod primegov;

pub use civicplus::CivicPlusAdapter;
pub use granicus::GranicusAdapter;
pub use primegov::PrimegovAdapter;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::models::city::Vendor;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WireAttachment {
    pub name: String,
    pub url: String,
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub history_id: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct WireVote {
    pub member_name: String,
    pub value: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WireAgendaItem {
    #[serde(default)]
    pub vendor_item_id: Option<String>,
    pub title: String,
    pub sequence: i32,
    #[serde(default)]
    pub attachments: Vec<WireAttachment>,
    #[serde(default)]
    pub matter_id: Option<String>,
    #[serde(default)]
    pub matter_file: Option<String>,
    #[serde(default)]
    pub matter_type: Option<String>,
    #[serde(default)]
    pub agenda_number: Option<String>,
    #[serde(default)]
    pub sponsors: Vec<String>,
    #[serde(default)]
    pub votes: Vec<WireVote>,
    #[serde(default)]
    pub metadata: Option<serde_json::Value>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct WireParticipation {
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub virtual_url: Option<String>,
    #[serde(default)]
    pub meeting_id: Option<String>,
    #[serde(default)]
    pub is_hybrid: bool,
    #[serde(default)]
    pub is_virtual_only: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WireMeeting {
    pub vendor_id: String,
    pub title: String,
    /// `None` when the vendor hasn't published a date yet (TBD meeting);
    /// stored but never enqueued, since date eligibility can't be evaluated.
    pub start: Option<DateTime<Utc>>,
    #[serde(default)]
    pub agenda_url: Option<String>,
    #[serde(default)]
    pub packet_url: Option<String>,
    #[serde(default)]
    pub items: Vec<WireAgendaItem>,
    #[serde(default)]
    pub participation: Option<WireParticipation>,
    #[serde(default)]
    pub meeting_status: Option<String>,
    #[serde(default)]
    pub vendor_body_id: Option<String>,
    #[serde(default)]
    pub metadata: Option<serde_json::Value>,
}

/// Distinguishes "adapter ran and found nothing" from "adapter failed" --
/// the Fetcher must not treat an empty result as a vendor error.
#[derive(Debug, Clone)]
pub struct FetchResult {
    pub success: bool,
    pub meetings: Vec<WireMeeting>,
    pub error: Option<String>,
    pub error_type: Option<String>,
}

impl FetchResult {
    pub fn ok(meetings: Vec<WireMeeting>) -> Self {
        Self { success: true, meetings, error: None, error_type: None }
    }

    pub fn failed(error: impl Into<String>, error_type: impl Into<String>) -> Self {
        Self { success: false, meetings: Vec::new(), error: Some(error.into()), error_type: Some(error_type.into()) }
    }
}

#[async_trait]
pub trait VendorAdapter: Send + Sync {
    fn vendor(&self) -> Vendor;

    /// The delay to wait before the first request of a city sync cycle.
    fn rate_limit_delay(&self) -> Duration {
        Duration::from_millis(self.vendor().rate_limit_delay_ms())
    }

    async fn fetch(&self, vendor_slug: &str, days_back: i64, days_forward: i64) -> FetchResult;
}

/// Stable fallback id for vendors that don't expose a native identifier:
/// a 12-hex truncation of `sha256(normalized_title + date + url_path)`.
pub fn fallback_vendor_id(title: &str, date: &DateTime<Utc>, url_path: &str) -> String {
    let normalized_title = title.trim().to_lowercase();
    crate::utils::hashing::fallback_vendor_id(&normalized_title, &date.to_rfc3339(), url_path)
}

/// Deduplicates attachment versions using a caller-supplied ordered pattern
/// list; the first pattern that matches any attachment's name wins, and the
/// highest-numbered match among those is kept. Falls back to "keep all" when
/// no pattern matches anything.
pub fn dedupe_attachment_versions(
    attachments: Vec<WireAttachment>,
    version_patterns: &[&str],
) -> Vec<WireAttachment> {
    if version_patterns.is_empty() {
        return attachments;
    }

    let mut best_version: Option<u32> = None;
    let mut versioned: Vec<(u32, WireAttachment)> = Vec::new();
    let mut unversioned = Vec::new();

    for attachment in attachments {
        let mut matched = None;
        for pattern in version_patterns {
            if let Some(idx) = attachment.name.find(pattern) {
                let digits: String = attachment.name[idx + pattern.len()..]
                    .chars()
                    .skip_while(|c| !c.is_ascii_digit())
                    .take_while(|c| c.is_ascii_digit())
                    .collect();
                if let Ok(version) = digits.parse::<u32>() {
                    matched = Some(version);
                    break;
                }
            }
        }
        match matched {
            Some(version) => {
                best_version = Some(best_version.map_or(version, |b| b.max(version)));
                versioned.push((version, attachment));
            },
            None => unversioned.push(attachment),
        }
    }

    match best_version {
        Some(best) => {
            let mut kept: Vec<WireAttachment> =
                versioned.into_iter().filter(|(v, _)| *v == best).map(|(_, a)| a).collect();
            kept.extend(unversioned);
            kept
        },
        None => unversioned,
    }
}

/// Instantiates the adapter for a city's vendor. Vendors without a concrete
/// implementation yet return `None`; callers treat that as a sync skip, not
/// an error, since it's an integration gap rather than a runtime failure.
pub fn create_adapter(vendor: Vendor) -> Option<Box<dyn VendorAdapter>> {
    match vendor {
        Vendor::Primegov => Some(Box::new(PrimegovAdapter::new())),
        Vendor::Granicus => Some(Box::new(GranicusAdapter::new())),
        Vendor::Civicplus => Some(Box::new(CivicPlusAdapter::new())),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn attachment(name: &str) -> WireAttachment {
        WireAttachment { name: name.to_string(), url: format!("https://x/{name}"), kind: "pdf".to_string(), history_id: None }
    }

    #[test]
    fn fallback_vendor_id_is_twelve_hex_chars() {
        let id = fallback_vendor_id("Budget Hearing", &Utc::now(), "/agenda/1");
        assert_eq!(id.len(), 12);
        assert!(id.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn dedupe_keeps_highest_leg_ver() {
        let attachments = vec![
            attachment("Ordinance Leg Ver1.pdf"),
            attachment("Ordinance Leg Ver3.pdf"),
            attachment("Ordinance Leg Ver2.pdf"),
            attachment("Staff Report.pdf"),
        ];
        let kept = dedupe_attachment_versions(attachments, &["Leg Ver"]);
        let names: Vec<_> = kept.iter().map(|a| a.name.as_str()).collect();
        assert!(names.contains(&"Ordinance Leg Ver3.pdf"));
        assert!(names.contains(&"Staff Report.pdf"));
        assert_eq!(names.len(), 2);
    }

    #[test]
    fn dedupe_is_noop_without_patterns() {
        let attachments = vec![attachment("a.pdf"), attachment("b.pdf")];
        assert_eq!(dedupe_attachment_versions(attachments.clone(), &[]).len(), 2);
    }
}
