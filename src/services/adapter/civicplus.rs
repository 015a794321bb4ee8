//! CivicPlus (Agenda Center) publishes a per-city JSON document listing.
//! Its rate limit needs extra jitter on top of the base delay (see
//! [`Vendor::jitter_ms`]) because its shared hosting is more prone to
//! throttling bursts of identical requests.

use async_trait::async_trait;
use chrono::{DateTime, Duration as ChronoDuration, NaiveDate, Utc};
use rand::Rng;
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;

use super::{fallback_vendor_id, FetchResult, VendorAdapter, WireAttachment, WireMeeting};
use crate::models::city::Vendor;

#[derive(Debug, Deserialize)]
struct CivicPlusDocument {
    #[serde(rename = "CategoryName")]
    category_name: String,
    #[serde(rename = "MeetingDate")]
    meeting_date: String,
    #[serde(rename = "DocumentURL")]
    document_url: String,
    #[serde(rename = "DocumentTypeName", default)]
    document_type_name: Option<String>,
}

pub struct CivicPlusAdapter {
    http: Client,
}

impl CivicPlusAdapter {
    pub fn new() -> Self {
        let http = Client::builder()
            .timeout(Duration::from_secs(30))
            .connect_timeout(Duration::from_secs(10))
            .build()
            .expect("failed to build civicplus client");
        Self { http }
    }
}

impl Default for CivicPlusAdapter {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl VendorAdapter for CivicPlusAdapter {
    fn vendor(&self) -> Vendor {
        Vendor::Civicplus
    }

    fn rate_limit_delay(&self) -> Duration {
        let base = Vendor::Civicplus.rate_limit_delay_ms();
        let jitter: u64 = rand::thread_rng().gen_range(0..=Vendor::Civicplus.jitter_ms());
        Duration::from_millis(base + jitter)
    }

    async fn fetch(&self, vendor_slug: &str, days_back: i64, days_forward: i64) -> FetchResult {
        let url = format!("https://{vendor_slug}.civicplus.com/AgendaCenter/api/documents");
        let response = match self.http.get(&url).send().await {
            Ok(r) => r,
            Err(e) => return FetchResult::failed(e.to_string(), "vendor_http_error"),
        };

        if !response.status().is_success() {
            return FetchResult::failed(
                format!("civicplus returned {}", response.status()),
                "vendor_http_error",
            );
        }

        let documents: Vec<CivicPlusDocument> = match response.json().await {
            Ok(v) => v,
            Err(e) => return FetchResult::failed(e.to_string(), "vendor_parse_error"),
        };

        let now = Utc::now();
        let window_start = now - ChronoDuration::days(days_back);
        let window_end = now + ChronoDuration::days(days_forward);

        // Group documents by (category, date) since CivicPlus exposes one row per
        // document rather than one row per meeting.
        use std::collections::HashMap;
        let mut grouped: HashMap<(String, String), Vec<CivicPlusDocument>> = HashMap::new();
        for doc in documents {
            grouped
                .entry((doc.category_name.clone(), doc.meeting_date.clone()))
                .or_default()
                .push(doc);
        }

        let mut meetings = Vec::new();
        for ((category, date_str), docs) in grouped {
            let Some(start) = parse_meeting_date(&date_str) else { continue };
            if start < window_start || start > window_end {
                continue;
            }

            let url_path = docs.first().map(|d| d.document_url.clone()).unwrap_or_default();
            let vendor_id = fallback_vendor_id(&category, &start, &url_path);

            let attachments: Vec<WireAttachment> = docs
                .iter()
                .map(|d| WireAttachment {
                    name: d.document_type_name.clone().unwrap_or_else(|| "Document".to_string()),
                    url: d.document_url.clone(),
                    kind: "pdf".to_string(),
                    history_id: None,
                })
                .collect();

            let packet_url = docs
                .iter()
                .find(|d| {
                    d.document_type_name.as_deref().map(|n| n.to_lowercase().contains("packet")).unwrap_or(false)
                })
                .or_else(|| docs.first())
                .map(|d| d.document_url.clone());

            meetings.push(WireMeeting {
                vendor_id,
                title: category,
                start: Some(start),
                agenda_url: packet_url.clone(),
                packet_url,
                items: Vec::new(),
                participation: None,
                meeting_status: None,
                vendor_body_id: None,
                metadata: serde_json::to_value(&attachments).ok(),
            });
        }

        FetchResult::ok(meetings)
    }
}

fn parse_meeting_date(raw: &str) -> Option<DateTime<Utc>> {
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .or_else(|_| NaiveDate::parse_from_str(raw, "%m/%d/%Y"))
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|dt| dt.and_utc())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_iso_and_slash_dates() {
        assert!(parse_meeting_date("2026-03-05").is_some());
        assert!(parse_meeting_date("03/05/2026").is_some());
        assert!(parse_meeting_date("not-a-date").is_none());
    }
}
