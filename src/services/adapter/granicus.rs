//! Granicus exposes a per-city InSite JSON meetings listing. It has no
//! native per-meeting numeric id, so this adapter falls back to the
//! content-derived hash id.

use async_trait::async_trait;
use chrono::{DateTime, Duration as ChronoDuration, Utc};
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;

use super::{fallback_vendor_id, FetchResult, VendorAdapter, WireAttachment, WireMeeting};
use crate::models::city::Vendor;

#[derive(Debug, Deserialize)]
struct GranicusMeeting {
    name: String,
    date: String,
    #[serde(default)]
    duration: Option<String>,
    #[serde(rename = "agendaFile", default)]
    agenda_file: Option<String>,
    #[serde(rename = "minutesFile", default)]
    minutes_file: Option<String>,
}

pub struct GranicusAdapter {
    http: Client,
}

impl GranicusAdapter {
    pub fn new() -> Self {
        let http = Client::builder()
            .timeout(Duration::from_secs(30))
            .connect_timeout(Duration::from_secs(10))
            .build()
            .expect("failed to build granicus client");
        Self { http }
    }

    fn parse_start(date: &str, duration: Option<&str>) -> Option<DateTime<Utc>> {
        let combined = match duration {
            Some(d) => format!("{date} {d}"),
            None => date.to_string(),
        };
        DateTime::parse_from_rfc3339(&combined)
            .or_else(|_| DateTime::parse_from_rfc3339(date))
            .map(|dt| dt.with_timezone(&Utc))
            .ok()
    }
}

impl Default for GranicusAdapter {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl VendorAdapter for GranicusAdapter {
    fn vendor(&self) -> Vendor {
        Vendor::Granicus
    }

    async fn fetch(&self, vendor_slug: &str, days_back: i64, days_forward: i64) -> FetchResult {
        let url = format!("https://{vendor_slug}.granicus.com/InSiteViewPublisher/api/meetings");
        let response = match self.http.get(&url).send().await {
            Ok(r) => r,
            Err(e) => return FetchResult::failed(e.to_string(), "vendor_http_error"),
        };

        if !response.status().is_success() {
            return FetchResult::failed(
                format!("granicus returned {}", response.status()),
                "vendor_http_error",
            );
        }

        let raw: Vec<GranicusMeeting> = match response.json().await {
            Ok(v) => v,
            Err(e) => return FetchResult::failed(e.to_string(), "vendor_parse_error"),
        };

        let now = Utc::now();
        let window_start = now - ChronoDuration::days(days_back);
        let window_end = now + ChronoDuration::days(days_forward);

        let mut meetings = Vec::new();
        for raw_meeting in raw {
            let Some(start) = Self::parse_start(&raw_meeting.date, raw_meeting.duration.as_deref())
            else {
                continue;
            };
            if start < window_start || start > window_end {
                continue;
            }

            let url_path = raw_meeting
                .agenda_file
                .clone()
                .or_else(|| raw_meeting.minutes_file.clone())
                .unwrap_or_default();
            let vendor_id = fallback_vendor_id(&raw_meeting.name, &start, &url_path);

            let mut attachments = Vec::new();
            if let Some(agenda) = &raw_meeting.agenda_file {
                attachments.push(WireAttachment {
                    name: "Agenda".to_string(),
                    url: agenda.clone(),
                    kind: "pdf".to_string(),
                    history_id: None,
                });
            }
            if let Some(minutes) = &raw_meeting.minutes_file {
                attachments.push(WireAttachment {
                    name: "Minutes".to_string(),
                    url: minutes.clone(),
                    kind: "pdf".to_string(),
                    history_id: None,
                });
            }

            meetings.push(WireMeeting {
                vendor_id,
                title: raw_meeting.name,
                start: Some(start),
                agenda_url: raw_meeting.agenda_file,
                packet_url: raw_meeting.minutes_file,
                items: Vec::new(),
                participation: None,
                meeting_status: None,
                vendor_body_id: None,
                metadata: (!attachments.is_empty())
                    .then(|| serde_json::to_value(&attachments).ok())
                    .flatten(),
            });
        }

        FetchResult::ok(meetings)
    }
}
