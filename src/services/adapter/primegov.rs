//! PrimeGov publishes a public JSON API per city subdomain. No native vote
//! records are exposed through the endpoints this adapter uses.

use async_trait::async_trait;
use chrono::{DateTime, Duration as ChronoDuration, Utc};
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;

use super::{FetchResult, VendorAdapter, WireAgendaItem, WireAttachment, WireMeeting};
use crate::models::city::Vendor;

#[derive(Debug, Deserialize)]
struct PrimegovMeeting {
    id: i64,
    title: String,
    #[serde(rename = "dateTime")]
    date_time: String,
    #[serde(default)]
    documents: Vec<PrimegovDocument>,
}

#[derive(Debug, Deserialize)]
struct PrimegovDocument {
    #[serde(rename = "templateName")]
    template_name: String,
    #[serde(rename = "compileOutputType")]
    compile_output_type: String,
    id: i64,
}

pub struct PrimegovAdapter {
    http: Client,
}

impl PrimegovAdapter {
    pub fn new() -> Self {
        let http =
            Client::builder().timeout(Duration::from_secs(30)).connect_timeout(Duration::from_secs(10)).build().expect("failed to build primegov client");
        Self { http }
    }

    fn document_url(slug: &str, meeting_id: i64, document_id: i64) -> String {
        format!("https://{slug}.primegov.com/Portal/MeetingPrintAction/{document_id}?meetingTemplateId={meeting_id}")
    }
}

impl Default for PrimegovAdapter {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl VendorAdapter for PrimegovAdapter {
    fn vendor(&self) -> Vendor {
        Vendor::Primegov
    }

    async fn fetch(&self, vendor_slug: &str, days_back: i64, days_forward: i64) -> FetchResult {
        let url = format!("https://{vendor_slug}.primegov.com/api/v2/PublicPortal/ListUpcomingMeetings");
        let response = match self.http.get(&url).send().await {
            Ok(r) => r,
            Err(e) => return FetchResult::failed(e.to_string(), "vendor_http_error"),
        };

        if !response.status().is_success() {
            return FetchResult::failed(
                format!("primegov returned {}", response.status()),
                "vendor_http_error",
            );
        }

        let raw: Vec<PrimegovMeeting> = match response.json().await {
            Ok(v) => v,
            Err(e) => return FetchResult::failed(e.to_string(), "vendor_parse_error"),
        };

        let now = Utc::now();
        let window_start = now - ChronoDuration::days(days_back);
        let window_end = now + ChronoDuration::days(days_forward);

        let mut meetings = Vec::new();
        for raw_meeting in raw {
            let start: DateTime<Utc> = match DateTime::parse_from_rfc3339(&raw_meeting.date_time) {
                Ok(dt) => dt.with_timezone(&Utc),
                Err(_) => continue,
            };
            if start < window_start || start > window_end {
                continue;
            }

            let vendor_id = raw_meeting.id.to_string();
            let packet_url = raw_meeting
                .documents
                .iter()
                .find(|d| d.compile_output_type.eq_ignore_ascii_case("packet") || d.template_name.to_lowercase().contains("packet"))
                .map(|d| Self::document_url(vendor_slug, raw_meeting.id, d.id));
            let agenda_url = raw_meeting
                .documents
                .iter()
                .find(|d| d.template_name.to_lowercase().contains("agenda"))
                .map(|d| Self::document_url(vendor_slug, raw_meeting.id, d.id));

            let attachments: Vec<WireAttachment> = raw_meeting
                .documents
                .iter()
                .map(|d| WireAttachment {
                    name: d.template_name.clone(),
                    url: Self::document_url(vendor_slug, raw_meeting.id, d.id),
                    kind: "pdf".to_string(),
                    history_id: None,
                })
                .collect();

            let items = if attachments.is_empty() {
                Vec::new()
            } else {
                vec![WireAgendaItem {
                    vendor_item_id: None,
                    title: raw_meeting.title.clone(),
                    sequence: 0,
                    attachments,
                    matter_id: None,
                    matter_file: None,
                    matter_type: None,
                    agenda_number: None,
                    sponsors: Vec::new(),
                    votes: Vec::new(),
                    metadata: None,
                }]
            };

            meetings.push(WireMeeting {
                vendor_id,
                title: raw_meeting.title,
                start: Some(start),
                agenda_url,
                packet_url,
                items,
                participation: None,
                meeting_status: None,
                vendor_body_id: None,
                metadata: None,
            });
        }

        FetchResult::ok(meetings)
    }
}
