//! Turns a claimed queue job into a summarized meeting. Two paths branch on
//! `JobType`: item-level (one LLM call per substantive agenda item, with a
//! matter-cache short-circuit) and monolithic (one call over the whole
//! packet). Failure is isolated per item so one bad attachment never takes
//! down the rest of the meeting.

use std::sync::Arc;

use crate::models::queue::JobType;
use crate::models::{AgendaItem, Attachment};
use crate::services::llm::{ItemRequest, LlmOrchestrator};
use crate::services::metrics::MetricsSink;
use crate::services::pdf_extractor::PdfExtractor;
use crate::services::repositories::{CacheRepo, ItemRepo, MatterRepo, MeetingRepo};
use crate::services::topic_normalizer::TopicNormalizer;
use crate::utils::hashing::full_sha256_hex;

pub struct Processor {
    meeting_repo: MeetingRepo,
    item_repo: ItemRepo,
    matter_repo: MatterRepo,
    cache_repo: CacheRepo,
    pdf_extractor: Arc<dyn PdfExtractor>,
    llm: Arc<dyn LlmOrchestrator>,
    normalizer: TopicNormalizer,
    metrics: Arc<dyn MetricsSink>,
}

impl Processor {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        meeting_repo: MeetingRepo,
        item_repo: ItemRepo,
        matter_repo: MatterRepo,
        cache_repo: CacheRepo,
        pdf_extractor: Arc<dyn PdfExtractor>,
        llm: Arc<dyn LlmOrchestrator>,
        normalizer: TopicNormalizer,
        metrics: Arc<dyn MetricsSink>,
    ) -> Self {
        Self { meeting_repo, item_repo, matter_repo, cache_repo, pdf_extractor, llm, normalizer, metrics }
    }

    pub async fn process_meeting(&self, meeting_id: &str, job_type: JobType) -> Result<(), String> {
        let meeting = self
            .meeting_repo
            .get(meeting_id)
            .await
            .map_err(|e| e.to_string())?
            .ok_or_else(|| format!("meeting {meeting_id} not found"))?;

        let outcome = match job_type {
            JobType::ItemLevel => self.process_item_level(meeting_id).await,
            JobType::Monolithic => self.process_monolithic(meeting_id, meeting.packet_url.as_deref()).await,
        };

        if let Err(e) = &outcome {
            tracing::warn!(meeting_id, error = %e, "meeting processing failed");
            let _ = self.meeting_repo.mark_failed(meeting_id).await;
        }
        outcome
    }

    async fn process_item_level(&self, meeting_id: &str) -> Result<(), String> {
        let items = self.item_repo.list_for_meeting(meeting_id).await.map_err(|e| e.to_string())?;
        if items.is_empty() {
            return Err("no agenda items to summarize".to_string());
        }

        for item in &items {
            if item.is_resolved() {
                continue;
            }
            if let Err(e) = self.process_item(item).await {
                tracing::warn!(item_id = %item.id, error = %e, "item summarization failed, continuing");
            }
        }

        let remaining = self.meeting_repo.count_items_without_summary(meeting_id).await.map_err(|e| e.to_string())?;
        if remaining == 0 {
            self.meeting_repo.set_item_summary_method(meeting_id, "item_level").await.map_err(|e| e.to_string())?;
            self.meeting_repo.recompute_aggregated_topics(meeting_id).await.map_err(|e| e.to_string())?;
            Ok(())
        } else {
            Err(format!("{remaining} item(s) still missing a summary"))
        }
    }

    async fn process_item(&self, item: &AgendaItem) -> Result<(), String> {
        if let Some(matter_id) = &item.matter_id {
            if let Some(matter) = self.matter_repo.get(matter_id).await.map_err(|e| e.to_string())? {
                if matter.cache_hit_for(&item.attachment_hash) {
                    let summary = matter.canonical_summary.clone().unwrap_or_default();
                    self.item_repo
                        .set_summary(&item.id, &summary, &matter.canonical_topics.0, "matter_cache")
                        .await
                        .map_err(|e| e.to_string())?;
                    return Ok(());
                }
            }
        }

        let Some(attachment) = select_primary_attachment(&item.attachments.0) else {
            self.item_repo.mark_no_attachments(&item.id).await.map_err(|e| e.to_string())?;
            return Ok(());
        };

        let extraction = self.pdf_extractor.fetch_and_extract(&attachment.url).await;
        self.metrics.record_extraction(extraction.success, extraction.page_count);
        if !extraction.success {
            return Err(extraction.error.unwrap_or_else(|| "extraction failed".to_string()));
        }

        let request = ItemRequest { title: item.title.clone(), text: extraction.text, page_count: extraction.page_count };
        let summary = self
            .llm
            .summarize_item(&request, &self.normalizer)
            .await
            .map_err(|e| e.to_string())?;

        self.item_repo
            .set_summary(&item.id, &summary.summary_markdown, &summary.topics, "item_level")
            .await
            .map_err(|e| e.to_string())?;

        if let Some(matter_id) = &item.matter_id {
            self.matter_repo
                .set_canonical_summary(
                    matter_id,
                    &summary.summary_markdown,
                    &summary.topics,
                    &item.attachments.0,
                    &item.attachment_hash,
                )
                .await
                .map_err(|e| e.to_string())?;
        }

        Ok(())
    }

    async fn process_monolithic(&self, meeting_id: &str, packet_url: Option<&str>) -> Result<(), String> {
        let packet_url = packet_url.ok_or_else(|| "meeting has no packet_url".to_string())?;

        let start = std::time::Instant::now();
        let extraction = self.pdf_extractor.fetch_and_extract(packet_url).await;
        self.metrics.record_extraction(extraction.success, extraction.page_count);
        if !extraction.success {
            return Err(extraction.error.unwrap_or_else(|| "extraction failed".to_string()));
        }

        let content_hash = full_sha256_hex(&extraction.text);
        let summary = self
            .llm
            .summarize_monolithic(&extraction.text, extraction.page_count)
            .await
            .map_err(|e| e.to_string())?;

        let elapsed_ms = start.elapsed().as_millis() as i64;
        self.meeting_repo
            .set_monolithic_summary(meeting_id, &summary.summary_markdown, "monolithic", elapsed_ms)
            .await
            .map_err(|e| e.to_string())?;
        self.cache_repo
            .record(packet_url, &content_hash, "monolithic", elapsed_ms)
            .await
            .map_err(|e| e.to_string())?;

        Ok(())
    }
}

/// Picks the attachment to extract for a single item: the first PDF by
/// position, since attachment ordering already reflects vendor relevance.
fn select_primary_attachment(attachments: &[Attachment]) -> Option<&Attachment> {
    attachments.iter().find(|a| a.kind == "pdf").or_else(|| attachments.first())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn attachment(kind: &str) -> Attachment {
        Attachment { name: "doc".to_string(), url: "https://x/doc".to_string(), kind: kind.to_string(), history_id: None }
    }

    #[test]
    fn prefers_pdf_attachment() {
        let attachments = vec![attachment("doc"), attachment("pdf"), attachment("spreadsheet")];
        assert_eq!(select_primary_attachment(&attachments).unwrap().kind, "pdf");
    }

    #[test]
    fn falls_back_to_first_when_no_pdf() {
        let attachments = vec![attachment("doc"), attachment("spreadsheet")];
        assert_eq!(select_primary_attachment(&attachments).unwrap().kind, "doc");
    }

    #[test]
    fn empty_attachments_yield_none() {
        assert!(select_primary_attachment(&[]).is_none());
    }
}
