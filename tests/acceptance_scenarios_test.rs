//! The two end-to-end scenarios that don't need `Fetcher`'s private
//! `process_meeting` entry point (those live alongside it in
//! `src/services/fetcher.rs`'s own test module): monolithic fallback
//! processing, and queue lease expiry/reclaim.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use engagic_core::models::{JobType, Participation};
use engagic_core::services::llm::{ItemRequest, ItemSummaryResponse, LlmError, LlmOrchestrator, MonolithicSummaryResponse};
use engagic_core::services::metrics::NullMetricsSink;
use engagic_core::services::pdf_extractor::{ExtractionResult, PdfExtractor};
use engagic_core::services::repositories::{CacheRepo, ItemRepo, MatterRepo, MeetingRepo, QueueRepo};
use engagic_core::services::{Processor, TopicNormalizer};
use engagic_core::utils::hashing;
use sqlx::sqlite::SqlitePoolOptions;
use sqlx::SqlitePool;

async fn test_db() -> SqlitePool {
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .acquire_timeout(Duration::from_secs(3))
        .connect("sqlite::memory:")
        .await
        .expect("failed to open in-memory database");
    sqlx::migrate!().run(&pool).await.expect("failed to run migrations");
    pool
}

/// A packet extractor that always reports a fixed page count, standing in
/// for the real PDF pipeline.
struct FixedPdfExtractor {
    page_count: u32,
}

#[async_trait]
impl PdfExtractor for FixedPdfExtractor {
    async fn fetch(&self, _url: &str) -> Result<Vec<u8>, String> {
        Ok(vec![0u8])
    }

    async fn extract(&self, _bytes: Vec<u8>) -> ExtractionResult {
        ExtractionResult { success: true, text: "packet text".to_string(), page_count: self.page_count, error: None }
    }
}

/// Always succeeds with a canned monolithic summary; the item-level path is
/// never exercised by the monolithic scenario so it panics if reached.
struct MonolithicOnlyLlm;

#[async_trait]
impl LlmOrchestrator for MonolithicOnlyLlm {
    async fn summarize_item(
        &self,
        _request: &ItemRequest,
        _normalizer: &TopicNormalizer,
    ) -> Result<ItemSummaryResponse, LlmError> {
        unreachable!("monolithic scenario has no agenda items")
    }

    async fn summarize_monolithic(
        &self,
        _text: &str,
        _page_count: u32,
    ) -> Result<MonolithicSummaryResponse, LlmError> {
        Ok(MonolithicSummaryResponse {
            summary_markdown: "Council reviewed the full 12-page packet.".to_string(),
        })
    }

    async fn summarize_items_batch(
        &self,
        _shared_context: Option<&str>,
        _items: &[ItemRequest],
        _normalizer: &TopicNormalizer,
    ) -> Vec<Result<ItemSummaryResponse, LlmError>> {
        Vec::new()
    }
}

async fn seed_city(pool: &SqlitePool, banana: &str, vendor: &str) {
    sqlx::query(
        "INSERT INTO cities (banana, display_name, state, vendor, vendor_slug, timezone) VALUES (?, ?, 'CA', ?, ?, 'America/Los_Angeles')",
    )
    .bind(banana)
    .bind(format!("{banana} display"))
    .bind(vendor)
    .bind(banana)
    .execute(pool)
    .await
    .expect("failed to seed city");
}

#[tokio::test]
async fn scenario_5_monolithic_fallback() {
    let pool = test_db().await;
    seed_city(&pool, "civicclerkCity", "civicclerk").await;

    let meeting_repo = MeetingRepo::new(pool.clone());
    let item_repo = ItemRepo::new(pool.clone());
    let matter_repo = MatterRepo::new(pool.clone());
    let cache_repo = CacheRepo::new(pool.clone());

    let meeting_id = hashing::meeting_id("civicclerkCity", "999");
    meeting_repo
        .upsert(
            &meeting_id,
            "civicclerkCity",
            "999",
            "Council Meeting",
            None,
            None,
            Some("https://x/packet.pdf"),
            None,
            None,
            &Participation::default(),
        )
        .await
        .unwrap();

    let processor = Processor::new(
        meeting_repo.clone(),
        item_repo.clone(),
        matter_repo,
        cache_repo,
        Arc::new(FixedPdfExtractor { page_count: 12 }),
        Arc::new(MonolithicOnlyLlm),
        TopicNormalizer::new(std::env::temp_dir().join("engagic-scenario5-unknown-topics.log")),
        Arc::new(NullMetricsSink),
    );

    processor.process_meeting(&meeting_id, JobType::Monolithic).await.unwrap();

    let meeting = meeting_repo.get(&meeting_id).await.unwrap().expect("meeting exists");
    assert_eq!(meeting.processing_method.as_deref(), Some("monolithic"));
    assert_eq!(meeting.processing_status, "completed");
    assert!(meeting.summary.as_deref().unwrap().contains("12-page"));

    let items = item_repo.list_for_meeting(&meeting_id).await.unwrap();
    assert!(items.is_empty());
}

#[tokio::test]
async fn scenario_6_queue_lease_expiry_reclaims_and_old_worker_completion_is_a_no_op() {
    let pool = test_db().await;
    let queue_repo = QueueRepo::new(pool.clone());

    queue_repo
        .enqueue("https://x/packet-42.pdf", None, None, JobType::Monolithic, &serde_json::json!({}), 5)
        .await
        .unwrap();

    // Worker A claims job 42 with a short lease, then "dies" -- its lease
    // token is kept around but it never calls complete/fail in time.
    let claimed_by_a = queue_repo.claim(600).await.unwrap().expect("job claimable");
    let lease_a = claimed_by_a.lease_token.clone().unwrap();

    // Back-date `started_at` past the lease TTL to simulate worker A dying
    // 11 minutes into a 10-minute lease, without an actual 11-minute sleep.
    sqlx::query("UPDATE queue_jobs SET started_at = datetime('now', '-11 minutes') WHERE id = ?")
        .bind(claimed_by_a.id)
        .execute(&pool)
        .await
        .unwrap();

    // Worker B polls with the same 10-minute TTL; the expired lease is
    // reclaimed and re-issued a fresh lease token.
    let claimed_by_b = queue_repo.claim(600).await.unwrap().expect("expired lease is reclaimable");
    assert_eq!(claimed_by_b.id, claimed_by_a.id);
    assert_eq!(claimed_by_b.status, "processing");
    let lease_b = claimed_by_b.lease_token.clone().unwrap();
    assert_ne!(lease_a, lease_b);

    // Worker A's belated completion carries the stale lease token and must
    // be a no-op: idempotent completion is disallowed once reclaimed.
    let stale_completion = queue_repo.complete(claimed_by_a.id, &lease_a).await.unwrap();
    assert!(!stale_completion);
    assert_eq!(queue_repo.count_by_status("processing").await.unwrap(), 1);

    // Worker B's completion, carrying the current lease, succeeds.
    let real_completion = queue_repo.complete(claimed_by_b.id, &lease_b).await.unwrap();
    assert!(real_completion);
    assert_eq!(queue_repo.count_by_status("completed").await.unwrap(), 1);
}
