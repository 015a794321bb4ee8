//! End-to-end exercises of the repository layer against a migrated
//! in-memory database, following the same create-pool-then-migrate
//! pattern used for every service's unit tests.

use std::time::Duration;

use engagic_core::models::{JobType, Participation};
use engagic_core::services::repositories::{
    AppearanceRepo, CacheRepo, CityRepo, CommitteeRepo, CouncilRepo, ItemRepo, MatterRepo,
    MeetingRepo, QueueRepo, VoteRepo,
};
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

async fn seed_city(pool: &SqlitePool, banana: &str) {
    sqlx::query(
        r#"
        INSERT INTO cities (banana, display_name, state, vendor, vendor_slug, timezone)
        VALUES (?, ?, 'CA', 'primegov', ?, 'America/Los_Angeles')
        "#,
    )
    .bind(banana)
    .bind(format!("{banana} display"))
    .bind(banana)
    .execute(pool)
    .await
    .expect("failed to seed city");
}

#[tokio::test]
async fn city_repo_round_trips_seeded_rows() {
    let pool = test_db().await;
    seed_city(&pool, "ca_testburg").await;

    let city_repo = CityRepo::new(pool.clone());
    let fetched = city_repo.get("ca_testburg").await.unwrap().expect("city should exist");
    assert_eq!(fetched.display_name, "ca_testburg display");

    let active = city_repo.list_active().await.unwrap();
    assert_eq!(active.len(), 1);
    assert!(city_repo.get("ca_nowhere").await.unwrap().is_none());
}

#[tokio::test]
async fn meeting_upsert_attaches_a_derived_committee() {
    let pool = test_db().await;
    seed_city(&pool, "ca_testburg").await;

    let meeting_repo = MeetingRepo::new(pool.clone());
    let committee_repo = CommitteeRepo::new(pool.clone());

    let meeting_id = hashing::meeting_id("ca_testburg", "vendor-42");
    let committee_id = hashing::committee_id("ca_testburg", "planning commission");
    committee_repo
        .upsert(&committee_id, "ca_testburg", "Planning Commission", "planning commission")
        .await
        .unwrap();

    meeting_repo
        .upsert(
            &meeting_id,
            "ca_testburg",
            "vendor-42",
            "Regular Meeting",
            None,
            None,
            None,
            None,
            Some(&committee_id),
            &Participation::default(),
        )
        .await
        .unwrap();

    let row: (Option<String>,) =
        sqlx::query_as("SELECT committee_id FROM meetings WHERE id = ?")
            .bind(&meeting_id)
            .fetch_one(&pool)
            .await
            .unwrap();
    assert_eq!(row.0.as_deref(), Some(committee_id.as_str()));

    let committee = committee_repo.get(&committee_id).await.unwrap().expect("committee exists");
    assert_eq!(committee.display_name, "Planning Commission");
}

#[tokio::test]
async fn meeting_upsert_does_not_clobber_processing_state_on_resync() {
    let pool = test_db().await;
    seed_city(&pool, "ca_testburg").await;
    let meeting_repo = MeetingRepo::new(pool.clone());
    let meeting_id = hashing::meeting_id("ca_testburg", "vendor-42");

    meeting_repo
        .upsert(
            &meeting_id,
            "ca_testburg",
            "vendor-42",
            "Regular Meeting",
            None,
            None,
            None,
            None,
            None,
            &Participation::default(),
        )
        .await
        .unwrap();
    meeting_repo.set_monolithic_summary(&meeting_id, "summary text", "monolithic", 1200).await.unwrap();

    // A re-fetch with a changed title must not reset processing_status or summary.
    meeting_repo
        .upsert(
            &meeting_id,
            "ca_testburg",
            "vendor-42",
            "Regular Meeting (Revised)",
            None,
            None,
            None,
            None,
            None,
            &Participation::default(),
        )
        .await
        .unwrap();

    let meeting = meeting_repo.get(&meeting_id).await.unwrap().expect("meeting exists");
    assert_eq!(meeting.title, "Regular Meeting (Revised)");
    assert_eq!(meeting.summary.as_deref(), Some("summary text"));
    assert_eq!(meeting.processing_status, "completed");
}

#[tokio::test]
async fn matter_appearance_count_increments_across_repeated_upserts() {
    let pool = test_db().await;
    seed_city(&pool, "ca_testburg").await;
    let matter_repo = MatterRepo::new(pool.clone());
    let matter_id = hashing::matter_id("ca_testburg", "ord-2026-01");

    matter_repo
        .upsert_appearance(&matter_id, "ca_testburg", Some("ORD-2026-01"), Some("ordinance"), "Noise Ordinance", &[])
        .await
        .unwrap();
    matter_repo
        .upsert_appearance(&matter_id, "ca_testburg", Some("ORD-2026-01"), Some("ordinance"), "Noise Ordinance", &[])
        .await
        .unwrap();

    let matter = matter_repo.get(&matter_id).await.unwrap().expect("matter exists");
    assert_eq!(matter.appearance_count, 2);
    assert!(matter.canonical_summary.is_none());
}

#[tokio::test]
async fn queue_claim_is_exclusive_and_lease_scoped_completion() {
    let pool = test_db().await;
    seed_city(&pool, "ca_testburg").await;
    let queue_repo = QueueRepo::new(pool.clone());

    queue_repo
        .enqueue("https://x/packet.pdf", None, Some("ca_testburg"), JobType::Monolithic, &serde_json::json!({}), 5)
        .await
        .unwrap();

    let claimed = queue_repo.claim(600).await.unwrap().expect("job should be claimable");
    assert_eq!(claimed.source_url, "https://x/packet.pdf");

    // Nothing else is pending, so a second claim within the lease window finds nothing.
    assert!(queue_repo.claim(600).await.unwrap().is_none());

    let lease_token = claimed.lease_token.clone().expect("claimed job carries a lease token");
    let completed_with_stale_lease = queue_repo.complete(claimed.id, "not-the-real-token").await.unwrap();
    assert!(!completed_with_stale_lease);

    let completed = queue_repo.complete(claimed.id, &lease_token).await.unwrap();
    assert!(completed);
    assert_eq!(queue_repo.count_by_status("completed").await.unwrap(), 1);
    assert!(queue_repo.has_completed_job("https://x/packet.pdf").await.unwrap());
}

#[tokio::test]
async fn queue_fail_retries_then_dead_letters() {
    let pool = test_db().await;
    let queue_repo = QueueRepo::new(pool.clone());
    queue_repo
        .enqueue("https://x/a.pdf", None, None, JobType::ItemLevel, &serde_json::json!({}), 0)
        .await
        .unwrap();
    let job = queue_repo.claim(600).await.unwrap().unwrap();
    let lease = job.lease_token.clone().unwrap();

    // max_retries = 2: first failure retries (back to pending), second dead-letters.
    assert!(queue_repo.fail(job.id, &lease, 0, 2, "boom").await.unwrap());
    assert_eq!(queue_repo.count_by_status("pending").await.unwrap(), 1);

    let job = queue_repo.claim(600).await.unwrap().unwrap();
    let lease = job.lease_token.clone().unwrap();
    assert!(queue_repo.fail(job.id, &lease, 1, 2, "boom again").await.unwrap());
    assert_eq!(queue_repo.count_by_status("dead_letter").await.unwrap(), 1);
}

#[tokio::test]
async fn votes_are_unique_per_member_matter_meeting() {
    let pool = test_db().await;
    seed_city(&pool, "ca_testburg").await;
    let council_repo = CouncilRepo::new(pool.clone());
    let matter_repo = MatterRepo::new(pool.clone());
    let vote_repo = VoteRepo::new(pool.clone());

    let matter_id = hashing::matter_id("ca_testburg", "ord-1");
    matter_repo.upsert_appearance(&matter_id, "ca_testburg", None, None, "Ordinance One", &[]).await.unwrap();
    let member_id = hashing::council_member_id("ca_testburg", "jane doe");
    council_repo.upsert(&member_id, "ca_testburg", "Jane Doe", "jane doe").await.unwrap();

    vote_repo.record(&member_id, &matter_id, "meeting-1", "yes", Some(1)).await.unwrap();
    // Re-recording the same triple updates the value rather than erroring.
    vote_repo.record(&member_id, &matter_id, "meeting-1", "no", Some(2)).await.unwrap();

    let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM votes")
        .fetch_one(&pool)
        .await
        .unwrap();
    assert_eq!(count, 1);

    let (value,): (String,) = sqlx::query_as("SELECT value FROM votes WHERE council_member_id = ?")
        .bind(&member_id)
        .fetch_one(&pool)
        .await
        .unwrap();
    assert_eq!(value, "no");
}

#[tokio::test]
async fn appearance_link_is_idempotent() {
    let pool = test_db().await;
    seed_city(&pool, "ca_testburg").await;
    let matter_repo = MatterRepo::new(pool.clone());
    let meeting_repo = MeetingRepo::new(pool.clone());
    let item_repo = ItemRepo::new(pool.clone());
    let appearance_repo = AppearanceRepo::new(pool.clone());

    let meeting_id = hashing::meeting_id("ca_testburg", "vendor-1");
    meeting_repo
        .upsert(&meeting_id, "ca_testburg", "vendor-1", "Meeting", None, None, None, None, None, &Participation::default())
        .await
        .unwrap();
    let matter_id = hashing::matter_id("ca_testburg", "item-1");
    matter_repo.upsert_appearance(&matter_id, "ca_testburg", None, None, "Item One", &[]).await.unwrap();
    let item_id = hashing::item_id(&meeting_id, 1, "Item One");
    item_repo
        .upsert(&item_id, &meeting_id, "Item One", 1, &[], "hash", Some(&matter_id), None, None, None, &[])
        .await
        .unwrap();

    appearance_repo.link(&matter_id, &meeting_id, &item_id, 1).await.unwrap();
    appearance_repo.link(&matter_id, &meeting_id, &item_id, 1).await.unwrap();

    let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM matter_appearances")
        .fetch_one(&pool)
        .await
        .unwrap();
    assert_eq!(count, 1);
}

#[tokio::test]
async fn processing_cache_tracks_hits() {
    let pool = test_db().await;
    let cache_repo = CacheRepo::new(pool.clone());
    cache_repo.record("https://x/packet.pdf", "abc123", "pymupdf_gemini", 4200).await.unwrap();
    cache_repo.record_hit("https://x/packet.pdf").await.unwrap();
    cache_repo.record_hit("https://x/packet.pdf").await.unwrap();

    let entry = cache_repo.get("https://x/packet.pdf").await.unwrap().expect("entry exists");
    assert_eq!(entry.hit_count, 2);
    assert_eq!(entry.content_hash, "abc123");
}
