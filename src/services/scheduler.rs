//! The two background loops: `SyncLoopTask` walks active cities fetching new
//! meetings, `ProcessingLoopTask` drains the job queue with a bounded pool of
//! concurrent LLM workers. Both implement [`ScheduledTask`] so they plug into
//! the same executor and shutdown signal.

use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use futures::stream::{FuturesUnordered, StreamExt};

use crate::services::fetcher::Fetcher;
use crate::services::processor::Processor;
use crate::services::repositories::{CityRepo, QueueRepo};
use crate::utils::collection_ext::group_by;
use crate::utils::ScheduledTask;

pub struct SyncLoopTask {
    city_repo: CityRepo,
    fetcher: Arc<Fetcher>,
    shutdown: Arc<AtomicBool>,
}

impl SyncLoopTask {
    pub fn new(city_repo: CityRepo, fetcher: Arc<Fetcher>, shutdown: Arc<AtomicBool>) -> Self {
        Self { city_repo, fetcher, shutdown }
    }

    async fn run_once(&self) -> Result<(), anyhow::Error> {
        let cities = self.city_repo.list_active().await?;
        let by_vendor = group_by(cities, |c| c.vendor.clone());

        for (vendor, cities) in by_vendor {
            for city in cities {
                if self.shutdown.load(Ordering::Relaxed) {
                    return Ok(());
                }
                match self.fetcher.sync_city(&city).await {
                    Ok(outcome) => tracing::info!(
                        banana = %city.banana,
                        vendor,
                        seen = outcome.meetings_seen,
                        enqueued = outcome.meetings_enqueued,
                        rejected = outcome.meetings_rejected,
                        "city sync complete"
                    ),
                    Err(e) => tracing::warn!(banana = %city.banana, vendor, error = %e, "city sync failed"),
                }
            }
        }
        Ok(())
    }
}

impl ScheduledTask for SyncLoopTask {
    fn run(&self) -> Pin<Box<dyn Future<Output = Result<(), anyhow::Error>> + Send + '_>> {
        Box::pin(async move { self.run_once().await })
    }

    fn should_terminate(&self) -> bool {
        self.shutdown.load(Ordering::Relaxed)
    }
}

pub struct ProcessingLoopTask {
    queue_repo: QueueRepo,
    processor: Arc<Processor>,
    concurrency: usize,
    lease_ttl_secs: i64,
    max_retries: i32,
    shutdown: Arc<AtomicBool>,
}

impl ProcessingLoopTask {
    pub fn new(
        queue_repo: QueueRepo,
        processor: Arc<Processor>,
        concurrency: usize,
        lease_ttl_secs: i64,
        max_retries: i32,
        shutdown: Arc<AtomicBool>,
    ) -> Self {
        Self { queue_repo, processor, concurrency, lease_ttl_secs, max_retries, shutdown }
    }

    async fn run_once(&self) -> Result<(), anyhow::Error> {
        let mut in_flight = FuturesUnordered::new();

        loop {
            while in_flight.len() < self.concurrency {
                if self.shutdown.load(Ordering::Relaxed) {
                    break;
                }
                let Some(job) = self.queue_repo.claim(self.lease_ttl_secs).await? else {
                    break;
                };
                let queue_repo = self.queue_repo.clone();
                let processor = self.processor.clone();
                let max_retries = self.max_retries;
                in_flight.push(async move {
                    run_one_job(queue_repo, processor, job, max_retries).await;
                });
            }

            if in_flight.is_empty() {
                break;
            }
            in_flight.next().await;
        }

        Ok(())
    }
}

async fn run_one_job(
    queue_repo: QueueRepo,
    processor: Arc<Processor>,
    job: crate::models::QueueJob,
    max_retries: i32,
) {
    let Some(meeting_id) = job.meeting_id.clone() else {
        tracing::warn!(job_id = job.id, "job has no meeting_id, dead-lettering");
        let _ = queue_repo
            .fail(job.id, job.lease_token.as_deref().unwrap_or(""), max_retries, max_retries, "missing meeting_id")
            .await;
        return;
    };
    let Some(job_type) = job.job_type_enum() else {
        tracing::warn!(job_id = job.id, job_type = %job.job_type, "unknown job_type, dead-lettering");
        let _ = queue_repo
            .fail(job.id, job.lease_token.as_deref().unwrap_or(""), max_retries, max_retries, "unrecognized job_type")
            .await;
        return;
    };
    let lease_token = job.lease_token.clone().unwrap_or_default();

    match processor.process_meeting(&meeting_id, job_type).await {
        Ok(()) => {
            if !queue_repo.complete(job.id, &lease_token).await.unwrap_or(false) {
                tracing::warn!(job_id = job.id, meeting_id, "completed job but lease was already reclaimed");
            }
        },
        Err(e) => {
            let _ = queue_repo.fail(job.id, &lease_token, job.retry_count, max_retries, &e).await;
        },
    }
}

impl ScheduledTask for ProcessingLoopTask {
    fn run(&self) -> Pin<Box<dyn Future<Output = Result<(), anyhow::Error>> + Send + '_>> {
        Box::pin(async move { self.run_once().await })
    }

    fn should_terminate(&self) -> bool {
        self.shutdown.load(Ordering::Relaxed)
    }
}

