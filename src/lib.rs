//! Core library for ingesting civic meeting agendas, deduplicating
//! legislative matters across meetings, and summarizing them with an LLM.

use std::sync::Arc;

use sqlx::SqlitePool;

pub mod config;
pub mod models;
pub mod services;
pub mod utils;

pub use config::Config;
pub use services::{Fetcher, GeminiOrchestrator, LlmClient, MetricsSink, Processor};

use services::repositories::{
    AppearanceRepo, CacheRepo, CityRepo, CommitteeRepo, CouncilRepo, ItemRepo, MatterRepo,
    MeetingRepo, QueueRepo, VoteRepo,
};
use services::{FetcherConfig, HttpPdfExtractor, OrchestratorConfig, TopicNormalizer};

/// Everything a subcommand needs, built once at startup from a `Config` and
/// a connected pool. Repositories are cheap to clone (they just hold the
/// pool), so `Context` itself derives `Clone`.
#[derive(Clone)]
pub struct Context {
    pub db: SqlitePool,

    pub city_repo: CityRepo,
    pub meeting_repo: MeetingRepo,
    pub item_repo: ItemRepo,
    pub matter_repo: MatterRepo,
    pub appearance_repo: AppearanceRepo,
    pub committee_repo: CommitteeRepo,
    pub council_repo: CouncilRepo,
    pub vote_repo: VoteRepo,
    pub queue_repo: QueueRepo,
    pub cache_repo: CacheRepo,

    pub fetcher: Arc<Fetcher>,
    pub processor: Arc<Processor>,

    pub metrics: Arc<dyn MetricsSink>,
}

impl Context {
    pub fn new(db: SqlitePool, config: &Config, metrics: Arc<dyn MetricsSink>) -> Self {
        let city_repo = CityRepo::new(db.clone());
        let meeting_repo = MeetingRepo::new(db.clone());
        let item_repo = ItemRepo::new(db.clone());
        let matter_repo = MatterRepo::new(db.clone());
        let appearance_repo = AppearanceRepo::new(db.clone());
        let committee_repo = CommitteeRepo::new(db.clone());
        let council_repo = CouncilRepo::new(db.clone());
        let vote_repo = VoteRepo::new(db.clone());
        let queue_repo = QueueRepo::new(db.clone());
        let cache_repo = CacheRepo::new(db.clone());

        let fetcher_config = FetcherConfig {
            historical_cutoff_days: config.sync.historical_cutoff_days,
            future_cutoff_days: config.sync.future_cutoff_days,
        };
        let fetcher = Arc::new(Fetcher::new(
            fetcher_config,
            meeting_repo.clone(),
            item_repo.clone(),
            matter_repo.clone(),
            appearance_repo.clone(),
            committee_repo.clone(),
            council_repo.clone(),
            vote_repo.clone(),
            queue_repo.clone(),
            metrics.clone(),
        ));

        let llm_client = LlmClient::new(config.llm.api_base.clone(), config.llm.api_key.clone());
        let orchestrator_config = OrchestratorConfig {
            use_flash_lite: config.processing.use_flash_lite,
            batch_chunk_size: config.processing.batch_chunk_size,
            batch_chunk_delay: std::time::Duration::from_secs(config.processing.batch_chunk_delay_secs),
            llm_call_timeout: std::time::Duration::from_secs(config.processing.llm_call_timeout_secs),
        };
        let orchestrator =
            Arc::new(GeminiOrchestrator::new(llm_client, orchestrator_config, metrics.clone()));
        let pdf_extractor = Arc::new(HttpPdfExtractor::new());
        let normalizer = TopicNormalizer::new("data/unknown_topics.log");

        let processor = Arc::new(Processor::new(
            meeting_repo.clone(),
            item_repo.clone(),
            matter_repo.clone(),
            cache_repo.clone(),
            pdf_extractor,
            orchestrator,
            normalizer,
            metrics.clone(),
        ));

        Self {
            db,
            city_repo,
            meeting_repo,
            item_repo,
            matter_repo,
            appearance_repo,
            committee_repo,
            council_repo,
            vote_repo,
            queue_repo,
            cache_repo,
            fetcher,
            processor,
            metrics,
        }
    }
}
