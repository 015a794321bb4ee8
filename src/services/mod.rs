pub mod adapter;
pub mod fetcher;
pub mod llm;
pub mod metrics;
pub mod pdf_extractor;
pub mod processor;
pub mod repositories;
pub mod scheduler;
pub mod topic_normalizer;

pub use fetcher::{Fetcher, FetcherConfig, SyncOutcome};
pub use llm::{GeminiOrchestrator, LlmClient, LlmOrchestrator, OrchestratorConfig};
pub use metrics::{MetricsSink, NullMetricsSink, TracingMetricsSink};
pub use pdf_extractor::{HttpPdfExtractor, PdfExtractor};
pub use processor::Processor;
pub use scheduler::{ProcessingLoopTask, SyncLoopTask};
pub use topic_normalizer::TopicNormalizer;
