//! The LLM orchestrator: model/prompt/thinking-budget selection, reactive
//! 429 handling, truncation salvage, and batch-mode chunking with context
//! caches. One call in, one summary (or error) out; callers decide what to
//! do with failures.

use async_trait::async_trait;
use std::time::Duration;

use super::client::LlmClient;
use super::models::{
    select_item_model, select_monolithic_model, select_thinking_budget, CallUsage, ItemRequest,
    ItemSummaryResponse, LlmError, MonolithicSummaryResponse, ThinkingBudget,
};
use super::scenarios::{item_summary, monolithic};
use crate::services::metrics::MetricsSink;
use crate::services::topic_normalizer::TopicNormalizer;

const SINGLE_CALL_RETRY_SCHEDULE_SECS: [u64; 3] = [30, 60, 90];
const BATCH_RETRY_SCHEDULE_SECS: [u64; 3] = [60, 120, 240];
const SINGLE_CALL_RETRY_BUDGET_SECS: u64 = 180;
const CONTEXT_CACHE_TOKEN_THRESHOLD: usize = 1024;

pub struct OrchestratorConfig {
    pub use_flash_lite: bool,
    pub batch_chunk_size: usize,
    pub batch_chunk_delay: Duration,
    pub llm_call_timeout: Duration,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            use_flash_lite: false,
            batch_chunk_size: 5,
            batch_chunk_delay: Duration::from_secs(120),
            llm_call_timeout: Duration::from_secs(300),
        }
    }
}

#[async_trait]
pub trait LlmOrchestrator: Send + Sync {
    async fn summarize_item(
        &self,
        request: &ItemRequest,
        normalizer: &TopicNormalizer,
    ) -> Result<ItemSummaryResponse, LlmError>;

    async fn summarize_monolithic(
        &self,
        text: &str,
        page_count: u32,
    ) -> Result<MonolithicSummaryResponse, LlmError>;

    /// Processes items tied to one meeting in cost-tier batch mode, yielding
    /// each chunk's results as they arrive so the caller can persist
    /// incrementally rather than waiting for the whole meeting.
    async fn summarize_items_batch(
        &self,
        shared_context: Option<&str>,
        items: &[ItemRequest],
        normalizer: &TopicNormalizer,
    ) -> Vec<Result<ItemSummaryResponse, LlmError>>;
}

pub struct GeminiOrchestrator {
    client: LlmClient,
    config: OrchestratorConfig,
    metrics: std::sync::Arc<dyn MetricsSink>,
}

impl GeminiOrchestrator {
    pub fn new(
        client: LlmClient,
        config: OrchestratorConfig,
        metrics: std::sync::Arc<dyn MetricsSink>,
    ) -> Self {
        Self { client, config, metrics }
    }

    fn thinking_budget_str(budget: ThinkingBudget) -> &'static str {
        match budget {
            ThinkingBudget::Disabled => "disabled",
            ThinkingBudget::Default => "default",
            ThinkingBudget::Unbounded => "unbounded",
        }
    }

    /// Runs `call` under the reactive 429 policy: trust the provider's
    /// `retryDelay` when present, otherwise fall back to `schedule`; give up
    /// once cumulative wait time would exceed the retry budget.
    async fn with_rate_limit_retry<F, Fut, T>(
        &self,
        schedule: &[u64; 3],
        mut call: F,
    ) -> Result<T, LlmError>
    where
        F: FnMut() -> Fut,
        Fut: std::future::Future<Output = Result<T, LlmError>>,
    {
        let mut elapsed = 0u64;
        let mut attempt = 0usize;
        loop {
            match call().await {
                Ok(value) => return Ok(value),
                Err(LlmError::RateLimited(provider_delay)) => {
                    let delay = if provider_delay > 0 {
                        provider_delay
                    } else {
                        schedule.get(attempt).copied().unwrap_or(*schedule.last().unwrap())
                    };
                    if elapsed + delay > SINGLE_CALL_RETRY_BUDGET_SECS {
                        return Err(LlmError::RateLimitExhausted);
                    }
                    tracing::warn!(attempt, delay, "llm rate limited, backing off");
                    tokio::time::sleep(Duration::from_secs(delay)).await;
                    elapsed += delay;
                    attempt += 1;
                },
                Err(other) => return Err(other),
            }
        }
    }

    fn salvage_truncated(raw: &str) -> Option<ItemSummaryResponse> {
        let summary = extract_field_prefix(raw, "summary_markdown")?;
        Some(ItemSummaryResponse {
            summary_markdown: format!("{summary}\n\n_[summary truncated by the model]_"),
            citizen_impact_markdown: extract_field_prefix(raw, "citizen_impact_markdown")
                .unwrap_or_default(),
            topics: Vec::new(),
            confidence: "low".to_string(),
        })
    }
}

/// Recovers a string field's value from a possibly-truncated JSON blob by
/// scanning for `"field": "` and taking everything up to the next unescaped
/// quote or end of input.
fn extract_field_prefix(raw: &str, field: &str) -> Option<String> {
    let needle = format!("\"{field}\"");
    let start = raw.find(&needle)?;
    let after_key = &raw[start + needle.len()..];
    let colon = after_key.find(':')?;
    let after_colon = after_key[colon + 1..].trim_start();
    let quote = after_colon.strip_prefix('"')?;
    let mut out = String::new();
    let mut chars = quote.chars().peekable();
    while let Some(c) = chars.next() {
        match c {
            '\\' => {
                if let Some(next) = chars.next() {
                    out.push(next);
                }
            },
            '"' => return Some(out),
            _ => out.push(c),
        }
    }
    if out.is_empty() { None } else { Some(out) }
}

#[async_trait]
impl LlmOrchestrator for GeminiOrchestrator {
    async fn summarize_item(
        &self,
        request: &ItemRequest,
        normalizer: &TopicNormalizer,
    ) -> Result<ItemSummaryResponse, LlmError> {
        let tier =
            select_item_model(self.config.use_flash_lite, request.page_count, request.char_len());
        let thinking =
            select_thinking_budget(request.page_count, request.char_len());
        let model = tier.model_name();
        let system = item_summary::system_prompt();
        let user = item_summary::user_prompt(&request.title, &request.text);

        let start = std::time::Instant::now();
        let outcome = self
            .with_rate_limit_retry(&SINGLE_CALL_RETRY_SCHEDULE_SECS, || {
                self.client.generate_content(
                    model,
                    &system,
                    &user,
                    None,
                    Self::thinking_budget_str(thinking),
                    self.config.llm_call_timeout,
                )
            })
            .await;

        let duration = start.elapsed();
        let response = match outcome {
            Ok(generated) => generated,
            Err(e) => {
                self.metrics
                    .record_llm_call(model, "item_summary", duration, 0, 0, 0.0, false);
                return Err(e);
            },
        };

        let parsed: ItemSummaryResponse = if response.finish_reason == "MAX_TOKENS" {
            Self::salvage_truncated(&response.content).ok_or_else(|| {
                LlmError::SchemaInvalid("truncated response had no recoverable summary".into())
            })?
        } else {
            serde_json::from_str(&response.content)
                .map_err(|e| LlmError::Parse(format!("{e}: {}", response.content)))?
        };

        let mut normalized_topics = normalizer.normalize(&parsed.topics);
        if normalized_topics.is_empty() {
            normalized_topics.push("other".to_string());
        }

        let usage =
            CallUsage::new(tier, response.usage.input_tokens, response.usage.output_tokens);
        self.metrics.record_llm_call(
            model,
            "item_summary",
            duration,
            usage.input_tokens,
            usage.output_tokens,
            usage.cost_usd,
            true,
        );

        Ok(ItemSummaryResponse { topics: normalized_topics, ..parsed })
    }

    async fn summarize_monolithic(
        &self,
        text: &str,
        page_count: u32,
    ) -> Result<MonolithicSummaryResponse, LlmError> {
        let tier = select_monolithic_model(page_count);
        let model = tier.model_name();
        let system = monolithic::system_prompt(page_count);
        let user = monolithic::user_prompt(text);

        let start = std::time::Instant::now();
        let outcome = self
            .with_rate_limit_retry(&SINGLE_CALL_RETRY_SCHEDULE_SECS, || {
                self.client.generate_content(
                    model,
                    system,
                    &user,
                    None,
                    "default",
                    self.config.llm_call_timeout,
                )
            })
            .await;

        let duration = start.elapsed();
        let response = match outcome {
            Ok(r) => r,
            Err(e) => {
                self.metrics.record_llm_call(model, "monolithic", duration, 0, 0, 0.0, false);
                return Err(e);
            },
        };

        let usage =
            CallUsage::new(tier, response.usage.input_tokens, response.usage.output_tokens);
        self.metrics.record_llm_call(
            model,
            "monolithic",
            duration,
            usage.input_tokens,
            usage.output_tokens,
            usage.cost_usd,
            true,
        );

        Ok(MonolithicSummaryResponse { summary_markdown: response.content })
    }

    async fn summarize_items_batch(
        &self,
        shared_context: Option<&str>,
        items: &[ItemRequest],
        normalizer: &TopicNormalizer,
    ) -> Vec<Result<ItemSummaryResponse, LlmError>> {
        let cache_name = match shared_context {
            Some(ctx) if ctx.len() / 4 >= CONTEXT_CACHE_TOKEN_THRESHOLD => {
                match self.client.create_cache("gemini-flash", ctx, 3600).await {
                    Ok(name) => Some(name),
                    Err(e) => {
                        tracing::warn!(error = %e, "context cache creation failed, continuing without it");
                        None
                    },
                }
            },
            _ => None,
        };

        let mut results = Vec::with_capacity(items.len());
        for (chunk_idx, chunk) in items.chunks(self.config.batch_chunk_size).enumerate() {
            if chunk_idx > 0 {
                tokio::time::sleep(self.config.batch_chunk_delay).await;
            }

            for item in chunk {
                let system = item_summary::system_prompt();
                let user = item_summary::user_prompt(&item.title, &item.text);
                let model = "gemini-flash";

                let outcome = self
                    .with_rate_limit_retry(&BATCH_RETRY_SCHEDULE_SECS, || {
                        self.client.generate_content(
                            model,
                            &system,
                            &user,
                            cache_name.as_deref(),
                            "default",
                            self.config.llm_call_timeout,
                        )
                    })
                    .await;

                results.push(outcome.and_then(|r| {
                    let parsed: ItemSummaryResponse = serde_json::from_str(&r.content)
                        .map_err(|e| LlmError::Parse(format!("{e}: {}", r.content)))?;
                    let mut topics = normalizer.normalize(&parsed.topics);
                    if topics.is_empty() {
                        topics.push("other".to_string());
                    }
                    Ok(ItemSummaryResponse { topics, ..parsed })
                }));
            }
        }

        if let Some(name) = cache_name {
            self.client.delete_cache(&name).await;
        }

        results
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn salvages_summary_from_truncated_json() {
        let raw = r#"{"summary_markdown": "the council approved the budget amendment", "citizen"#;
        let salvaged = GeminiOrchestrator::salvage_truncated(raw).unwrap();
        assert!(salvaged.summary_markdown.starts_with("the council approved"));
        assert!(salvaged.summary_markdown.contains("truncated"));
    }

    #[test]
    fn no_salvage_without_summary_field() {
        let raw = r#"{"citizen_impact_markdown": "none"#;
        assert!(GeminiOrchestrator::salvage_truncated(raw).is_none());
    }

    fn orchestrator() -> GeminiOrchestrator {
        GeminiOrchestrator::new(
            LlmClient::new("https://example.invalid", "test-key"),
            OrchestratorConfig::default(),
            std::sync::Arc::new(crate::services::metrics::NullMetricsSink),
        )
    }

    // These exercise the retry/backoff policy directly against a fake
    // `call` closure rather than a live API, since `LlmClient` has no
    // HTTP-mocking seam in this crate's dependency stack. The provider
    // hitting a real 429/truncated-response case is what Scenario 3 and 4
    // describe; this covers the same retry-budget and schedule-selection
    // logic those scenarios exercise.

    #[tokio::test]
    async fn retries_on_rate_limit_then_succeeds() {
        let orchestrator = orchestrator();
        let attempts = AtomicUsize::new(0);
        let result = orchestrator
            .with_rate_limit_retry(&[0, 0, 0], || {
                let attempt = attempts.fetch_add(1, Ordering::SeqCst);
                async move {
                    if attempt < 2 {
                        Err(LlmError::RateLimited(0))
                    } else {
                        Ok(42)
                    }
                }
            })
            .await;
        assert_eq!(result.unwrap(), 42);
        assert_eq!(attempts.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn gives_up_once_retry_budget_is_exhausted() {
        let orchestrator = orchestrator();
        let attempts = AtomicUsize::new(0);
        // A 90s schedule step immediately exceeds the 180s budget after two
        // rounds (90 + 90 = 180, not > 180; the third would push it over),
        // so this should exhaust rather than retry forever.
        let result: Result<(), LlmError> = orchestrator
            .with_rate_limit_retry(&[90, 90, 90], || {
                attempts.fetch_add(1, Ordering::SeqCst);
                async { Err(LlmError::RateLimited(0)) }
            })
            .await;
        assert!(matches!(result, Err(LlmError::RateLimitExhausted)));
        assert_eq!(attempts.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn non_rate_limit_errors_short_circuit_without_retrying() {
        let orchestrator = orchestrator();
        let attempts = AtomicUsize::new(0);
        let result: Result<(), LlmError> = orchestrator
            .with_rate_limit_retry(&SINGLE_CALL_RETRY_SCHEDULE_SECS, || {
                attempts.fetch_add(1, Ordering::SeqCst);
                async { Err(LlmError::Api("bad request".to_string())) }
            })
            .await;
        assert!(matches!(result, Err(LlmError::Api(_))));
        assert_eq!(attempts.load(Ordering::SeqCst), 1);
    }
}
