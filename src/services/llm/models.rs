//! Data structures that cross the LLM orchestration boundary: model tiers,
//! requests/responses for the two call shapes (per-item, monolithic), and
//! the cost/usage figures the metrics sink records.

use serde::{Deserialize, Serialize};

/// Model tiers the orchestrator selects between, cheapest first.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModelTier {
    FlashLite,
    Flash,
    Pro,
}

impl ModelTier {
    pub fn model_name(&self) -> &'static str {
        match self {
            Self::FlashLite => "gemini-flash-lite",
            Self::Flash => "gemini-flash",
            Self::Pro => "gemini-pro",
        }
    }

    /// Per-million-token (input, output) dollar pricing used for cost accounting.
    pub fn pricing_per_million(&self) -> (f64, f64) {
        match self {
            Self::FlashLite => (0.0375, 0.15),
            Self::Flash => (0.075, 0.30),
            Self::Pro => (1.25, 5.00),
        }
    }
}

/// Extended-reasoning allowance for a call, keyed off item complexity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ThinkingBudget {
    Disabled,
    Default,
    Unbounded,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Confidence {
    High,
    Medium,
    Low,
}

impl Confidence {
    pub fn parse(s: &str) -> Self {
        match s.to_ascii_lowercase().as_str() {
            "high" => Self::High,
            "low" => Self::Low,
            _ => Self::Medium,
        }
    }
}

/// A single agenda item's extracted text, as assembled by the processor.
#[derive(Debug, Clone)]
pub struct ItemRequest {
    pub title: String,
    pub text: String,
    pub page_count: u32,
}

impl ItemRequest {
    pub fn char_len(&self) -> usize {
        self.text.len()
    }
}

/// Parsed result of the unified item prompt.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ItemSummaryResponse {
    pub summary_markdown: String,
    pub citizen_impact_markdown: String,
    pub topics: Vec<String>,
    pub confidence: String,
}

/// Parsed result of a monolithic meeting-packet summary call.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct MonolithicSummaryResponse {
    pub summary_markdown: String,
}

/// Token usage and derived cost for a single completed call.
#[derive(Debug, Clone, Copy)]
pub struct CallUsage {
    pub input_tokens: u32,
    pub output_tokens: u32,
    pub cost_usd: f64,
}

impl CallUsage {
    pub fn new(tier: ModelTier, input_tokens: u32, output_tokens: u32) -> Self {
        let (in_price, out_price) = tier.pricing_per_million();
        let cost_usd = (input_tokens as f64 / 1_000_000.0) * in_price
            + (output_tokens as f64 / 1_000_000.0) * out_price;
        Self { input_tokens, output_tokens, cost_usd }
    }
}

/// Errors surfaced by the orchestrator and its client.
#[derive(Debug, thiserror::Error)]
pub enum LlmError {
    #[error("llm api error: {0}")]
    Api(String),

    #[error("llm response parse error: {0}")]
    Parse(String),

    #[error("llm call timed out after {0}s")]
    Timeout(u64),

    #[error("llm rate limited, retry after {0}s")]
    RateLimited(u64),

    #[error("rate limit retry budget exhausted")]
    RateLimitExhausted,

    #[error("llm response rejected: {0}")]
    SchemaInvalid(String),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl LlmError {
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Timeout(_) | Self::RateLimited(_))
    }
}

/// Selects the model tier for a per-item call.
///
/// Mirrors the thresholds spelled out for item summarization: Flash-Lite is
/// only eligible when it's explicitly enabled and the packet is small; Pro is
/// reserved for large packets, regardless of the flag.
pub fn select_item_model(use_flash_lite: bool, page_count: u32, text_len: usize) -> ModelTier {
    if page_count >= 100 {
        return ModelTier::Pro;
    }
    if use_flash_lite && page_count <= 50 && text_len < 200_000 {
        return ModelTier::FlashLite;
    }
    ModelTier::Flash
}

/// Selects the model tier for a monolithic meeting-packet call.
pub fn select_monolithic_model(page_count: u32) -> ModelTier {
    if page_count >= 100 { ModelTier::Pro } else { ModelTier::Flash }
}

/// Selects the thinking budget for a per-item call.
pub fn select_thinking_budget(page_count: u32, char_len: usize) -> ThinkingBudget {
    if page_count <= 10 && char_len <= 30_000 {
        ThinkingBudget::Disabled
    } else if page_count >= 100 {
        ThinkingBudget::Unbounded
    } else {
        ThinkingBudget::Default
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flash_lite_requires_both_small_pages_and_small_text() {
        assert_eq!(select_item_model(true, 20, 1_000), ModelTier::FlashLite);
        assert_eq!(select_item_model(true, 60, 1_000), ModelTier::Flash);
        assert_eq!(select_item_model(true, 20, 250_000), ModelTier::Flash);
        assert_eq!(select_item_model(false, 20, 1_000), ModelTier::Flash);
    }

    #[test]
    fn large_packets_always_use_pro() {
        assert_eq!(select_item_model(true, 150, 10), ModelTier::Pro);
    }

    #[test]
    fn thinking_budget_tiers() {
        assert_eq!(select_thinking_budget(5, 1_000), ThinkingBudget::Disabled);
        assert_eq!(select_thinking_budget(50, 50_000), ThinkingBudget::Default);
        assert_eq!(select_thinking_budget(120, 50_000), ThinkingBudget::Unbounded);
    }
}
