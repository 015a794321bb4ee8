//! LLM orchestration: model/prompt selection, reactive rate limiting,
//! truncation salvage, and batch-mode chunking with context caches.
//!
//! ```text
//! ┌────────────────────┐
//! │  LlmOrchestrator    │  ← trait: summarize_item / summarize_monolithic / batch
//! └──────────┬──────────┘
//!            │
//!            ▼
//! ┌────────────────────┐
//! │  GeminiOrchestrator │  ← retry/backoff policy, salvage, chunking
//! └──────────┬──────────┘
//!            │
//!            ▼
//! ┌────────────────────┐
//! │     LlmClient       │  ← stateless HTTP calls
//! └────────────────────┘
//! ```

mod client;
mod models;
mod scenarios;
mod service;

pub use client::LlmClient;
pub use models::{
    select_item_model, select_monolithic_model, select_thinking_budget, CallUsage, Confidence,
    ItemRequest, ItemSummaryResponse, LlmError, ModelTier, MonolithicSummaryResponse,
    ThinkingBudget,
};
pub use service::{GeminiOrchestrator, LlmOrchestrator, OrchestratorConfig};
