//! Narrow telemetry protocol. Core code depends only on [`MetricsSink`], so
//! it runs unmodified whether or not a real telemetry backend is wired up.

use std::time::Duration;

pub trait MetricsSink: Send + Sync {
    fn record_sync(&self, vendor: &str, banana: &str, ok: bool, duration: Duration);

    fn record_llm_call(
        &self,
        model: &str,
        prompt_type: &str,
        duration: Duration,
        input_tokens: u32,
        output_tokens: u32,
        cost_usd: f64,
        ok: bool,
    );

    fn record_queue_depth(&self, status: &str, count: i64);

    fn record_extraction(&self, ok: bool, pages: u32);
}

/// No-op sink so the core can run without a telemetry system wired up.
pub struct NullMetricsSink;

impl MetricsSink for NullMetricsSink {
    fn record_sync(&self, _vendor: &str, _banana: &str, _ok: bool, _duration: Duration) {}

    fn record_llm_call(
        &self,
        _model: &str,
        _prompt_type: &str,
        _duration: Duration,
        _input_tokens: u32,
        _output_tokens: u32,
        _cost_usd: f64,
        _ok: bool,
    ) {
    }

    fn record_queue_depth(&self, _status: &str, _count: i64) {}

    fn record_extraction(&self, _ok: bool, _pages: u32) {}
}

/// Logs every call through `tracing` at debug level. Useful for local runs
/// where a full metrics backend isn't worth standing up.
pub struct TracingMetricsSink;

impl MetricsSink for TracingMetricsSink {
    fn record_sync(&self, vendor: &str, banana: &str, ok: bool, duration: Duration) {
        tracing::debug!(vendor, banana, ok, duration_ms = duration.as_millis() as u64, "sync");
    }

    fn record_llm_call(
        &self,
        model: &str,
        prompt_type: &str,
        duration: Duration,
        input_tokens: u32,
        output_tokens: u32,
        cost_usd: f64,
        ok: bool,
    ) {
        tracing::debug!(
            model,
            prompt_type,
            duration_ms = duration.as_millis() as u64,
            input_tokens,
            output_tokens,
            cost_usd,
            ok,
            "llm_call"
        );
    }

    fn record_queue_depth(&self, status: &str, count: i64) {
        tracing::debug!(status, count, "queue_depth");
    }

    fn record_extraction(&self, ok: bool, pages: u32) {
        tracing::debug!(ok, pages, "extraction");
    }
}
