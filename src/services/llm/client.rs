//! HTTP client for the LLM provider: single-call generation, batch jobs,
//! and context caches. Kept thin and stateless beyond connection pooling;
//! retry/backoff policy lives in [`super::service`].

use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use super::models::LlmError;

pub struct LlmClient {
    http: Client,
    api_base: String,
    api_key: String,
}

#[derive(Debug, Serialize)]
struct GenerateRequest<'a> {
    model: &'a str,
    system_prompt: &'a str,
    user_prompt: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    cached_content: Option<&'a str>,
    thinking_budget: &'a str,
    response_mime_type: &'static str,
}

#[derive(Debug, Deserialize)]
pub struct GenerateResponse {
    pub content: String,
    pub finish_reason: String,
    pub usage: UsageInfo,
}

#[derive(Debug, Deserialize)]
pub struct UsageInfo {
    pub input_tokens: u32,
    pub output_tokens: u32,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    error: ErrorDetail,
}

#[derive(Debug, Deserialize)]
struct ErrorDetail {
    #[serde(default)]
    message: String,
    #[serde(default)]
    details: Vec<serde_json::Value>,
}

impl LlmClient {
    pub fn new(api_base: impl Into<String>, api_key: impl Into<String>) -> Self {
        let http = Client::builder()
            .timeout(Duration::from_secs(300))
            .build()
            .expect("failed to build llm http client");
        Self { http, api_base: api_base.into(), api_key: api_key.into() }
    }

    /// A single `generate_content` call. Returns `Err(LlmError::RateLimited(secs))`
    /// on 429 with the best-effort `retryDelay` parsed out of the body; the
    /// caller (orchestrator) owns the retry loop and backoff schedule.
    pub async fn generate_content(
        &self,
        model: &str,
        system_prompt: &str,
        user_prompt: &str,
        cached_content: Option<&str>,
        thinking_budget: &str,
        timeout: Duration,
    ) -> Result<GenerateResponse, LlmError> {
        let url = format!("{}/models/{model}:generateContent", self.api_base.trim_end_matches('/'));
        let body = GenerateRequest {
            model,
            system_prompt,
            user_prompt,
            cached_content,
            thinking_budget,
            response_mime_type: "application/json",
        };

        let response = self
            .http
            .post(&url)
            .bearer_auth(&self.api_key)
            .timeout(timeout)
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    LlmError::Timeout(timeout.as_secs())
                } else {
                    LlmError::Api(e.to_string())
                }
            })?;

        let status = response.status();
        if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            let body_text = response.text().await.unwrap_or_default();
            return Err(LlmError::RateLimited(parse_retry_delay_secs(&body_text).unwrap_or(30)));
        }
        if !status.is_success() {
            let body_text = response.text().await.unwrap_or_default();
            return Err(LlmError::Api(format!("provider returned {status}: {body_text}")));
        }

        response.json::<GenerateResponse>().await.map_err(|e| LlmError::Parse(e.to_string()))
    }

    /// Submit a chunk of item requests as a batch job. Returns a provider-assigned
    /// job id the caller polls with [`Self::poll_batch`].
    pub async fn submit_batch(&self, model: &str, jsonl: &str) -> Result<String, LlmError> {
        let url = format!("{}/batches", self.api_base.trim_end_matches('/'));
        #[derive(Serialize)]
        struct Req<'a> {
            model: &'a str,
            input: &'a str,
        }
        #[derive(Deserialize)]
        struct Resp {
            id: String,
        }

        let response = self
            .http
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&Req { model, input: jsonl })
            .send()
            .await
            .map_err(|e| LlmError::Api(e.to_string()))?;

        if response.status() == reqwest::StatusCode::TOO_MANY_REQUESTS {
            let body_text = response.text().await.unwrap_or_default();
            return Err(LlmError::RateLimited(parse_retry_delay_secs(&body_text).unwrap_or(60)));
        }

        response
            .json::<Resp>()
            .await
            .map(|r| r.id)
            .map_err(|e| LlmError::Parse(e.to_string()))
    }

    /// Poll a batch job. Returns `None` while still running, `Some(results)` once done.
    pub async fn poll_batch(&self, job_id: &str) -> Result<Option<Vec<String>>, LlmError> {
        let url = format!("{}/batches/{job_id}", self.api_base.trim_end_matches('/'));
        #[derive(Deserialize)]
        struct Resp {
            done: bool,
            #[serde(default)]
            results: Vec<String>,
        }

        let response = self
            .http
            .get(&url)
            .bearer_auth(&self.api_key)
            .send()
            .await
            .map_err(|e| LlmError::Api(e.to_string()))?;

        let parsed: Resp =
            response.json().await.map_err(|e| LlmError::Parse(e.to_string()))?;
        Ok(if parsed.done { Some(parsed.results) } else { None })
    }

    /// Create a context cache from shared meeting text, returning its `cache_name`.
    pub async fn create_cache(
        &self,
        model: &str,
        contents: &str,
        ttl_secs: u64,
    ) -> Result<String, LlmError> {
        let url = format!("{}/caches", self.api_base.trim_end_matches('/'));
        #[derive(Serialize)]
        struct Req<'a> {
            model: &'a str,
            contents: &'a str,
            ttl_seconds: u64,
        }
        #[derive(Deserialize)]
        struct Resp {
            name: String,
        }

        let response = self
            .http
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&Req { model, contents, ttl_seconds: ttl_secs })
            .send()
            .await
            .map_err(|e| LlmError::Api(e.to_string()))?;

        response
            .json::<Resp>()
            .await
            .map(|r| r.name)
            .map_err(|e| LlmError::Parse(e.to_string()))
    }

    /// Best-effort cache teardown; callers treat failures as non-fatal since the
    /// provider expires caches by TTL regardless.
    pub async fn delete_cache(&self, cache_name: &str) {
        let url = format!(
            "{}/caches/{cache_name}",
            self.api_base.trim_end_matches('/')
        );
        if let Err(e) = self.http.delete(&url).bearer_auth(&self.api_key).send().await {
            tracing::warn!(cache_name, error = %e, "failed to delete context cache");
        }
    }
}

/// Parses the `retryDelay` field out of a 429 error body. The provider has been
/// observed to emit it as a bare number of seconds, a `"30s"`-style duration
/// string, or nested under `error.details[].retryDelay`.
fn parse_retry_delay_secs(body: &str) -> Option<u64> {
    let parsed: ErrorBody = serde_json::from_str(body).ok()?;
    if let Some(secs) = extract_from_message(&parsed.error.message) {
        return Some(secs);
    }
    for detail in &parsed.error.details {
        if let Some(value) = detail.get("retryDelay") {
            if let Some(secs) = duration_value_to_secs(value) {
                return Some(secs);
            }
        }
    }
    None
}

fn extract_from_message(message: &str) -> Option<u64> {
    let idx = message.find("retryDelay")?;
    let rest = &message[idx..];
    let digits: String = rest.chars().skip_while(|c| !c.is_ascii_digit()).take_while(|c| c.is_ascii_digit()).collect();
    digits.parse().ok()
}

fn duration_value_to_secs(value: &serde_json::Value) -> Option<u64> {
    match value {
        serde_json::Value::Number(n) => n.as_u64(),
        serde_json::Value::String(s) => s.trim_end_matches('s').parse().ok(),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_retry_delay_from_message() {
        let body = r#"{"error":{"message":"quota exceeded, retryDelay: 45s","details":[]}}"#;
        assert_eq!(parse_retry_delay_secs(body), Some(45));
    }

    #[test]
    fn parses_retry_delay_from_details() {
        let body = r#"{"error":{"message":"quota exceeded","details":[{"retryDelay":"12s"}]}}"#;
        assert_eq!(parse_retry_delay_secs(body), Some(12));
    }

    #[test]
    fn missing_retry_delay_returns_none() {
        let body = r#"{"error":{"message":"quota exceeded","details":[]}}"#;
        assert_eq!(parse_retry_delay_secs(body), None);
    }
}
