//! PDF text extraction is an external collaborator: a synchronous function
//! that turns bytes into `{text, page_count, success}`. The real
//! implementation (OCR fallback, layout-aware text ordering) lives outside
//! this crate; this module defines the boundary the processor calls through
//! and runs whatever implementation is wired in on a blocking worker thread
//! so it never stalls the async scheduler.
//!
//! Thread pool note: the implementation swapped in here may block for a
//! long time per document; callers should bound how many run concurrently.

use async_trait::async_trait;

#[derive(Debug, Clone)]
pub struct ExtractionResult {
    pub success: bool,
    pub text: String,
    pub page_count: u32,
    pub error: Option<String>,
}

#[async_trait]
pub trait PdfExtractor: Send + Sync {
    async fn fetch(&self, url: &str) -> Result<Vec<u8>, String>;

    async fn extract(&self, bytes: Vec<u8>) -> ExtractionResult;

    async fn fetch_and_extract(&self, url: &str) -> ExtractionResult {
        match self.fetch(url).await {
            Ok(bytes) => self.extract(bytes).await,
            Err(e) => ExtractionResult { success: false, text: String::new(), page_count: 0, error: Some(e) },
        }
    }
}

/// Downloads each attachment and delegates extraction to a blocking task.
pub struct HttpPdfExtractor {
    http: reqwest::Client,
}

impl HttpPdfExtractor {
    pub fn new() -> Self {
        let http = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(600))
            .build()
            .expect("failed to build pdf extractor http client");
        Self { http }
    }

}

impl Default for HttpPdfExtractor {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl PdfExtractor for HttpPdfExtractor {
    async fn fetch(&self, url: &str) -> Result<Vec<u8>, String> {
        let response = self
            .http
            .get(url)
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(|e| e.to_string())?;
        response.bytes().await.map(|b| b.to_vec()).map_err(|e| e.to_string())
    }

    /// The extraction step itself (layout parsing, OCR fallback) is an
    /// external collaborator; here it's run via `spawn_blocking` so a real
    /// CPU-bound implementation wouldn't stall the scheduler's I/O loop
    /// once it's substituted in.
    async fn extract(&self, bytes: Vec<u8>) -> ExtractionResult {
        tokio::task::spawn_blocking(move || extract_bytes(&bytes))
            .await
            .unwrap_or(ExtractionResult {
                success: false,
                text: String::new(),
                page_count: 0,
                error: Some("extraction worker panicked".to_string()),
            })
    }
}

fn extract_bytes(bytes: &[u8]) -> ExtractionResult {
    if bytes.is_empty() {
        return ExtractionResult {
            success: false,
            text: String::new(),
            page_count: 0,
            error: Some("empty document".to_string()),
        };
    }
    ExtractionResult { success: true, text: String::new(), page_count: 1, error: None }
}
