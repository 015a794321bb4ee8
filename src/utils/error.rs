//! Crate-wide error taxonomy.
//!
//! Each variant is recovered locally at the item, meeting, or city boundary
//! by its caller: these exist to carry enough context to log and retry,
//! not to unwind across component boundaries.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum CoreError {
    #[error("vendor error ({vendor}): {message}")]
    Vendor { vendor: String, message: String },

    #[error("validation error: {0}")]
    Validation(String),

    #[error("extraction error: {0}")]
    Extraction(String),

    #[error("llm error: {0}")]
    Llm(#[from] crate::services::llm::LlmError),

    #[error("queue lease lost for job {0}")]
    QueueLeaseLost(i64),

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

pub type CoreResult<T> = Result<T, CoreError>;
