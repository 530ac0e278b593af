//! LLM classification and aggregation adapters.
//!
//! The pipeline only sees the two traits; the Gemini implementation, its
//! retry policy, and its prompts are internal to this module.

mod gemini;
mod prompts;
mod retry;

pub use gemini::{GeminiClient, GeminiConfig};
pub use retry::{backoff_delay, get_delay_from_env, parse_retry_after};

use async_trait::async_trait;
use thiserror::Error;

use crate::models::{AggregatedResult, Post, Verdict};

/// Errors from the LLM backend. One type serves both classification and
/// aggregation; the pipeline's recovery policy differs by stage, not by
/// error type.
#[derive(Debug, Error)]
pub enum LlmError {
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("API error ({status}): {message}")]
    Api { status: u16, message: String },
    #[error("retries exhausted after {attempts} attempts: {last_error}")]
    RetriesExhausted { attempts: u32, last_error: String },
    #[error("failed to parse model output: {0}")]
    Parse(String),
    #[error("API key not configured; set GEMINI_API_KEY")]
    MissingApiKey,
}

/// Classifies one post's sentiment toward a context keyword.
///
/// Retry and backoff are the implementation's concern; callers see either a
/// verdict or a terminal error.
#[async_trait]
pub trait SentimentClassifier: Send + Sync {
    async fn classify(&self, post: &Post, keyword: &str) -> Result<Verdict, LlmError>;
}

/// Produces one summary verdict from observations pooled across posts.
#[async_trait]
pub trait SentimentAggregator: Send + Sync {
    async fn aggregate(
        &self,
        positives: &[String],
        negatives: &[String],
        keyword: &str,
    ) -> Result<AggregatedResult, LlmError>;
}
