//! Google Gemini backend for classification and aggregation.
//!
//! Uses the `generateContent` REST endpoint. Requires an API key
//! (`GEMINI_API_KEY`).
//!
//! Rate limiting:
//! - Set `GEMINI_DELAY_MS` to configure the pacing delay before each
//!   request (default: 200ms)
//! - Retries on 429 and 5xx with exponential backoff, honoring the
//!   Retry-After header, until the configured retry budget is spent

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, warn};

use super::prompts;
use super::retry::{backoff_delay, get_delay_from_env, parse_retry_after};
use super::{LlmError, SentimentAggregator, SentimentClassifier};
use crate::models::{AggregatedResult, Post, Verdict};

const API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta/models";

fn default_model() -> String {
    "gemini-2.0-flash".to_string()
}

/// Connection and retry settings for the Gemini backend.
#[derive(Debug, Clone)]
pub struct GeminiConfig {
    pub api_key: Option<String>,
    pub model: String,
    /// Total request attempts before giving up.
    pub max_retries: u32,
    /// Pacing delay applied before every request.
    pub request_delay: Duration,
}

impl Default for GeminiConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            model: default_model(),
            max_retries: 12,
            request_delay: Duration::from_millis(200),
        }
    }
}

impl GeminiConfig {
    /// Build from environment: `GEMINI_API_KEY`, `GEMINI_MODEL`,
    /// `GEMINI_DELAY_MS`.
    pub fn from_env() -> Self {
        let mut config = Self::default();
        config.api_key = std::env::var("GEMINI_API_KEY").ok();
        if let Ok(model) = std::env::var("GEMINI_MODEL") {
            if !model.is_empty() {
                config.model = model;
            }
        }
        config.request_delay = get_delay_from_env("GEMINI_DELAY_MS", 200);
        config
    }

    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(api_key.into());
        self
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries.max(1);
        self
    }

    pub fn is_available(&self) -> bool {
        self.api_key.is_some()
    }

    pub fn availability_hint(&self) -> String {
        if self.api_key.is_none() {
            "GEMINI_API_KEY not set. Get an API key from https://ai.google.dev/".to_string()
        } else {
            format!("Gemini is available (model: {})", self.model)
        }
    }
}

// === Wire types ===

#[derive(Debug, Serialize)]
struct GeminiRequest {
    contents: Vec<GeminiContent>,
    #[serde(rename = "generationConfig")]
    generation_config: GeminiGenerationConfig,
}

#[derive(Debug, Serialize)]
struct GeminiContent {
    parts: Vec<GeminiPart>,
}

#[derive(Debug, Serialize)]
struct GeminiPart {
    text: String,
}

#[derive(Debug, Serialize)]
struct GeminiGenerationConfig {
    temperature: f32,
    #[serde(rename = "maxOutputTokens")]
    max_output_tokens: u32,
}

#[derive(Debug, Deserialize)]
struct GeminiResponse {
    candidates: Option<Vec<GeminiCandidate>>,
    error: Option<GeminiApiError>,
}

#[derive(Debug, Deserialize)]
struct GeminiCandidate {
    content: GeminiResponseContent,
}

#[derive(Debug, Deserialize)]
struct GeminiResponseContent {
    parts: Vec<GeminiResponsePart>,
}

#[derive(Debug, Deserialize)]
struct GeminiResponsePart {
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
struct GeminiApiError {
    #[serde(default)]
    code: u16,
    message: String,
}

// === Client ===

/// Gemini client implementing both the classifier and aggregator seams.
pub struct GeminiClient {
    client: reqwest::Client,
    config: GeminiConfig,
}

impl GeminiClient {
    pub fn new(config: GeminiConfig) -> Result<Self, LlmError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(60))
            .build()?;
        Ok(Self { client, config })
    }

    pub fn config(&self) -> &GeminiConfig {
        &self.config
    }

    fn request_url(&self, api_key: &str) -> String {
        format!(
            "{}/{}:generateContent?key={}",
            API_BASE, self.config.model, api_key
        )
    }

    /// Send one prompt, retrying on 429/5xx until the budget is spent.
    async fn generate(&self, prompt: &str) -> Result<String, LlmError> {
        let api_key = self
            .config
            .api_key
            .as_deref()
            .ok_or(LlmError::MissingApiKey)?;
        let url = self.request_url(api_key);

        let request = GeminiRequest {
            contents: vec![GeminiContent {
                parts: vec![GeminiPart {
                    text: prompt.to_string(),
                }],
            }],
            generation_config: GeminiGenerationConfig {
                temperature: 0.2,
                max_output_tokens: 2048,
            },
        };

        let attempts = self.config.max_retries.max(1);
        let mut last_error = String::new();

        for attempt in 0..attempts {
            if self.config.request_delay > Duration::ZERO {
                debug!("gemini: waiting {:?} before request", self.config.request_delay);
                tokio::time::sleep(self.config.request_delay).await;
            }

            let response = match self.client.post(&url).json(&request).send().await {
                Ok(r) => r,
                Err(e) => {
                    // Transport errors (timeouts, resets) are worth retrying.
                    last_error = e.to_string();
                    warn!(
                        "gemini request failed (attempt {}/{}): {}",
                        attempt + 1,
                        attempts,
                        last_error
                    );
                    tokio::time::sleep(backoff_delay(attempt, 1000)).await;
                    continue;
                }
            };

            let status = response.status();

            if status.as_u16() == 429 || status.is_server_error() {
                let retry_after = response
                    .headers()
                    .get("retry-after")
                    .and_then(|v| v.to_str().ok())
                    .map(|s| s.to_string());
                last_error = format!("HTTP {status}");
                let wait = parse_retry_after(retry_after.as_deref())
                    .unwrap_or_else(|| backoff_delay(attempt, 1000));
                warn!(
                    "gemini {} (attempt {}/{}), waiting {:?}",
                    status,
                    attempt + 1,
                    attempts,
                    wait
                );
                tokio::time::sleep(wait).await;
                continue;
            }

            if !status.is_success() {
                let body = response.text().await.unwrap_or_default();
                return Err(LlmError::Api {
                    status: status.as_u16(),
                    message: body,
                });
            }

            let payload: GeminiResponse = response
                .json()
                .await
                .map_err(|e| LlmError::Parse(format!("invalid response body: {e}")))?;

            if let Some(error) = payload.error {
                return Err(LlmError::Api {
                    status: error.code,
                    message: error.message,
                });
            }

            return payload
                .candidates
                .and_then(|c| c.into_iter().next())
                .and_then(|c| c.content.parts.into_iter().next())
                .and_then(|p| p.text)
                .ok_or_else(|| LlmError::Parse("response contained no candidates".to_string()));
        }

        Err(LlmError::RetriesExhausted {
            attempts,
            last_error,
        })
    }
}

#[async_trait]
impl SentimentClassifier for GeminiClient {
    async fn classify(&self, post: &Post, keyword: &str) -> Result<Verdict, LlmError> {
        let prompt = prompts::fill(
            prompts::CLASSIFY_PROMPT,
            &[("keyword", keyword), ("post", &post.analysis_text())],
        );
        let text = self.generate(&prompt).await?;
        parse_verdict(&text)
    }
}

#[async_trait]
impl SentimentAggregator for GeminiClient {
    async fn aggregate(
        &self,
        positives: &[String],
        negatives: &[String],
        keyword: &str,
    ) -> Result<AggregatedResult, LlmError> {
        let prompt = prompts::fill(
            prompts::AGGREGATE_PROMPT,
            &[
                ("keyword", keyword),
                ("positives", &bullet_list(positives)),
                ("negatives", &bullet_list(negatives)),
            ],
        );
        let text = self.generate(&prompt).await?;
        parse_aggregate(&text)
    }
}

fn bullet_list(items: &[String]) -> String {
    if items.is_empty() {
        return "(none)".to_string();
    }
    items
        .iter()
        .map(|item| format!("- {item}"))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Strip a surrounding Markdown code fence, if present. Models routinely
/// wrap JSON in ```json fences despite instructions not to.
fn strip_code_fences(text: &str) -> &str {
    let trimmed = text.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    // Drop the info string (e.g. "json") up to the first newline.
    let rest = match rest.find('\n') {
        Some(idx) => &rest[idx + 1..],
        None => rest,
    };
    rest.strip_suffix("```").unwrap_or(rest).trim()
}

fn parse_verdict(text: &str) -> Result<Verdict, LlmError> {
    serde_json::from_str(strip_code_fences(text))
        .map_err(|e| LlmError::Parse(format!("invalid verdict JSON: {e}")))
}

fn parse_aggregate(text: &str) -> Result<AggregatedResult, LlmError> {
    serde_json::from_str(strip_code_fences(text))
        .map_err(|e| LlmError::Parse(format!("invalid aggregate JSON: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strip_code_fences() {
        assert_eq!(strip_code_fences("{\"a\":1}"), "{\"a\":1}");
        assert_eq!(strip_code_fences("```json\n{\"a\":1}\n```"), "{\"a\":1}");
        assert_eq!(strip_code_fences("```\n{\"a\":1}\n```"), "{\"a\":1}");
        assert_eq!(strip_code_fences("  {\"a\":1}  "), "{\"a\":1}");
    }

    #[test]
    fn test_parse_verdict() {
        let verdict = parse_verdict(
            "```json\n{\"sentiment\": \"Positive\", \"positives\": [\"cheap\"], \"negatives\": []}\n```",
        )
        .unwrap();
        assert_eq!(verdict.sentiment, "Positive");
        assert_eq!(verdict.positives, vec!["cheap".to_string()]);
        assert!(verdict.negatives.is_empty());
    }

    #[test]
    fn test_parse_verdict_missing_lists_default_empty() {
        let verdict = parse_verdict("{\"sentiment\": \"neutral\"}").unwrap();
        assert!(verdict.positives.is_empty());
        assert!(verdict.negatives.is_empty());
    }

    #[test]
    fn test_parse_verdict_rejects_prose() {
        assert!(parse_verdict("The sentiment is positive.").is_err());
    }

    #[test]
    fn test_parse_aggregate() {
        let aggregate = parse_aggregate(
            r#"{"overall_sentiment": "mixed", "summary": "Split opinions.", "positives": ["p"], "negatives": ["n"]}"#,
        )
        .unwrap();
        assert_eq!(aggregate.overall_sentiment, "mixed");
        assert_eq!(aggregate.summary, "Split opinions.");
    }

    #[test]
    fn test_bullet_list() {
        assert_eq!(bullet_list(&[]), "(none)");
        assert_eq!(
            bullet_list(&["a".to_string(), "b".to_string()]),
            "- a\n- b"
        );
    }

    #[test]
    fn test_config_defaults() {
        let config = GeminiConfig::default();
        assert_eq!(config.model, "gemini-2.0-flash");
        assert_eq!(config.max_retries, 12);
        assert!(!config.is_available());
    }
}
