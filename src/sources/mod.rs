//! Post source abstraction.
//!
//! A source turns `(query, limit)` into an ordered list of posts. Network
//! and parsing details live inside the implementation; the pipeline only
//! sees the trait.

mod reddit;
mod session;

pub use reddit::RedditSource;
pub use session::RedditSession;

use async_trait::async_trait;
use thiserror::Error;

use crate::models::Post;

#[derive(Debug, Error)]
pub enum SourceError {
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("unexpected status {status}: {body}")]
    Status { status: u16, body: String },
    #[error("failed to parse response: {0}")]
    Parse(String),
}

/// Trait abstracting where posts come from.
///
/// An empty result is a valid, non-error outcome; implementations must
/// return at most `limit` posts, preserving the source's ordering.
#[async_trait]
pub trait PostSource: Send + Sync {
    /// Run one search and return the matching posts.
    async fn search(&self, query: &str, limit: usize) -> Result<Vec<Post>, SourceError>;

    /// Human-readable name for logging (e.g. "reddit").
    fn source_name(&self) -> &str;
}
