//! Reddit search source.
//!
//! Issues one GET against the search endpoint and decodes the Listing
//! envelope. Authenticated sessions go through `oauth.reddit.com` for higher
//! rate limits; otherwise the public `www.reddit.com` endpoint is used.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Deserialize;
use std::time::Duration;
use tracing::debug;

use super::session::RedditSession;
use super::{PostSource, SourceError};
use crate::models::Post;

const PUBLIC_BASE: &str = "https://www.reddit.com";
const OAUTH_BASE: &str = "https://oauth.reddit.com";

/// Reddit rejects requests with a generic client user agent.
const USER_AGENT: &str = concat!("sentiscan/", env!("CARGO_PKG_VERSION"));

/// Post limit bounds accepted by the search form.
pub const MIN_POST_LIMIT: usize = 1;
pub const MAX_POST_LIMIT: usize = 100;

/// Search source backed by the Reddit JSON API.
pub struct RedditSource {
    client: reqwest::Client,
    session: RedditSession,
    /// Override for tests; `None` selects public/oauth based on the session.
    base_url: Option<String>,
}

impl RedditSource {
    pub fn new(session: RedditSession) -> Result<Self, SourceError> {
        let client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(Duration::from_secs(30))
            .build()?;
        Ok(Self {
            client,
            session,
            base_url: None,
        })
    }

    /// Point the source at a different base URL (test servers).
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = Some(base_url.into());
        self
    }

    fn endpoint(&self) -> String {
        if let Some(base) = &self.base_url {
            return format!("{}/search.json", base.trim_end_matches('/'));
        }
        let base = if self.session.is_authenticated() {
            OAUTH_BASE
        } else {
            PUBLIC_BASE
        };
        format!("{base}/search.json")
    }
}

#[async_trait]
impl PostSource for RedditSource {
    async fn search(&self, query: &str, limit: usize) -> Result<Vec<Post>, SourceError> {
        let limit = limit.clamp(MIN_POST_LIMIT, MAX_POST_LIMIT);
        let url = format!(
            "{}?q={}&limit={}&sort=relevance&raw_json=1",
            self.endpoint(),
            urlencoding::encode(query),
            limit
        );

        debug!(query, limit, "searching reddit");

        let mut request = self.client.get(&url);
        if let Some(token) = self.session.bearer_token() {
            request = request.bearer_auth(token);
        }

        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(SourceError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let body = response.text().await?;
        let mut posts = parse_listing(&body)?;
        posts.truncate(limit);
        Ok(posts)
    }

    fn source_name(&self) -> &str {
        "reddit"
    }
}

// === Listing envelope ===

#[derive(Debug, Deserialize)]
struct Listing {
    data: ListingData,
}

#[derive(Debug, Deserialize)]
struct ListingData {
    #[serde(default)]
    children: Vec<ListingChild>,
}

#[derive(Debug, Deserialize)]
struct ListingChild {
    data: RawPost,
}

#[derive(Debug, Deserialize)]
struct RawPost {
    id: String,
    #[serde(default)]
    title: String,
    #[serde(default)]
    selftext: String,
    #[serde(default)]
    subreddit: String,
    #[serde(default)]
    author: String,
    #[serde(default)]
    score: i64,
    #[serde(default)]
    num_comments: u64,
    #[serde(default)]
    permalink: String,
    created_utc: Option<f64>,
}

impl From<RawPost> for Post {
    fn from(raw: RawPost) -> Self {
        let created_utc = raw
            .created_utc
            .and_then(|secs| DateTime::<Utc>::from_timestamp(secs as i64, 0));
        Post {
            id: raw.id,
            title: raw.title,
            body: raw.selftext,
            subreddit: raw.subreddit,
            author: raw.author,
            score: raw.score,
            num_comments: raw.num_comments,
            permalink: raw.permalink,
            created_utc,
        }
    }
}

/// Decode a Reddit search Listing into posts, preserving order.
fn parse_listing(body: &str) -> Result<Vec<Post>, SourceError> {
    let listing: Listing =
        serde_json::from_str(body).map_err(|e| SourceError::Parse(e.to_string()))?;
    Ok(listing
        .data
        .children
        .into_iter()
        .map(|child| child.data.into())
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    const LISTING: &str = r#"{
        "kind": "Listing",
        "data": {
            "children": [
                {"kind": "t3", "data": {
                    "id": "aa1",
                    "title": "First post",
                    "selftext": "body text",
                    "subreddit": "rust",
                    "author": "alice",
                    "score": 42,
                    "num_comments": 7,
                    "permalink": "/r/rust/comments/aa1/first_post/",
                    "created_utc": 1700000000.0
                }},
                {"kind": "t3", "data": {
                    "id": "bb2",
                    "title": "Second post",
                    "selftext": "",
                    "subreddit": "programming",
                    "author": "bob",
                    "score": -3,
                    "num_comments": 0,
                    "permalink": "/r/programming/comments/bb2/second/",
                    "created_utc": null
                }}
            ]
        }
    }"#;

    #[test]
    fn test_parse_listing_preserves_order() {
        let posts = parse_listing(LISTING).unwrap();
        assert_eq!(posts.len(), 2);
        assert_eq!(posts[0].id, "aa1");
        assert_eq!(posts[0].score, 42);
        assert!(posts[0].created_utc.is_some());
        assert_eq!(posts[1].id, "bb2");
        assert_eq!(posts[1].body, "");
        assert!(posts[1].created_utc.is_none());
    }

    #[test]
    fn test_parse_listing_empty_children() {
        let posts = parse_listing(r#"{"kind":"Listing","data":{"children":[]}}"#).unwrap();
        assert!(posts.is_empty());
    }

    #[test]
    fn test_parse_listing_rejects_garbage() {
        assert!(matches!(
            parse_listing("not json"),
            Err(SourceError::Parse(_))
        ));
    }

    #[test]
    fn test_endpoint_selection() {
        let anon = RedditSource::new(RedditSession::anonymous()).unwrap();
        assert!(anon.endpoint().starts_with(PUBLIC_BASE));

        let authed = RedditSource::new(RedditSession::authenticated("tok", None, None)).unwrap();
        assert!(authed.endpoint().starts_with(OAUTH_BASE));

        let overridden = anon.with_base_url("http://127.0.0.1:9999/");
        assert_eq!(overridden.endpoint(), "http://127.0.0.1:9999/search.json");
    }
}
