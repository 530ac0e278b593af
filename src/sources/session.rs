//! Reddit session state.
//!
//! The OAuth handshake itself happens elsewhere; this only carries the state
//! it publishes. A session is constructed explicitly and handed to
//! [`RedditSource`](super::RedditSource) — there is no ambient singleton.

use chrono::{DateTime, Utc};

/// Published authentication state for the Reddit API.
#[derive(Debug, Clone, Default)]
pub struct RedditSession {
    pub access_token: Option<String>,
    pub username: Option<String>,
    pub expires_at: Option<DateTime<Utc>>,
}

impl RedditSession {
    /// Session with no credentials; searches go through the public endpoint
    /// at lower rate limits.
    pub fn anonymous() -> Self {
        Self::default()
    }

    pub fn authenticated(
        access_token: impl Into<String>,
        username: Option<String>,
        expires_at: Option<DateTime<Utc>>,
    ) -> Self {
        Self {
            access_token: Some(access_token.into()),
            username,
            expires_at,
        }
    }

    /// Whether the session holds a usable (present and unexpired) token.
    pub fn is_authenticated(&self) -> bool {
        if self.access_token.is_none() {
            return false;
        }
        match self.expires_at {
            Some(expiry) => expiry > Utc::now(),
            None => true,
        }
    }

    /// Bearer token if the session is live.
    pub fn bearer_token(&self) -> Option<&str> {
        if self.is_authenticated() {
            self.access_token.as_deref()
        } else {
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn test_anonymous_is_not_authenticated() {
        assert!(!RedditSession::anonymous().is_authenticated());
    }

    #[test]
    fn test_expired_token_is_not_usable() {
        let session = RedditSession::authenticated(
            "tok",
            Some("user".into()),
            Some(Utc::now() - Duration::minutes(5)),
        );
        assert!(!session.is_authenticated());
        assert!(session.bearer_token().is_none());
    }

    #[test]
    fn test_live_token_is_usable() {
        let session = RedditSession::authenticated(
            "tok",
            None,
            Some(Utc::now() + Duration::minutes(30)),
        );
        assert!(session.is_authenticated());
        assert_eq!(session.bearer_token(), Some("tok"));
    }
}
