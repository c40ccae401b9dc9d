use crate::db::models::SpotifyLink;
use chrono::{DateTime, TimeDelta, Utc};
use std::time::Duration;

/// Lifetime assumed when the token endpoint omits `expires_in`.
pub const DEFAULT_TOKEN_LIFETIME: Duration = Duration::from_secs(3600);

/// Result of a token grant (code exchange, refresh or client credentials).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenGrant {
    pub access_token: String,
    /// Present only when Spotify rotated it.
    pub refresh_token: Option<String>,
    pub expires_in: Option<Duration>,
}

impl TokenGrant {
    pub fn expires_at(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        now + secs(self.expires_in.unwrap_or(DEFAULT_TOKEN_LIFETIME))
    }
}

/// Where an account's stored credentials stand right now.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TokenState {
    /// No refresh token: nothing can be obtained.
    NoLink,
    /// Cached access token outlives `now + buffer`; use it as is.
    ValidCached { access_token: String },
    /// Access token missing or about to expire.
    NeedsRefresh { refresh_token: String },
}

impl TokenState {
    pub fn evaluate(link: &SpotifyLink, now: DateTime<Utc>, buffer: Duration) -> Self {
        let Some(refresh_token) = link.refresh_token.as_deref().filter(|t| !t.is_empty()) else {
            return TokenState::NoLink;
        };
        if let (Some(access_token), Some(expires_at)) = (&link.access_token, link.expires_at)
            && expires_at - secs(buffer) > now
        {
            return TokenState::ValidCached {
                access_token: access_token.clone(),
            };
        }
        TokenState::NeedsRefresh {
            refresh_token: refresh_token.to_string(),
        }
    }
}

/// What the guard hands back to a request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UserAccess {
    Ready(String),
    NotLinked,
    /// Refresh exceeded its ceiling; stored credentials untouched.
    RefreshTimedOut,
    /// Refresh was rejected; stored credentials cleared.
    RefreshFailed,
}

fn secs(d: Duration) -> TimeDelta {
    TimeDelta::seconds(d.as_secs() as i64)
}
