use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::FromRow;

/// A row of `users`. Not `Serialize`: the password hash must never leave the process.
#[derive(Debug, Clone, PartialEq, FromRow)]
pub struct DbAccount {
    pub id: i64,
    pub username: String,
    pub email: String,
    pub password_hash: String,
    pub spotify_id: Option<String>,
    pub spotify_refresh_token: Option<String>,
    pub spotify_access_token: Option<String>,
    pub spotify_token_expires_at: Option<DateTime<Utc>>,
}

/// The Spotify-related slice of an account.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SpotifyLink {
    pub refresh_token: Option<String>,
    pub access_token: Option<String>,
    pub expires_at: Option<DateTime<Utc>>,
}

/// Public view of an account.
#[derive(Debug, Clone, Serialize)]
pub struct AccountView {
    pub id: i64,
    pub username: String,
    pub email: String,
}

impl DbAccount {
    pub fn spotify_link(&self) -> SpotifyLink {
        SpotifyLink {
            refresh_token: self.spotify_refresh_token.clone(),
            access_token: self.spotify_access_token.clone(),
            expires_at: self.spotify_token_expires_at,
        }
    }

    pub fn spotify_connected(&self) -> bool {
        self.spotify_refresh_token.is_some()
    }
}

impl From<&DbAccount> for AccountView {
    fn from(a: &DbAccount) -> Self {
        Self {
            id: a.id,
            username: a.username.clone(),
            email: a.email.clone(),
        }
    }
}
