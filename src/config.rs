use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};
use std::time::Duration;

pub const SPOTIFY_AUTH_URL: &str = "https://accounts.spotify.com/authorize";
pub const SPOTIFY_TOKEN_URL: &str = "https://accounts.spotify.com/api/token";
pub const SPOTIFY_API_URL: &str = "https://api.spotify.com/v1";
pub const SPOTIFY_SCOPE: &str = "user-top-read";

const CONFIG_FILE: &str = "tunedup.toml";

/// Runtime configuration.
///
/// Sources, later ones win:
/// - built-in defaults
/// - `tunedup.toml` in the working directory (optional)
/// - `TUNEDUP_*` environment variables, nested with `__` (e.g. `TUNEDUP_SPOTIFY__CALL_TIMEOUT_SECS`)
/// - `SECRET_KEY` and `SPOTIFY_*` (e.g. `SPOTIFY_CLIENT_ID`)
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub listen_addr: String,
    pub database_url: String,
    pub loglevel: String,
    pub secret_key: String,
    /// Drop the `Secure` attribute from the session cookie (plain-http development).
    pub insecure_cookie: bool,
    /// Where browser flows are sent when no session is present.
    pub login_url: String,
    /// Where the OAuth callback lands the user afterwards.
    pub app_url: String,
    pub spotify: SpotifyConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SpotifyConfig {
    pub client_id: String,
    pub client_secret: String,
    pub redirect_uri: String,
    pub auth_url: String,
    pub token_url: String,
    pub api_url: String,
    pub refresh_timeout_secs: u64,
    pub call_timeout_secs: u64,
    pub expiry_buffer_secs: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            listen_addr: "127.0.0.1:5001".to_string(),
            database_url: "sqlite://tunedup.db".to_string(),
            loglevel: "info".to_string(),
            secret_key: String::new(),
            insecure_cookie: false,
            login_url: "/login".to_string(),
            app_url: "/".to_string(),
            spotify: SpotifyConfig::default(),
        }
    }
}

impl Default for SpotifyConfig {
    fn default() -> Self {
        Self {
            client_id: String::new(),
            client_secret: String::new(),
            redirect_uri: "http://127.0.0.1:5001/auth/spotify/callback".to_string(),
            auth_url: SPOTIFY_AUTH_URL.to_string(),
            token_url: SPOTIFY_TOKEN_URL.to_string(),
            api_url: SPOTIFY_API_URL.to_string(),
            refresh_timeout_secs: 10,
            call_timeout_secs: 25,
            expiry_buffer_secs: 60,
        }
    }
}

impl Config {
    pub fn load() -> Result<Self, figment::Error> {
        Self::figment().extract()
    }

    fn figment() -> Figment {
        Figment::from(Serialized::defaults(Config::default()))
            .merge(Toml::file(CONFIG_FILE))
            .merge(Env::prefixed("TUNEDUP_").split("__"))
            .merge(Env::raw().only(&["secret_key"]))
            .merge(Env::prefixed("SPOTIFY_").map(|key| format!("spotify.{}", key).into()))
    }
}

impl SpotifyConfig {
    /// Both halves of the app credential must be present.
    pub fn is_configured(&self) -> bool {
        !self.client_id.is_empty() && !self.client_secret.is_empty()
    }

    pub fn refresh_timeout(&self) -> Duration {
        Duration::from_secs(self.refresh_timeout_secs)
    }

    pub fn call_timeout(&self) -> Duration {
        Duration::from_secs(self.call_timeout_secs)
    }

    pub fn expiry_buffer(&self) -> Duration {
        Duration::from_secs(self.expiry_buffer_secs)
    }
}
