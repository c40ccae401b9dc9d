//! In-process stand-ins for Spotify and the clock.

use crate::error::AppError;
use crate::service::clock::Clock;
use crate::spotify::credentials::TokenGrant;
use crate::spotify::endpoints::SpotifyApi;
use crate::types::spotify::{
    AlbumObject, ArtistObject, Paging, RecommendationsResponse, SearchQuery, SearchResponse,
    Seeds, SimpleArtist, TrackObject, UserProfile,
};

use async_trait::async_trait;
use chrono::{DateTime, TimeDelta, TimeZone, Utc};
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use url::Url;

pub(crate) struct FakeClock {
    now: Mutex<DateTime<Utc>>,
}

impl Default for FakeClock {
    fn default() -> Self {
        Self {
            now: Mutex::new(Utc.timestamp_opt(1_700_000_000, 0).unwrap()),
        }
    }
}

impl FakeClock {
    pub(crate) fn advance(&self, by: TimeDelta) {
        *self.now.lock().unwrap() += by;
    }
}

impl Clock for FakeClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.lock().unwrap()
    }
}

#[derive(Default)]
pub(crate) struct FakeSpotify {
    pub top_artists: Vec<ArtistObject>,
    pub top_tracks: Vec<TrackObject>,
    pub recommended: Vec<TrackObject>,
    pub rotate_refresh_token: bool,
    pub fail_refresh: bool,
    pub fail_app_token: bool,
    pub fail_api: bool,
    pub refresh_delay: Option<Duration>,
    pub api_delay: Option<Duration>,
    pub refresh_calls: AtomicUsize,
    pub app_token_calls: AtomicUsize,
    pub api_calls: AtomicUsize,
    pub last_seeds: Mutex<Option<Seeds>>,
}

impl FakeSpotify {
    async fn api_call(&self) -> Result<(), AppError> {
        self.api_calls.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.api_delay {
            tokio::time::sleep(delay).await;
        }
        if self.fail_api {
            return Err(AppError::UpstreamStatus(reqwest::StatusCode::BAD_GATEWAY));
        }
        Ok(())
    }
}

pub(crate) fn artist(id: &str, name: &str) -> ArtistObject {
    ArtistObject {
        id: id.to_string(),
        name: name.to_string(),
    }
}

pub(crate) fn track(id: &str, name: &str, album: Option<(&str, &str)>) -> TrackObject {
    let artists = vec![SimpleArtist {
        id: None,
        name: format!("{name} artist"),
    }];
    TrackObject {
        id: id.to_string(),
        name: name.to_string(),
        artists: artists.clone(),
        album: album.map(|(id, name)| AlbumObject {
            id: Some(id.to_string()),
            name: Some(name.to_string()),
            artists,
        }),
    }
}

#[async_trait]
impl SpotifyApi for FakeSpotify {
    fn authorize_url(&self, state: &str) -> Url {
        Url::parse_with_params("https://accounts.example/authorize", &[("state", state)]).unwrap()
    }

    async fn exchange_code(&self, code: &str) -> Result<TokenGrant, AppError> {
        Ok(TokenGrant {
            access_token: format!("access-for-{code}"),
            refresh_token: Some(format!("refresh-for-{code}")),
            expires_in: Some(Duration::from_secs(3600)),
        })
    }

    async fn refresh(&self, _refresh_token: &str) -> Result<TokenGrant, AppError> {
        self.refresh_calls.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.refresh_delay {
            tokio::time::sleep(delay).await;
        }
        if self.fail_refresh {
            return Err(AppError::Oauth2Server {
                error: "invalid_grant".to_string(),
            });
        }
        Ok(TokenGrant {
            access_token: "fresh-access".to_string(),
            refresh_token: self.rotate_refresh_token.then(|| "rotated-refresh".to_string()),
            expires_in: Some(Duration::from_secs(3600)),
        })
    }

    async fn client_credentials(&self) -> Result<TokenGrant, AppError> {
        let n = self.app_token_calls.fetch_add(1, Ordering::SeqCst) + 1;
        if self.fail_app_token {
            return Err(AppError::Oauth2Token("connection refused".to_string()));
        }
        Ok(TokenGrant {
            access_token: format!("app-token-{n}"),
            refresh_token: None,
            expires_in: Some(Duration::from_secs(3600)),
        })
    }

    async fn current_user(&self, _access_token: &str) -> Result<UserProfile, AppError> {
        self.api_call().await?;
        Ok(UserProfile {
            id: "spotify-user".to_string(),
        })
    }

    async fn search(
        &self,
        _access_token: &str,
        _query: &SearchQuery,
    ) -> Result<SearchResponse, AppError> {
        self.api_call().await?;
        Ok(SearchResponse {
            artists: Some(Paging {
                items: self.top_artists.clone(),
            }),
            tracks: Some(Paging {
                items: self.top_tracks.clone(),
            }),
        })
    }

    async fn top_artists(
        &self,
        _access_token: &str,
        limit: u32,
    ) -> Result<Paging<ArtistObject>, AppError> {
        self.api_call().await?;
        Ok(Paging {
            items: self.top_artists.iter().take(limit as usize).cloned().collect(),
        })
    }

    async fn top_tracks(
        &self,
        _access_token: &str,
        limit: u32,
    ) -> Result<Paging<TrackObject>, AppError> {
        self.api_call().await?;
        Ok(Paging {
            items: self.top_tracks.iter().take(limit as usize).cloned().collect(),
        })
    }

    async fn recommendations(
        &self,
        _access_token: &str,
        seeds: &Seeds,
        limit: u32,
    ) -> Result<RecommendationsResponse, AppError> {
        self.api_call().await?;
        *self.last_seeds.lock().unwrap() = Some(seeds.clone());
        Ok(RecommendationsResponse {
            tracks: self.recommended.iter().take(limit as usize).cloned().collect(),
        })
    }
}
