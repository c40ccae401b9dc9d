use crate::config::{SPOTIFY_SCOPE, SpotifyConfig};
use crate::error::AppError;
use crate::spotify::credentials::TokenGrant;
use crate::types::spotify::{
    ArtistObject, Paging, RecommendationsResponse, SearchQuery, SearchResponse, Seeds,
    TrackObject, UserProfile,
};

use async_trait::async_trait;
use oauth2::{
    AuthUrl, AuthorizationCode, ClientId, ClientSecret, CsrfToken, EndpointNotSet, EndpointSet,
    RedirectUrl, RefreshToken, Scope, TokenResponse, TokenUrl,
    basic::{BasicClient, BasicTokenResponse},
};
use serde::de::DeserializeOwned;
use std::time::Duration;
use tracing::{debug, info};
use url::Url;

/// Calls this service makes against Spotify. Object-safe so tests can swap in a fake.
#[async_trait]
pub trait SpotifyApi: Send + Sync {
    /// Consent page URL carrying `state` back to the callback.
    fn authorize_url(&self, state: &str) -> Url;

    async fn exchange_code(&self, code: &str) -> Result<TokenGrant, AppError>;

    async fn refresh(&self, refresh_token: &str) -> Result<TokenGrant, AppError>;

    /// App-level token (no user) used for search.
    async fn client_credentials(&self) -> Result<TokenGrant, AppError>;

    async fn current_user(&self, access_token: &str) -> Result<UserProfile, AppError>;

    async fn search(
        &self,
        access_token: &str,
        query: &SearchQuery,
    ) -> Result<SearchResponse, AppError>;

    async fn top_artists(
        &self,
        access_token: &str,
        limit: u32,
    ) -> Result<Paging<ArtistObject>, AppError>;

    async fn top_tracks(
        &self,
        access_token: &str,
        limit: u32,
    ) -> Result<Paging<TrackObject>, AppError>;

    async fn recommendations(
        &self,
        access_token: &str,
        seeds: &Seeds,
        limit: u32,
    ) -> Result<RecommendationsResponse, AppError>;
}

pub type SpotifyOauth2Client =
    BasicClient<EndpointSet, EndpointNotSet, EndpointNotSet, EndpointNotSet, EndpointSet>;

/// Spotify over HTTPS: oauth2 for the accounts service, reqwest for the Web API.
pub struct HttpSpotifyApi {
    oauth: SpotifyOauth2Client,
    http: reqwest::Client,
    api_url: String,
}

impl HttpSpotifyApi {
    pub fn new(cfg: &SpotifyConfig) -> Result<Self, AppError> {
        let oauth = BasicClient::new(ClientId::new(cfg.client_id.clone()))
            .set_client_secret(ClientSecret::new(cfg.client_secret.clone()))
            .set_auth_uri(AuthUrl::new(cfg.auth_url.clone())?)
            .set_token_uri(TokenUrl::new(cfg.token_url.clone())?)
            .set_redirect_uri(RedirectUrl::new(cfg.redirect_uri.clone())?);

        // Token endpoints must not follow redirects.
        let http = reqwest::Client::builder()
            .user_agent(concat!("tunedup/", env!("CARGO_PKG_VERSION")))
            .connect_timeout(Duration::from_secs(5))
            .timeout(Duration::from_secs(15))
            .redirect(reqwest::redirect::Policy::none())
            .build()?;

        Ok(Self {
            oauth,
            http,
            api_url: cfg.api_url.trim_end_matches('/').to_string(),
        })
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        access_token: &str,
        path: &str,
        query: &[(&str, String)],
    ) -> Result<T, AppError> {
        let resp = self
            .http
            .get(format!("{}/{}", self.api_url, path))
            .bearer_auth(access_token)
            .header("Accept", "application/json")
            .query(query)
            .send()
            .await?;
        let status = resp.status();
        if !status.is_success() {
            debug!(path, %status, "spotify api returned error status");
            return Err(AppError::UpstreamStatus(status));
        }
        Ok(resp.json::<T>().await?)
    }
}

fn grant_from(resp: &BasicTokenResponse) -> TokenGrant {
    TokenGrant {
        access_token: resp.access_token().secret().clone(),
        refresh_token: resp.refresh_token().map(|t| t.secret().clone()),
        expires_in: resp.expires_in(),
    }
}

#[async_trait]
impl SpotifyApi for HttpSpotifyApi {
    fn authorize_url(&self, state: &str) -> Url {
        let (url, _csrf) = self
            .oauth
            .authorize_url(|| CsrfToken::new(state.to_string()))
            .add_scope(Scope::new(SPOTIFY_SCOPE.to_string()))
            .url();
        url
    }

    async fn exchange_code(&self, code: &str) -> Result<TokenGrant, AppError> {
        let resp = self
            .oauth
            .exchange_code(AuthorizationCode::new(code.to_string()))
            .request_async(&self.http)
            .await?;
        info!("Spotify authorization code exchanged");
        Ok(grant_from(&resp))
    }

    async fn refresh(&self, refresh_token: &str) -> Result<TokenGrant, AppError> {
        let resp = self
            .oauth
            .exchange_refresh_token(&RefreshToken::new(refresh_token.to_string()))
            .request_async(&self.http)
            .await?;
        debug!("Spotify access token refreshed");
        Ok(grant_from(&resp))
    }

    async fn client_credentials(&self) -> Result<TokenGrant, AppError> {
        let resp = self
            .oauth
            .exchange_client_credentials()
            .request_async(&self.http)
            .await?;
        debug!("Spotify app token issued");
        Ok(grant_from(&resp))
    }

    async fn current_user(&self, access_token: &str) -> Result<UserProfile, AppError> {
        self.get_json(access_token, "me", &[]).await
    }

    async fn search(
        &self,
        access_token: &str,
        query: &SearchQuery,
    ) -> Result<SearchResponse, AppError> {
        self.get_json(
            access_token,
            "search",
            &[
                ("q", query.q.clone()),
                ("type", query.kind.as_param().to_string()),
                ("limit", query.limit.to_string()),
            ],
        )
        .await
    }

    async fn top_artists(
        &self,
        access_token: &str,
        limit: u32,
    ) -> Result<Paging<ArtistObject>, AppError> {
        self.get_json(access_token, "me/top/artists", &[("limit", limit.to_string())])
            .await
    }

    async fn top_tracks(
        &self,
        access_token: &str,
        limit: u32,
    ) -> Result<Paging<TrackObject>, AppError> {
        self.get_json(access_token, "me/top/tracks", &[("limit", limit.to_string())])
            .await
    }

    async fn recommendations(
        &self,
        access_token: &str,
        seeds: &Seeds,
        limit: u32,
    ) -> Result<RecommendationsResponse, AppError> {
        let mut query = vec![("limit", limit.to_string())];
        if !seeds.artists.is_empty() {
            query.push(("seed_artists", seeds.artists.join(",")));
        }
        if !seeds.tracks.is_empty() {
            query.push(("seed_tracks", seeds.tracks.join(",")));
        }
        self.get_json(access_token, "recommendations", &query).await
    }
}
