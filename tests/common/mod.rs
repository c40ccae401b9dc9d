#![allow(dead_code)]

use async_trait::async_trait;
use axum::{
    Router,
    body::{Body, to_bytes},
    http::{Request, StatusCode, header},
    response::Response,
};
use serde_json::Value;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tower::ServiceExt;
use url::Url;

use tunedup::config::{Config, SpotifyConfig};
use tunedup::db::{AccountStorage, SqlitePool, connect};
use tunedup::service::clock::SystemClock;
use tunedup::spotify::{SpotifyApi, TokenGrant};
use tunedup::types::spotify::{
    ArtistObject, Paging, RecommendationsResponse, SearchQuery, SearchResponse, Seeds,
    SimpleArtist, TrackObject, UserProfile,
};
use tunedup::{AppError, AppState, SpotifyService, app_router};

pub const SECRET: &str = "an-integration-test-secret-that-is-long-enough";

/// Canned Spotify that counts every Web API call.
#[derive(Default)]
pub struct StubSpotify {
    pub calls: AtomicUsize,
}

impl StubSpotify {
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn hit(&self) {
        self.calls.fetch_add(1, Ordering::SeqCst);
    }
}

fn track(id: &str, name: &str, artist: &str) -> TrackObject {
    TrackObject {
        id: id.to_string(),
        name: name.to_string(),
        artists: vec![SimpleArtist {
            id: None,
            name: artist.to_string(),
        }],
        album: None,
    }
}

#[async_trait]
impl SpotifyApi for StubSpotify {
    fn authorize_url(&self, state: &str) -> Url {
        Url::parse_with_params("https://accounts.test/authorize", &[("state", state)]).unwrap()
    }

    async fn exchange_code(&self, code: &str) -> Result<TokenGrant, AppError> {
        Ok(TokenGrant {
            access_token: format!("access-{code}"),
            refresh_token: Some(format!("refresh-{code}")),
            expires_in: Some(Duration::from_secs(3600)),
        })
    }

    async fn refresh(&self, _refresh_token: &str) -> Result<TokenGrant, AppError> {
        Ok(TokenGrant {
            access_token: "refreshed".to_string(),
            refresh_token: None,
            expires_in: None,
        })
    }

    async fn client_credentials(&self) -> Result<TokenGrant, AppError> {
        Ok(TokenGrant {
            access_token: "app".to_string(),
            refresh_token: None,
            expires_in: Some(Duration::from_secs(3600)),
        })
    }

    async fn current_user(&self, _access_token: &str) -> Result<UserProfile, AppError> {
        self.hit();
        Ok(UserProfile {
            id: "sp-user".to_string(),
        })
    }

    async fn search(
        &self,
        _access_token: &str,
        query: &SearchQuery,
    ) -> Result<SearchResponse, AppError> {
        self.hit();
        Ok(SearchResponse {
            artists: Some(Paging {
                items: vec![ArtistObject {
                    id: "a1".to_string(),
                    name: query.q.clone(),
                }],
            }),
            tracks: None,
        })
    }

    async fn top_artists(
        &self,
        _access_token: &str,
        _limit: u32,
    ) -> Result<Paging<ArtistObject>, AppError> {
        self.hit();
        Ok(Paging {
            items: vec![ArtistObject {
                id: "a1".to_string(),
                name: "Radiohead".to_string(),
            }],
        })
    }

    async fn top_tracks(
        &self,
        _access_token: &str,
        _limit: u32,
    ) -> Result<Paging<TrackObject>, AppError> {
        self.hit();
        Ok(Paging {
            items: vec![track("t1", "Reckoner", "Radiohead")],
        })
    }

    async fn recommendations(
        &self,
        _access_token: &str,
        _seeds: &Seeds,
        _limit: u32,
    ) -> Result<RecommendationsResponse, AppError> {
        self.hit();
        Ok(RecommendationsResponse {
            tracks: vec![track("r1", "Alright", "Air")],
        })
    }
}

pub struct TestApp {
    pub router: Router,
    pub pool: SqlitePool,
    pub stub: Option<Arc<StubSpotify>>,
}

pub fn test_config() -> Config {
    Config {
        secret_key: SECRET.to_string(),
        insecure_cookie: true,
        ..Config::default()
    }
}

pub async fn spawn_app(with_spotify: bool) -> TestApp {
    let cfg = test_config();
    let pool = connect("sqlite::memory:").await.expect("in-memory sqlite");
    let accounts = AccountStorage::new(pool.clone());
    accounts.init_schema().await.expect("schema init");

    let stub = with_spotify.then(|| Arc::new(StubSpotify::default()));
    let spotify = stub.clone().map(|stub| {
        Arc::new(SpotifyService::new(
            stub,
            accounts,
            Arc::new(SystemClock),
            &SpotifyConfig::default(),
        ))
    });

    let state = AppState::new(pool.clone(), spotify, &cfg);
    TestApp {
        router: app_router(state),
        pool,
        stub,
    }
}

impl TestApp {
    pub async fn send(&self, req: Request<Body>) -> Response {
        self.router
            .clone()
            .oneshot(req)
            .await
            .expect("request failed")
    }

    /// Register `username` and return its session cookie.
    pub async fn register(&self, username: &str) -> String {
        let body = serde_json::json!({
            "username": username,
            "email": format!("{username}@example.com"),
            "password": "hunter22",
        });
        let resp = self
            .send(json_request("POST", "/auth/register", None, &body))
            .await;
        assert_eq!(resp.status(), StatusCode::CREATED);
        session_from(&resp)
    }
}

pub fn session_from(resp: &Response) -> String {
    resp.headers()
        .get(header::SET_COOKIE)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(';').next())
        .expect("session cookie")
        .to_string()
}

pub fn json_request(method: &str, uri: &str, cookie: Option<&str>, body: &Value) -> Request<Body> {
    let mut builder = Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json");
    if let Some(cookie) = cookie {
        builder = builder.header(header::COOKIE, cookie);
    }
    builder
        .body(Body::from(body.to_string()))
        .expect("failed to build request")
}

pub fn get(uri: &str, cookie: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder().method("GET").uri(uri);
    if let Some(cookie) = cookie {
        builder = builder.header(header::COOKIE, cookie);
    }
    builder.body(Body::empty()).expect("failed to build request")
}

pub async fn body_json(resp: Response) -> Value {
    let bytes = to_bytes(resp.into_body(), usize::MAX)
        .await
        .expect("failed to read response body");
    serde_json::from_slice(&bytes).expect("response body was not json")
}
