use crate::config::Config;
use crate::db::{AccountStorage, RankingStore, SqlitePool};
use crate::handlers::{auth, rankings, spotify};
use crate::middleware::{CurrentAccount, LenientJson};
use crate::spotify::SpotifyService;
use crate::types::ranking::{AddRankingRequest, RankingKind, ReorderRequest};

use axum::{
    Json, Router,
    extract::{FromRef, Path, State},
    routing::{delete, get, post, put},
};
use axum_extra::extract::cookie::Key;
use serde_json::json;
use std::sync::Arc;
use tracing::warn;

/// Shared, cheaply clonable state handed to every handler.
#[derive(Clone)]
pub struct AppState {
    pub accounts: AccountStorage,
    pub rankings: RankingStore,
    /// `None` when Spotify app credentials are not configured.
    pub spotify: Option<Arc<SpotifyService>>,
    pub cookie_key: Key,
    pub login_url: Arc<str>,
    pub app_url: Arc<str>,
    pub insecure_cookie: bool,
}

impl AppState {
    pub fn new(pool: SqlitePool, spotify: Option<Arc<SpotifyService>>, cfg: &Config) -> Self {
        Self {
            accounts: AccountStorage::new(pool.clone()),
            rankings: RankingStore::new(pool),
            spotify,
            cookie_key: cookie_key(&cfg.secret_key),
            login_url: Arc::from(cfg.login_url.as_str()),
            app_url: Arc::from(cfg.app_url.as_str()),
            insecure_cookie: cfg.insecure_cookie,
        }
    }
}

impl FromRef<AppState> for Key {
    fn from_ref(state: &AppState) -> Self {
        state.cookie_key.clone()
    }
}

/// Sessions only survive restarts when `secret_key` is long enough to derive from.
fn cookie_key(secret: &str) -> Key {
    if secret.len() >= 32 {
        Key::derive_from(secret.as_bytes())
    } else {
        warn!("secret_key shorter than 32 bytes; using a random session key");
        Key::generate()
    }
}

pub fn app_router(state: AppState) -> Router {
    let mut router = Router::new();

    for kind in RankingKind::ALL {
        let base = format!("/api/{}", kind.route());
        let collection = get(move |s: State<AppState>, a: CurrentAccount| {
            rankings::list(kind, s, a)
        })
        .post(
            move |s: State<AppState>, a: CurrentAccount, b: LenientJson<AddRankingRequest>| {
                rankings::add(kind, s, a, b)
            },
        );
        router = router
            .route(&base, collection.clone())
            .route(&format!("{base}/"), collection)
            .route(
                &format!("{base}/reorder"),
                put(
                    move |s: State<AppState>, a: CurrentAccount, b: LenientJson<ReorderRequest>| {
                        rankings::reorder(kind, s, a, b)
                    },
                ),
            )
            .route(
                &format!("{base}/{{id}}"),
                delete(move |s: State<AppState>, a: CurrentAccount, p: Path<String>| {
                    rankings::remove(kind, s, a, p)
                }),
            );
    }

    router
        .route("/api/spotify/status", get(spotify::status))
        .route("/api/spotify/suggest", get(spotify::suggest))
        .route("/api/spotify/recommendations", get(spotify::recommendations))
        .route(
            "/api/spotify/recommendations/artists",
            get(spotify::recommended_artists),
        )
        .route(
            "/api/spotify/recommendations/albums",
            get(spotify::recommended_albums),
        )
        .route("/auth/register", post(auth::register))
        .route("/auth/login", post(auth::login))
        .route("/auth/logout", get(auth::logout).post(auth::logout))
        .route("/auth/me", get(auth::me))
        .route("/auth/spotify", get(auth::spotify_connect))
        .route("/auth/spotify/callback", get(auth::spotify_callback))
        .route("/auth/spotify/disconnect", post(auth::spotify_disconnect))
        .route("/health", get(|| async { Json(json!({ "status": "ok" })) }))
        .with_state(state)
}
