use crate::db::DbAccount;
use crate::error::AppError;
use crate::middleware::CurrentAccount;
use crate::router::AppState;
use crate::service::bounded::Bounded;
use crate::spotify::{SpotifyService, UserAccess, recommend};
use crate::types::spotify::{SearchQuery, SearchType, Suggestion};

use axum::{
    Json,
    extract::{Query, State},
};
use serde::Deserialize;
use serde_json::{Value, json};
use std::sync::Arc;
use tracing::{debug, warn};

pub const NOT_CONFIGURED: &str = "Spotify not configured";
pub const TIMED_OUT: &str =
    "Spotify took too long. Try again in a moment or check your connection.";

const MIN_QUERY_CHARS: usize = 2;
const DEFAULT_SUGGEST_LIMIT: u32 = 8;
const MAX_SUGGEST_LIMIT: u32 = 10;

pub(crate) fn configured(state: &AppState) -> Result<&Arc<SpotifyService>, AppError> {
    state
        .spotify
        .as_ref()
        .ok_or_else(|| AppError::ServiceUnavailable(NOT_CONFIGURED.to_string()))
}

/// GET /api/spotify/status
pub async fn status(CurrentAccount(account): CurrentAccount) -> Json<Value> {
    Json(json!({ "connected": account.spotify_connected() }))
}

#[derive(Debug, Default, Deserialize)]
pub struct SuggestParams {
    pub q: Option<String>,
    #[serde(rename = "type")]
    pub kind: Option<String>,
    pub limit: Option<String>,
}

impl SuggestParams {
    /// `None` when the query is too short to be worth a search.
    fn into_query(self) -> Option<SearchQuery> {
        let q = self.q.unwrap_or_default().trim().to_string();
        if q.chars().count() < MIN_QUERY_CHARS {
            return None;
        }
        let limit = self
            .limit
            .and_then(|l| l.trim().parse::<i64>().ok())
            .map(|l| l.clamp(1, MAX_SUGGEST_LIMIT as i64) as u32)
            .unwrap_or(DEFAULT_SUGGEST_LIMIT);
        Some(SearchQuery {
            q,
            kind: SearchType::parse(self.kind.as_deref()),
            limit,
        })
    }
}

/// GET /api/spotify/suggest. No login needed; uses the app-level token.
pub async fn suggest(
    State(state): State<AppState>,
    Query(params): Query<SuggestParams>,
) -> Result<Json<Vec<Suggestion>>, AppError> {
    let spotify = configured(&state)?;
    let Some(query) = params.into_query() else {
        return Ok(Json(Vec::new()));
    };
    let token = spotify.app_token().await?;

    let q = query.q.clone();
    match spotify
        .run_bounded(token, move |api, token| {
            recommend::search_suggestions(api, token, query)
        })
        .await
    {
        Bounded::Ok(found) => Ok(Json(found)),
        Bounded::Failed(e) => {
            warn!(error = %e, q = %q, "spotify search failed");
            Ok(Json(Vec::new()))
        }
        Bounded::TimedOut => Ok(Json(Vec::new())),
    }
}

/// Resolve the caller's Spotify token, or the degraded body to send instead.
async fn user_token(
    spotify: &SpotifyService,
    account: &DbAccount,
    field: &str,
    not_linked: &str,
) -> Result<Result<String, Json<Value>>, AppError> {
    match spotify.user_access(account).await? {
        UserAccess::Ready(token) => Ok(Ok(token)),
        // the link is intact; a retry may succeed
        UserAccess::RefreshTimedOut => Ok(Err(degraded(field, TIMED_OUT))),
        UserAccess::NotLinked | UserAccess::RefreshFailed => {
            debug!(account_id = account.id, "spotify not usable for this account");
            Ok(Err(degraded(field, not_linked)))
        }
    }
}

fn degraded(field: &str, error: &str) -> Json<Value> {
    Json(json!({ field: [], "error": error }))
}

/// Turn a bounded outcome into the route's 200 body.
fn respond<T>(
    account_id: i64,
    outcome: Bounded<T>,
    wrap: impl FnOnce(T) -> Value,
    field: &str,
    failed: &str,
) -> Json<Value> {
    match outcome {
        Bounded::Ok(v) => Json(wrap(v)),
        Bounded::Failed(e) => {
            warn!(account_id, error = %e, field, "spotify recommendation call failed");
            degraded(field, failed)
        }
        Bounded::TimedOut => degraded(field, TIMED_OUT),
    }
}

/// GET /api/spotify/recommendations
pub async fn recommendations(
    State(state): State<AppState>,
    CurrentAccount(account): CurrentAccount,
) -> Result<Json<Value>, AppError> {
    let spotify = configured(&state)?;
    let token = match user_token(
        spotify,
        &account,
        "tracks",
        "Connect Spotify to get recommendations",
    )
    .await?
    {
        Ok(t) => t,
        Err(body) => return Ok(body),
    };
    let outcome = spotify
        .run_bounded(token, recommend::recommended_tracks)
        .await;
    Ok(respond(
        account.id,
        outcome,
        |recs| json!(recs),
        "tracks",
        "Could not load recommendations",
    ))
}

/// GET /api/spotify/recommendations/artists
pub async fn recommended_artists(
    State(state): State<AppState>,
    CurrentAccount(account): CurrentAccount,
) -> Result<Json<Value>, AppError> {
    let spotify = configured(&state)?;
    let token = match user_token(spotify, &account, "artists", "Connect Spotify").await? {
        Ok(t) => t,
        Err(body) => return Ok(body),
    };
    let outcome = spotify
        .run_bounded(token, recommend::top_artist_suggestions)
        .await;
    Ok(respond(
        account.id,
        outcome,
        |artists| json!({ "artists": artists }),
        "artists",
        "Could not load artists",
    ))
}

/// GET /api/spotify/recommendations/albums
pub async fn recommended_albums(
    State(state): State<AppState>,
    CurrentAccount(account): CurrentAccount,
) -> Result<Json<Value>, AppError> {
    let spotify = configured(&state)?;
    let token = match user_token(spotify, &account, "albums", "Connect Spotify").await? {
        Ok(t) => t,
        Err(body) => return Ok(body),
    };
    let outcome = spotify
        .run_bounded(token, recommend::album_suggestions)
        .await;
    Ok(respond(
        account.id,
        outcome,
        |albums| json!({ "albums": albums }),
        "albums",
        "Could not load albums",
    ))
}
