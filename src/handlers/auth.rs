use crate::db::models::AccountView;
use crate::error::AppError;
use crate::handlers::spotify::configured;
use crate::middleware::session::{
    append_query, clear_session_cookie, session_account_id, session_cookie,
};
use crate::middleware::{BrowserAccount, CurrentAccount, LenientJson};
use crate::router::AppState;
use crate::service::password;

use axum::{
    Json,
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Redirect, Response},
};
use axum_extra::extract::cookie::PrivateCookieJar;
use serde::Deserialize;
use serde_json::{Value, json};
use subtle::ConstantTimeEq;
use tracing::{info, warn};

const BAD_CREDENTIALS: &str = "Invalid username or password.";

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct RegisterRequest {
    pub username: Option<String>,
    pub email: Option<String>,
    pub password: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct LoginRequest {
    pub username: Option<String>,
    pub password: Option<String>,
}

fn trimmed(v: Option<String>) -> String {
    v.map(|s| s.trim().to_string()).unwrap_or_default()
}

/// Runs password hashing on the blocking pool.
async fn blocking<T, F>(f: F) -> Result<T, AppError>
where
    T: Send + 'static,
    F: FnOnce() -> T + Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| AppError::Internal(format!("blocking task failed: {e}")))
}

/// POST /auth/register
pub async fn register(
    State(state): State<AppState>,
    jar: PrivateCookieJar,
    LenientJson(body): LenientJson<RegisterRequest>,
) -> Result<Response, AppError> {
    let username = trimmed(body.username);
    let email = trimmed(body.email).to_lowercase();
    let plain = body.password.unwrap_or_default();
    if username.is_empty() || email.is_empty() || plain.is_empty() {
        return Err(AppError::Validation("Please fill in all fields.".to_string()));
    }

    let hash = blocking(move || password::hash(&plain)).await??;
    let account = state.accounts.create(&username, &email, &hash).await?;
    info!(account_id = account.id, "account registered");

    let jar = jar.add(session_cookie(account.id, !state.insecure_cookie));
    Ok((StatusCode::CREATED, jar, Json(AccountView::from(&account))).into_response())
}

/// POST /auth/login
pub async fn login(
    State(state): State<AppState>,
    jar: PrivateCookieJar,
    LenientJson(body): LenientJson<LoginRequest>,
) -> Result<Response, AppError> {
    let username = trimmed(body.username);
    let plain = body.password.unwrap_or_default();
    let unauthorized = || AppError::Unauthorized(BAD_CREDENTIALS.to_string());
    if username.is_empty() || plain.is_empty() {
        return Err(unauthorized());
    }

    let Some(account) = state.accounts.find_by_username(&username).await? else {
        return Err(unauthorized());
    };
    let stored = account.password_hash.clone();
    if !blocking(move || password::verify(&plain, &stored)).await? {
        warn!(account_id = account.id, "login rejected");
        return Err(unauthorized());
    }

    info!(account_id = account.id, "login");
    let jar = jar.add(session_cookie(account.id, !state.insecure_cookie));
    Ok((jar, Json(AccountView::from(&account))).into_response())
}

/// GET|POST /auth/logout
pub async fn logout(jar: PrivateCookieJar) -> impl IntoResponse {
    if let Some(id) = session_account_id(&jar) {
        info!(account_id = id, "logout");
    }
    (jar.remove(clear_session_cookie()), Json(json!({ "ok": true })))
}

/// GET /auth/me
pub async fn me(CurrentAccount(account): CurrentAccount) -> Json<Value> {
    let view = AccountView::from(&account);
    Json(json!({
        "id": view.id,
        "username": view.username,
        "email": view.email,
        "spotify_connected": account.spotify_connected(),
    }))
}

/// GET /auth/spotify -> 303 to Spotify's consent page, `state` = account id.
pub async fn spotify_connect(
    State(state): State<AppState>,
    BrowserAccount(account): BrowserAccount,
) -> Result<Redirect, AppError> {
    let spotify = configured(&state)?;
    let url = spotify.api().authorize_url(&account.id.to_string());
    info!(account_id = account.id, "dispatching spotify authorize redirect");
    Ok(Redirect::to(url.as_str()))
}

#[derive(Debug, Default, Deserialize)]
pub struct SpotifyCallbackQuery {
    pub code: Option<String>,
    pub state: Option<String>,
    pub error: Option<String>,
}

/// GET /auth/spotify/callback -> exchanges the code, stores the link, back to the app.
pub async fn spotify_callback(
    State(state): State<AppState>,
    BrowserAccount(account): BrowserAccount,
    Query(query): Query<SpotifyCallbackQuery>,
) -> Redirect {
    let outcome = match link_spotify(&state, account.id, query).await {
        Ok(()) => {
            info!(account_id = account.id, "spotify account linked");
            "connected"
        }
        Err(e) => {
            warn!(account_id = account.id, error = %e, "spotify link failed");
            "error"
        }
    };
    Redirect::to(&append_query(&state.app_url, "spotify", outcome))
}

async fn link_spotify(
    state: &AppState,
    account_id: i64,
    query: SpotifyCallbackQuery,
) -> Result<(), AppError> {
    let spotify = configured(state)?;
    if let Some(err) = query.error {
        return Err(AppError::Oauth2Server { error: err });
    }

    let expected = account_id.to_string();
    let state_ok = query
        .state
        .as_deref()
        .is_some_and(|s| bool::from(s.as_bytes().ct_eq(expected.as_bytes())));
    if !state_ok {
        return Err(AppError::Validation("OAuth state mismatch".to_string()));
    }
    let code = query
        .code
        .filter(|c| !c.is_empty())
        .ok_or_else(|| AppError::Validation("missing `code` in callback".to_string()))?;

    let grant = spotify.api().exchange_code(&code).await?;
    let refresh_token = grant
        .refresh_token
        .as_deref()
        .ok_or_else(|| AppError::Oauth2Token("token response missing refresh_token".into()))?;
    let profile = spotify.api().current_user(&grant.access_token).await?;

    state
        .accounts
        .save_spotify_link(
            account_id,
            Some(&profile.id),
            refresh_token,
            &grant.access_token,
            grant.expires_at(spotify.now()),
        )
        .await
}

/// POST /auth/spotify/disconnect
pub async fn spotify_disconnect(
    State(state): State<AppState>,
    CurrentAccount(account): CurrentAccount,
) -> Result<Json<Value>, AppError> {
    state.accounts.unlink_spotify(account.id).await?;
    info!(account_id = account.id, "spotify account unlinked");
    Ok(Json(json!({ "ok": true })))
}
