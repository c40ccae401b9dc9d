use crate::db::models::DbAccount;
use crate::error::AppError;
use crate::router::AppState;

use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use axum::response::{IntoResponse, Redirect, Response};
use axum_extra::extract::cookie::{Cookie, Key, PrivateCookieJar, SameSite};
use time::Duration;
use tracing::debug;

pub const SESSION_COOKIE: &str = "tunedup_session";
pub const LOGIN_REQUIRED: &str = "Please log in to continue.";

const SESSION_MAX_AGE_DAYS: i64 = 30;

/// Account id carried by the encrypted session cookie, if any.
pub fn session_account_id(jar: &PrivateCookieJar) -> Option<i64> {
    jar.get(SESSION_COOKIE).and_then(|c| c.value().parse::<i64>().ok())
}

pub fn session_cookie(account_id: i64, secure: bool) -> Cookie<'static> {
    Cookie::build(Cookie::new(SESSION_COOKIE, account_id.to_string()))
        .path("/")
        .http_only(true)
        .secure(secure)
        .same_site(SameSite::Lax)
        .max_age(Duration::days(SESSION_MAX_AGE_DAYS))
        .build()
}

pub fn clear_session_cookie() -> Cookie<'static> {
    Cookie::build(Cookie::new(SESSION_COOKIE, ""))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .build()
}

async fn load_account(parts: &mut Parts, state: &AppState) -> Result<Option<DbAccount>, AppError> {
    let Ok(jar) = PrivateCookieJar::<Key>::from_request_parts(parts, state).await;
    let Some(id) = session_account_id(&jar) else {
        return Ok(None);
    };
    let account = state.accounts.get_by_id(id).await?;
    if account.is_none() {
        debug!(account_id = id, "session refers to a missing account");
    }
    Ok(account)
}

/// Logged-in account for JSON routes. Rejects with 401 `{error}`.
#[derive(Debug, Clone)]
pub struct CurrentAccount(pub DbAccount);

impl FromRequestParts<AppState> for CurrentAccount {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        load_account(parts, state)
            .await?
            .map(CurrentAccount)
            .ok_or_else(|| AppError::Unauthorized(LOGIN_REQUIRED.to_string()))
    }
}

/// Logged-in account for browser flows. Redirects to the login page with
/// `next` set to the requested path.
#[derive(Debug, Clone)]
pub struct BrowserAccount(pub DbAccount);

impl FromRequestParts<AppState> for BrowserAccount {
    type Rejection = Response;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        match load_account(parts, state).await {
            Ok(Some(account)) => Ok(BrowserAccount(account)),
            Ok(None) => Err(Redirect::to(&login_redirect(&state.login_url, parts)).into_response()),
            Err(e) => Err(e.into_response()),
        }
    }
}

fn login_redirect(login_url: &str, parts: &Parts) -> String {
    let next = parts
        .uri
        .path_and_query()
        .map(|pq| pq.as_str())
        .unwrap_or("/");
    append_query(login_url, "next", next)
}

/// Append `key=value` to a possibly relative URL, percent-encoding the value.
pub fn append_query(base: &str, key: &str, value: &str) -> String {
    let encoded: String = url::form_urlencoded::byte_serialize(value.as_bytes()).collect();
    let sep = if base.contains('?') { '&' } else { '?' };
    format!("{base}{sep}{key}={encoded}")
}
