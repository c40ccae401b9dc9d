use crate::config::SpotifyConfig;
use crate::db::models::DbAccount;
use crate::db::sqlite::AccountStorage;
use crate::error::AppError;
use crate::service::bounded::{Bounded, run_bounded};
use crate::service::clock::{Clock, SystemClock};
use crate::spotify::credentials::{TokenState, UserAccess};
use crate::spotify::endpoints::{HttpSpotifyApi, SpotifyApi};

use chrono::{DateTime, TimeDelta, Utc};
use std::future::Future;
use std::sync::{Arc, PoisonError, RwLock};
use std::time::Duration;
use tracing::{debug, info, warn};

#[derive(Debug, Clone)]
struct CachedToken {
    access_token: String,
    expires_at: DateTime<Utc>,
}

/// Everything request handlers need from Spotify, constructed once and shared.
///
/// - per-account access via [`SpotifyService::user_access`] (lazy, bounded refresh)
/// - the app-level token via [`SpotifyService::app_token`]
/// - bounded execution of read-only API work via [`SpotifyService::run_bounded`]
pub struct SpotifyService {
    api: Arc<dyn SpotifyApi>,
    accounts: AccountStorage,
    clock: Arc<dyn Clock>,
    refresh_timeout: Duration,
    call_timeout: Duration,
    expiry_buffer: Duration,
    app_token: RwLock<Option<CachedToken>>,
}

impl SpotifyService {
    pub fn new(
        api: Arc<dyn SpotifyApi>,
        accounts: AccountStorage,
        clock: Arc<dyn Clock>,
        cfg: &SpotifyConfig,
    ) -> Self {
        Self {
            api,
            accounts,
            clock,
            refresh_timeout: cfg.refresh_timeout(),
            call_timeout: cfg.call_timeout(),
            expiry_buffer: cfg.expiry_buffer(),
            app_token: RwLock::new(None),
        }
    }

    /// `None` when the app credentials are not configured.
    pub fn from_config(
        cfg: &SpotifyConfig,
        accounts: AccountStorage,
    ) -> Result<Option<Self>, AppError> {
        if !cfg.is_configured() {
            return Ok(None);
        }
        let api = Arc::new(HttpSpotifyApi::new(cfg)?);
        Ok(Some(Self::new(api, accounts, Arc::new(SystemClock), cfg)))
    }

    pub fn api(&self) -> &Arc<dyn SpotifyApi> {
        &self.api
    }

    pub fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    /// Resolve an access token for `account`, refreshing it if it is missing
    /// or about to expire.
    ///
    /// A refresh that outlives the refresh ceiling leaves the account as it
    /// was. A refresh that errors clears the stored tokens so the user has to
    /// relink. Only storage errors are returned as `Err`.
    pub async fn user_access(&self, account: &DbAccount) -> Result<UserAccess, AppError> {
        let link = account.spotify_link();
        let refresh_token = match TokenState::evaluate(&link, self.clock.now(), self.expiry_buffer)
        {
            TokenState::NoLink => return Ok(UserAccess::NotLinked),
            TokenState::ValidCached { access_token } => {
                debug!(account_id = account.id, "reusing cached spotify token");
                return Ok(UserAccess::Ready(access_token));
            }
            TokenState::NeedsRefresh { refresh_token } => refresh_token,
        };

        let api = self.api.clone();
        let outcome = run_bounded(self.refresh_timeout, async move {
            api.refresh(&refresh_token).await
        })
        .await;

        match outcome {
            Bounded::Ok(grant) => {
                let expires_at = grant.expires_at(self.clock.now());
                self.accounts
                    .update_spotify_tokens(
                        account.id,
                        &grant.access_token,
                        expires_at,
                        grant.refresh_token.as_deref(),
                    )
                    .await?;
                info!(account_id = account.id, %expires_at, "spotify token refreshed");
                Ok(UserAccess::Ready(grant.access_token))
            }
            Bounded::TimedOut => {
                warn!(
                    account_id = account.id,
                    timeout_secs = self.refresh_timeout.as_secs(),
                    "spotify token refresh timed out"
                );
                Ok(UserAccess::RefreshTimedOut)
            }
            Bounded::Failed(e) => {
                warn!(account_id = account.id, error = %e, "spotify token refresh failed; unlinking");
                self.accounts.clear_spotify_tokens(account.id).await?;
                Ok(UserAccess::RefreshFailed)
            }
        }
    }

    /// Run read-only Spotify work under the overall call ceiling.
    pub async fn run_bounded<T, F, Fut>(&self, access_token: String, work: F) -> Bounded<T>
    where
        T: Send + 'static,
        F: FnOnce(Arc<dyn SpotifyApi>, String) -> Fut,
        Fut: Future<Output = Result<T, AppError>> + Send + 'static,
    {
        run_bounded(self.call_timeout, work(self.api.clone(), access_token)).await
    }

    /// App-level (client credentials) token, reused until it is inside the
    /// expiry buffer. Two callers racing past an expired slot may both fetch;
    /// the later write wins.
    pub async fn app_token(&self) -> Result<String, AppError> {
        if let Some(token) = self.cached_app_token(self.clock.now()) {
            return Ok(token);
        }

        let grant = self.api.client_credentials().await.map_err(|e| {
            warn!(error = %e, "spotify app token request failed");
            AppError::ServiceUnavailable("Spotify unavailable".to_string())
        })?;
        let cached = CachedToken {
            access_token: grant.access_token.clone(),
            expires_at: grant.expires_at(self.clock.now()),
        };
        debug!(expires_at = %cached.expires_at, "spotify app token cached");
        *self
            .app_token
            .write()
            .unwrap_or_else(PoisonError::into_inner) = Some(cached);
        Ok(grant.access_token)
    }

    fn cached_app_token(&self, now: DateTime<Utc>) -> Option<String> {
        let buffer = TimeDelta::seconds(self.expiry_buffer.as_secs() as i64);
        self.app_token
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
            .filter(|t| t.expires_at - buffer > now)
            .map(|t| t.access_token.clone())
    }
}
