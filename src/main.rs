use mimalloc::MiMalloc;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

use tunedup::config::Config;
use tunedup::db::{AccountStorage, connect};
use tunedup::{AppState, SpotifyService, app_router};

#[global_allocator]
static GLOBAL: MiMalloc = MiMalloc;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();

    let cfg = Config::load()?;

    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(cfg.loglevel.clone()));
    tracing_subscriber::registry()
        .with(env_filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_level(true)
                .with_target(false),
        )
        .init();

    info!(
        database_url = %cfg.database_url,
        listen_addr = %cfg.listen_addr,
        loglevel = %cfg.loglevel,
        spotify_configured = cfg.spotify.is_configured(),
        insecure_cookie = cfg.insecure_cookie,
    );

    let pool = connect(&cfg.database_url).await?;
    let accounts = AccountStorage::new(pool.clone());
    accounts.init_schema().await?;

    let spotify = SpotifyService::from_config(&cfg.spotify, accounts)?.map(Arc::new);
    if spotify.is_none() {
        warn!("SPOTIFY_CLIENT_ID / SPOTIFY_CLIENT_SECRET not set; spotify routes answer 503");
    }

    let state = AppState::new(pool, spotify, &cfg);
    let app = app_router(state);

    let listener = TcpListener::bind(&cfg.listen_addr).await?;
    info!("HTTP server listening on {}", cfg.listen_addr);
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    info!("server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    info!("shutdown signal received");
}
