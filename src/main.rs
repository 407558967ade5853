/// VidTube - video sharing platform backend
///
/// A Rust backend for a video sharing service: accounts with dual-token
/// sessions, video publishing backed by a media store, playlists, and the
/// aggregation queries that power channel pages and watch history.

mod api;
mod auth;
mod config;
mod context;
mod credential;
mod db;
mod error;
mod identity;
mod media;
mod mutators;
mod pipeline;
mod queries;
mod response;
mod server;

use config::ServerConfig;
use context::AppContext;
use error::ApiResult;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> ApiResult<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "vidtube=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    let config = ServerConfig::from_env()?;

    // Create application context
    let ctx = AppContext::new(config).await?;

    // Start server
    server::serve(ctx).await?;

    Ok(())
}
