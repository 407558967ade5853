/// API routes and handlers
pub mod health;
pub mod playlists;
pub mod social;
pub mod users;
pub mod videos;

use crate::context::AppContext;
use axum::Router;

/// Build API routes
pub fn routes() -> Router<AppContext> {
    Router::new()
        .merge(health::routes())
        .merge(users::routes())
        .merge(videos::routes())
        .merge(playlists::routes())
        .merge(social::routes())
}
