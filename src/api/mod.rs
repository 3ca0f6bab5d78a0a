pub mod health;
pub mod recompute;
pub mod sentiment;

use crate::AppState;
use axum::Router;

/// Create the API router.
pub fn router() -> Router<AppState> {
    Router::new()
        .merge(health::router())
        .nest("/api/sentiment", sentiment::router())
        .nest("/api/recompute", recompute::router())
}
