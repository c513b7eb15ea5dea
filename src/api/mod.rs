pub mod cache;
pub mod health;
pub mod stock;

use crate::AppState;
use axum::Router;

/// Create the API router.
pub fn router() -> Router<AppState> {
    Router::new()
        .merge(health::router())
        .nest("/v1", stock::router().merge(cache::router()))
}
