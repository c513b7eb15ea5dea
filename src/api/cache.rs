use axum::{extract::State, routing::post, Json, Router};
use serde::Serialize;
use tracing::info;

use crate::error::Result;
use crate::AppState;

#[derive(Debug, Serialize)]
pub struct PurgeResponse {
    pub purged: usize,
}

pub fn router() -> Router<AppState> {
    Router::new().route("/cache/purge", post(purge))
}

/// POST /v1/cache/purge
async fn purge(State(state): State<AppState>) -> Result<Json<PurgeResponse>> {
    let purged = state.stock_service.purge_expired()?;
    info!("Purged {} expired cache entries", purged);
    Ok(Json(PurgeResponse { purged }))
}
