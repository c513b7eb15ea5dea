use crate::AppState;
use axum::{extract::State, routing::get, Json, Router};
use serde::Serialize;

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    version: &'static str,
    /// Cached tickers, including stale rows not yet purged. Null if the store is unreadable.
    cache_entries: Option<usize>,
    cache_ttl_minutes: i64,
}

async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
        cache_entries: state.stock_service.cache().store_backend().len().ok(),
        cache_ttl_minutes: state.config.cache.ttl_minutes,
    })
}

pub fn router() -> Router<AppState> {
    Router::new().route("/api/health", get(health))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_health_response_serialization() {
        let response = HealthResponse {
            status: "ok",
            version: "1.0.0",
            cache_entries: Some(3),
            cache_ttl_minutes: 60,
        };

        let json = serde_json::to_string(&response).unwrap();
        assert!(json.contains("\"status\":\"ok\""));
        assert!(json.contains("\"version\":\"1.0.0\""));
        assert!(json.contains("\"cache_entries\":3"));
        assert!(json.contains("\"cache_ttl_minutes\":60"));
    }

    #[test]
    fn test_health_response_unreadable_store() {
        let response = HealthResponse {
            status: "ok",
            version: env!("CARGO_PKG_VERSION"),
            cache_entries: None,
            cache_ttl_minutes: 1440,
        };

        let json = serde_json::to_value(&response).unwrap();
        assert!(json["cache_entries"].is_null());
    }
}
