use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

/// Application error types.
#[derive(Error, Debug)]
pub enum AppError {
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// Upstream fetch failed or the ticker could not be resolved.
    #[error("Data unavailable: {0}")]
    DataUnavailable(String),

    /// Upstream answered but returned zero observations.
    #[error("No data returned for {0}")]
    NoData(String),

    #[error(transparent)]
    Storage(#[from] StoreError),

    #[error(transparent)]
    Reqwest(#[from] reqwest::Error),
}

/// Cache persistence errors.
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("Corrupt cache row for {ticker}: {reason}")]
    Corrupt { ticker: String, reason: String },

    #[error("Store lock poisoned")]
    Poisoned,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            AppError::DataUnavailable(msg) => (StatusCode::NOT_FOUND, msg.clone()),
            AppError::NoData(_) => (StatusCode::UNPROCESSABLE_ENTITY, self.to_string()),
            AppError::Storage(e) => (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()),
            AppError::Reqwest(e) => (StatusCode::BAD_GATEWAY, e.to_string()),
        };

        let body = Json(json!({
            "error": message,
            "status": status.as_u16(),
        }));

        (status, body).into_response()
    }
}

pub type Result<T> = std::result::Result<T, AppError>;
