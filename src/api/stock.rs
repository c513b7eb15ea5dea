//! Stock metrics endpoints.

use axum::{
    extract::{Path, Query, State},
    routing::get,
    Json, Router,
};
use serde::Deserialize;

use crate::error::{AppError, Result};
use crate::types::{ChartSeries, MetricsResponse, TickerResult};
use crate::AppState;

/// Query for a single-ticker lookup.
#[derive(Debug, Deserialize)]
pub struct StockQuery {
    /// Stock ticker symbol.
    pub q: Option<String>,
}

/// Query for a multi-ticker lookup.
#[derive(Debug, Deserialize)]
pub struct StocksQuery {
    /// Comma-separated ticker symbols.
    pub tickers: Option<String>,
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/stock", get(get_stock))
        .route("/stocks", get(get_stocks))
        .route("/stock/:ticker/chart", get(get_stock_chart))
}

/// GET /v1/stock?q=AAPL
async fn get_stock(
    State(state): State<AppState>,
    Query(query): Query<StockQuery>,
) -> Result<Json<MetricsResponse>> {
    let ticker = query
        .q
        .as_deref()
        .map(str::trim)
        .filter(|q| !q.is_empty())
        .ok_or_else(|| AppError::BadRequest("Ticker symbol (q) is required".to_string()))?;

    let lookup = state.stock_service.get_metrics(ticker).await?;
    Ok(Json(lookup.to_response()))
}

/// GET /v1/stocks?tickers=AAPL,MSFT
async fn get_stocks(
    State(state): State<AppState>,
    Query(query): Query<StocksQuery>,
) -> Result<Json<Vec<TickerResult>>> {
    let raw = query.tickers.unwrap_or_default();
    let tickers: Vec<&str> = raw.split(',').filter(|t| !t.trim().is_empty()).collect();
    if tickers.is_empty() {
        return Err(AppError::BadRequest("At least one ticker is required".to_string()));
    }

    Ok(Json(state.stock_service.get_many(tickers).await))
}

/// GET /v1/stock/:ticker/chart
async fn get_stock_chart(
    State(state): State<AppState>,
    Path(ticker): Path<String>,
) -> Result<Json<ChartSeries>> {
    Ok(Json(state.stock_service.get_chart_series(&ticker).await?))
}
