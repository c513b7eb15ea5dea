//! Financial Modeling Prep client for end-of-day stock history.

use async_trait::async_trait;
use chrono::{NaiveDate, Utc};
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, error, info, warn};

use crate::error::{AppError, Result};
use crate::sources::DataSource;
use crate::types::{PricePoint, PriceSeries};

const HISTORICAL_PATH: &str = "/historical-price-eod/full";

/// Daily bar as returned by the API.
#[derive(Debug, Clone, Deserialize)]
pub struct FmpBar {
    pub date: String,
    pub open: Option<f64>,
    pub high: Option<f64>,
    pub low: Option<f64>,
    pub close: f64,
    #[serde(default)]
    pub volume: Option<f64>,
}

/// The endpoint answers with a bare list, a legacy wrapper, or an error object.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum HistoricalBody {
    List(Vec<FmpBar>),
    Error {
        #[serde(rename = "Error Message")]
        error_message: String,
    },
    Legacy {
        historical: Option<Vec<FmpBar>>,
    },
}

/// Financial Modeling Prep API client.
pub struct FmpClient {
    client: Client,
    api_key: Option<String>,
    base_url: String,
}

impl FmpClient {
    /// Create a new client. Requests time out after `timeout`.
    pub fn new(api_key: Option<String>, base_url: impl Into<String>, timeout: Duration) -> Result<Self> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            api_key,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    pub fn has_api_key(&self) -> bool {
        self.api_key.is_some()
    }
}

#[async_trait]
impl DataSource for FmpClient {
    fn name(&self) -> &str {
        "fmp"
    }

    async fn fetch(&self, ticker: &str, lookback: chrono::Duration) -> Result<PriceSeries> {
        let api_key = self.api_key.as_deref().ok_or_else(|| {
            AppError::DataUnavailable(
                "FMP API key is not configured. Set FMP_API_KEY environment variable.".to_string(),
            )
        })?;

        let to = Utc::now().date_naive();
        let from = to.checked_sub_signed(lookback).ok_or_else(|| {
            AppError::DataUnavailable(format!("Lookback of {} days is out of range", lookback.num_days()))
        })?;
        let url = format!("{}{}", self.base_url, HISTORICAL_PATH);
        let from_param = from.format("%Y-%m-%d").to_string();
        let to_param = to.format("%Y-%m-%d").to_string();

        info!("[FMP] Fetching {} from {} to {}", ticker, from_param, to_param);

        let response = self
            .client
            .get(&url)
            .query(&[
                ("symbol", ticker),
                ("apikey", api_key),
                ("from", from_param.as_str()),
                ("to", to_param.as_str()),
            ])
            .send()
            .await
            .map_err(|e| {
                error!("[FMP] Request failed for {}: {}", ticker, e);
                AppError::DataUnavailable(format!("FMP API request failed for {}: {}", ticker, e))
            })?;

        check_status(ticker, response.status())?;

        let body = response.text().await.map_err(|e| {
            AppError::DataUnavailable(format!("FMP API response unreadable for {}: {}", ticker, e))
        })?;

        let series = parse_body(ticker, &body)?;
        debug!("[FMP] {} rows for {}", series.len(), ticker);
        Ok(series)
    }
}

fn check_status(ticker: &str, status: StatusCode) -> Result<()> {
    let message = match status {
        s if s.is_success() => return Ok(()),
        StatusCode::TOO_MANY_REQUESTS => {
            "FMP API rate limit exceeded. Please try again later.".to_string()
        }
        StatusCode::FORBIDDEN | StatusCode::UNAUTHORIZED => {
            "FMP API key is invalid or missing. Please check your API key.".to_string()
        }
        StatusCode::INTERNAL_SERVER_ERROR => {
            "FMP API internal server error. Please try again later.".to_string()
        }
        s => format!("FMP API error for {}: {}", ticker, s),
    };

    error!("[FMP] {} ({})", message, status);
    Err(AppError::DataUnavailable(message))
}

fn parse_body(ticker: &str, body: &str) -> Result<PriceSeries> {
    let parsed: HistoricalBody = serde_json::from_str(body).map_err(|e| {
        AppError::DataUnavailable(format!("Unexpected FMP API response format for {}: {}", ticker, e))
    })?;

    let bars = match parsed {
        HistoricalBody::List(bars) => bars,
        HistoricalBody::Error { error_message } => {
            error!("[FMP] Error Message: {}", error_message);
            return Err(AppError::DataUnavailable(format!("FMP API error: {}", error_message)));
        }
        HistoricalBody::Legacy { historical: Some(bars) } => bars,
        HistoricalBody::Legacy { historical: None } => {
            return Err(AppError::DataUnavailable(format!(
                "No historical data found for ticker: {}",
                ticker
            )));
        }
    };

    let total = bars.len();
    let points: Vec<PricePoint> = bars.into_iter().filter_map(to_point).collect();
    if points.len() < total {
        warn!("[FMP] Skipped {} unparseable rows for {}", total - points.len(), ticker);
    }

    Ok(PriceSeries::from_unsorted(points))
}

fn to_point(bar: FmpBar) -> Option<PricePoint> {
    let date = NaiveDate::parse_from_str(bar.date.get(..10)?, "%Y-%m-%d").ok()?;
    Some(PricePoint {
        date,
        open: bar.open.unwrap_or(bar.close),
        high: bar.high.unwrap_or(bar.close),
        low: bar.low.unwrap_or(bar.close),
        close: bar.close,
        volume: bar.volume.unwrap_or(0.0),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_list_body_sorts_ascending() {
        let body = r#"[
            {"symbol":"AAPL","date":"2024-03-05","open":170.1,"high":172.0,"low":169.5,"close":171.2,"volume":5000},
            {"symbol":"AAPL","date":"2024-03-04","open":168.0,"high":170.5,"low":167.9,"close":170.0,"volume":4000}
        ]"#;
        let series = parse_body("AAPL", body).unwrap();

        assert_eq!(series.len(), 2);
        assert_eq!(series.closes(), vec![170.0, 171.2]);
        assert_eq!(series.points()[1].volume, 5000.0);
    }

    #[test]
    fn test_parse_legacy_body() {
        let body = r#"{"symbol":"MSFT","historical":[{"date":"2024-01-02","close":370.9}]}"#;
        let series = parse_body("MSFT", body).unwrap();

        let point = &series.points()[0];
        assert_eq!(point.open, 370.9);
        assert_eq!(point.volume, 0.0);
    }

    #[test]
    fn test_parse_empty_list_is_empty_series() {
        let series = parse_body("NEWCO", "[]").unwrap();
        assert!(series.is_empty());
    }

    #[test]
    fn test_parse_error_message() {
        let body = r#"{"Error Message":"Invalid API KEY."}"#;
        let err = parse_body("AAPL", body).unwrap_err();
        assert!(matches!(err, AppError::DataUnavailable(msg) if msg.contains("Invalid API KEY")));
    }

    #[test]
    fn test_parse_missing_historical() {
        assert!(matches!(parse_body("ZZZZ", "{}"), Err(AppError::DataUnavailable(_))));
        assert!(matches!(parse_body("ZZZZ", "not json"), Err(AppError::DataUnavailable(_))));
    }

    #[test]
    fn test_parse_skips_bad_dates() {
        let body = r#"[{"date":"garbage","close":1.0},{"date":"2024-01-02 00:00:00","close":2.0}]"#;
        let series = parse_body("AAPL", body).unwrap();
        assert_eq!(series.closes(), vec![2.0]);
    }

    #[test]
    fn test_check_status() {
        assert!(check_status("AAPL", StatusCode::OK).is_ok());
        for status in [
            StatusCode::TOO_MANY_REQUESTS,
            StatusCode::FORBIDDEN,
            StatusCode::INTERNAL_SERVER_ERROR,
            StatusCode::BAD_GATEWAY,
        ] {
            assert!(matches!(check_status("AAPL", status), Err(AppError::DataUnavailable(_))));
        }
    }

    #[test]
    fn test_fetch_without_api_key() {
        let client = FmpClient::new(None, "http://localhost:1/", Duration::from_secs(1)).unwrap();
        assert!(!client.has_api_key());

        let result = tokio_test::block_on(client.fetch("AAPL", chrono::Duration::days(30)));
        assert!(matches!(result, Err(AppError::DataUnavailable(msg)) if msg.contains("FMP_API_KEY")));
    }

    #[test]
    fn test_fetch_with_unrepresentable_lookback() {
        let client = FmpClient::new(
            Some("demo".to_string()),
            "http://localhost:1/",
            Duration::from_secs(1),
        )
        .unwrap();

        let result = tokio_test::block_on(client.fetch("AAPL", chrono::Duration::days(365_000_000)));
        assert!(matches!(result, Err(AppError::DataUnavailable(msg)) if msg.contains("out of range")));
    }
}
