pub mod fmp;

pub use fmp::FmpClient;

use async_trait::async_trait;

use crate::error::Result;
use crate::types::PriceSeries;

/// Upstream provider of daily price history.
#[async_trait]
pub trait DataSource: Send + Sync {
    /// Short provider name for logs.
    fn name(&self) -> &str;

    /// Daily series for `ticker` covering the trailing `lookback`.
    ///
    /// A valid ticker with nothing in range yields an empty series.
    /// Transport failures and unknown tickers yield
    /// `AppError::DataUnavailable`.
    async fn fetch(&self, ticker: &str, lookback: chrono::Duration) -> Result<PriceSeries>;
}
