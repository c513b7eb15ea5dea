//! Cached metrics lookups for single tickers, ticker lists and charts.

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, error, info, warn};

use crate::config::Config;
use crate::error::{AppError, Result};
use crate::services::metrics;
use crate::services::metrics_cache::{normalize_ticker, MetricsCache};
use crate::sources::DataSource;
use crate::types::{ChartSeries, MetricsRecord, MetricsResponse, PriceSeries, TickerResult};

/// Result of a metrics lookup.
#[derive(Debug, Clone, PartialEq)]
pub struct MetricsLookup {
    pub record: MetricsRecord,
    /// True when served from the cache without an upstream call.
    pub cached: bool,
    /// When the cached record was computed; set only for cache hits.
    pub cache_timestamp: Option<DateTime<Utc>>,
}

impl MetricsLookup {
    pub fn to_response(&self) -> MetricsResponse {
        MetricsResponse::from_record(&self.record, self.cached, self.cache_timestamp)
    }
}

/// Lookup-compute-store pipeline over an upstream source and the cache.
pub struct StockService {
    source: Arc<dyn DataSource>,
    cache: MetricsCache,
    lookback: chrono::Duration,
    chart_window_days: i64,
    /// One lock per ticker currently being refreshed.
    in_flight: DashMap<String, Arc<Mutex<()>>>,
}

impl StockService {
    pub fn new(source: Arc<dyn DataSource>, cache: MetricsCache, config: &Config) -> Arc<Self> {
        Arc::new(Self {
            source,
            cache,
            lookback: config.lookback(),
            chart_window_days: config.chart_window_days,
            in_flight: DashMap::new(),
        })
    }

    pub fn cache(&self) -> &MetricsCache {
        &self.cache
    }

    /// Metrics for one ticker, from the cache when fresh.
    pub async fn get_metrics(&self, ticker: &str) -> Result<MetricsLookup> {
        let key = normalize_ticker(ticker);
        if key.is_empty() {
            return Err(AppError::BadRequest("Ticker symbol is required".to_string()));
        }

        if let Some(hit) = self.cached(&key) {
            return Ok(hit);
        }

        // Declared before `lock` so it drops after it, on return or cancellation.
        let _cleanup = InFlightCleanup {
            in_flight: &self.in_flight,
            key: &key,
        };
        let lock = self
            .in_flight
            .entry(key.clone())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone();
        let _guard = lock.lock().await;

        // Another request may have refreshed while we waited.
        if let Some(hit) = self.cached(&key) {
            return Ok(hit);
        }
        let record = self.refresh(&key).await?;
        Ok(MetricsLookup {
            record,
            cached: false,
            cache_timestamp: None,
        })
    }

    /// Metrics for several tickers. Blank entries are skipped; failures
    /// become error rows instead of failing the batch.
    pub async fn get_many<I, S>(&self, tickers: I) -> Vec<TickerResult>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut results = Vec::new();
        for ticker in tickers {
            let key = normalize_ticker(ticker.as_ref());
            if key.is_empty() {
                continue;
            }

            let row = match self.get_metrics(&key).await {
                Ok(lookup) => TickerResult::Metrics(lookup.to_response()),
                Err(e) => TickerResult::Error {
                    ticker: key,
                    error: e.to_string(),
                },
            };
            results.push(row);
        }
        results
    }

    /// Windowed chart data. Always fetches the full lookback and refreshes
    /// the cached record from it.
    pub async fn get_chart_series(&self, ticker: &str) -> Result<ChartSeries> {
        let key = normalize_ticker(ticker);
        if key.is_empty() {
            return Err(AppError::BadRequest("Ticker symbol is required".to_string()));
        }

        let series = self.fetch(&key).await?;
        let record = metrics::compute(&key, &series)?;
        self.store_quietly(&key, &record);

        metrics::chart_series(&key, &series, self.chart_window_days)
    }

    /// Delete expired cache rows.
    pub fn purge_expired(&self) -> Result<usize> {
        Ok(self.cache.purge_expired()?)
    }

    fn cached(&self, key: &str) -> Option<MetricsLookup> {
        self.cache.lookup(key).map(|entry| MetricsLookup {
            cache_timestamp: Some(entry.computed_at()),
            record: entry.record,
            cached: true,
        })
    }

    async fn refresh(&self, key: &str) -> Result<MetricsRecord> {
        let series = self.fetch(key).await?;
        let record = metrics::compute(key, &series)?;
        self.store_quietly(key, &record);
        info!(
            "Computed metrics for {}: {} points, signal {}",
            key, record.data_points, record.signal
        );
        Ok(record)
    }

    async fn fetch(&self, key: &str) -> Result<PriceSeries> {
        debug!("Fetching {} from {}", key, self.source.name());
        self.source.fetch(key, self.lookback).await.map_err(|e| {
            error!("Upstream {} failed for {}: {}", self.source.name(), key, e);
            e
        })
    }

    /// A broken cache must never fail a freshly computed result.
    fn store_quietly(&self, key: &str, record: &MetricsRecord) {
        if let Err(e) = self.cache.store(key, record) {
            warn!("Failed to cache metrics for {}: {}", key, e);
        }
    }
}

/// Drops a ticker's in-flight lock once no request holds a clone of it.
struct InFlightCleanup<'a> {
    in_flight: &'a DashMap<String, Arc<Mutex<()>>>,
    key: &'a str,
}

impl Drop for InFlightCleanup<'_> {
    fn drop(&mut self) {
        self.in_flight
            .remove_if(self.key, |_, lock| Arc::strong_count(lock) == 1);
    }
}
