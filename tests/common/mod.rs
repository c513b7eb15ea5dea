//! Shared fixtures for integration tests.

#![allow(dead_code)]

use arthos::config::Config;
use arthos::error::{AppError, Result};
use arthos::services::{CacheStore, MemoryStore, MetricsCache, StockService};
use arthos::sources::DataSource;
use arthos::types::{PricePoint, PriceSeries};
use arthos::AppState;
use async_trait::async_trait;
use chrono::NaiveDate;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

/// Upstream that replays fixed close series per ticker.
///
/// Unknown tickers fail with `DataUnavailable`; tickers mapped to an empty
/// vector return an empty series.
#[derive(Default)]
pub struct ScriptedSource {
    closes: HashMap<String, Vec<f64>>,
    calls: AtomicUsize,
}

impl ScriptedSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, ticker: &str, closes: Vec<f64>) -> Self {
        self.closes.insert(ticker.to_string(), closes);
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl DataSource for ScriptedSource {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn fetch(&self, ticker: &str, _lookback: chrono::Duration) -> Result<PriceSeries> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let closes = self
            .closes
            .get(ticker)
            .ok_or_else(|| AppError::DataUnavailable(format!("Unknown ticker: {}", ticker)))?;
        Ok(series(closes))
    }
}

/// Daily series starting 2023-01-02 with the given closes.
pub fn series(closes: &[f64]) -> PriceSeries {
    let start = NaiveDate::from_ymd_opt(2023, 1, 2).unwrap();
    let points = closes
        .iter()
        .enumerate()
        .map(|(i, c)| PricePoint::flat(start + chrono::Duration::days(i as i64), *c))
        .collect();
    PriceSeries::new(points).unwrap()
}

pub struct Harness {
    pub source: Arc<ScriptedSource>,
    pub store: Arc<dyn CacheStore>,
    pub service: Arc<StockService>,
    pub state: AppState,
}

pub fn harness(source: ScriptedSource) -> Harness {
    harness_with_store(source, Arc::new(MemoryStore::new()))
}

pub fn harness_with_store(source: ScriptedSource, store: Arc<dyn CacheStore>) -> Harness {
    let config = Config::default();
    let source = Arc::new(source);
    let cache = MetricsCache::new(store.clone(), config.cache.freshness());
    let service = StockService::new(source.clone(), cache, &config);
    let state = AppState {
        config: Arc::new(config),
        stock_service: service.clone(),
    };

    Harness {
        source,
        store,
        service,
        state,
    }
}
