//! Time-bounded cache of computed metrics records.

use chrono::{DateTime, Utc};
use std::sync::Arc;
use tracing::{debug, warn};

use crate::error::StoreError;
use crate::services::cache::CacheStore;
use crate::types::{CacheEntry, MetricsRecord};

/// Cache key for a ticker: trimmed and uppercased.
pub fn normalize_ticker(ticker: &str) -> String {
    ticker.trim().to_uppercase()
}

/// Serves fresh records and writes new ones through an injected store.
#[derive(Clone)]
pub struct MetricsCache {
    store: Arc<dyn CacheStore>,
    freshness: chrono::Duration,
}

impl MetricsCache {
    pub fn new(store: Arc<dyn CacheStore>, freshness: chrono::Duration) -> Self {
        Self { store, freshness }
    }

    pub fn store_backend(&self) -> &Arc<dyn CacheStore> {
        &self.store
    }

    /// Fresh entry for `ticker`, if any.
    pub fn lookup(&self, ticker: &str) -> Option<CacheEntry> {
        self.lookup_at(ticker, Utc::now())
    }

    /// Fresh entry for `ticker` as of `now`.
    ///
    /// Stale and undecodable rows are removed on the way out. Store errors
    /// are logged and read as a miss.
    pub fn lookup_at(&self, ticker: &str, now: DateTime<Utc>) -> Option<CacheEntry> {
        let key = normalize_ticker(ticker);

        let entry = match self.store.get(&key) {
            Ok(Some(entry)) => entry,
            Ok(None) => {
                debug!("Cache miss for {}", key);
                return None;
            }
            Err(StoreError::Corrupt { reason, .. }) => {
                warn!("Dropping corrupt cache row for {}: {}", key, reason);
                self.evict(&key);
                return None;
            }
            Err(e) => {
                warn!("Cache read failed for {}: {}", key, e);
                return None;
            }
        };

        if entry.is_fresh(now, self.freshness) {
            debug!("Cache hit for {} (computed at {})", key, entry.computed_at());
            Some(entry)
        } else {
            debug!("Cache entry for {} expired (computed at {})", key, entry.computed_at());
            // Only the row we read; a refresh may have landed since.
            if let Some(cutoff) = now.checked_sub_signed(self.freshness) {
                if let Err(e) = self.store.remove_if_older_than(&key, cutoff) {
                    warn!("Failed to evict cache entry for {}: {}", key, e);
                }
            }
            None
        }
    }

    /// Upsert `record` under its normalized ticker, stamped with `record.computed_at`.
    pub fn store(&self, ticker: &str, record: &MetricsRecord) -> Result<(), StoreError> {
        let mut record = record.clone();
        record.ticker = normalize_ticker(ticker);
        self.store.upsert(&CacheEntry::new(record))
    }

    /// Delete every expired entry. Returns the number removed.
    pub fn purge_expired(&self) -> Result<usize, StoreError> {
        self.purge_expired_at(Utc::now())
    }

    pub fn purge_expired_at(&self, now: DateTime<Utc>) -> Result<usize, StoreError> {
        match now.checked_sub_signed(self.freshness) {
            Some(cutoff) => self.store.purge_older_than(cutoff),
            None => Ok(0),
        }
    }

    fn evict(&self, key: &str) {
        if let Err(e) = self.store.remove(key) {
            warn!("Failed to evict cache entry for {}: {}", key, e);
        }
    }
}
