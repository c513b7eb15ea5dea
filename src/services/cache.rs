//! Persistence interface for cached metrics records.

use chrono::{DateTime, Utc};
use dashmap::DashMap;

use crate::error::StoreError;
use crate::types::CacheEntry;

/// Keyed storage for cache entries.
///
/// Keys are already-normalized tickers. Implementations must tolerate
/// concurrent `upsert` calls for the same key: the last writer wins and
/// exactly one entry remains.
pub trait CacheStore: Send + Sync {
    /// Entry for `ticker`, regardless of age.
    fn get(&self, ticker: &str) -> Result<Option<CacheEntry>, StoreError>;

    /// Insert or overwrite the entry for its ticker.
    fn upsert(&self, entry: &CacheEntry) -> Result<(), StoreError>;

    /// Remove the entry for `ticker`. Returns whether one existed.
    fn remove(&self, ticker: &str) -> Result<bool, StoreError>;

    /// Remove the entry for `ticker` only if it was computed strictly before
    /// `cutoff`. A newer entry written since the caller's read is kept.
    fn remove_if_older_than(&self, ticker: &str, cutoff: DateTime<Utc>) -> Result<bool, StoreError>;

    /// Delete entries computed strictly before `cutoff`. Returns the count.
    fn purge_older_than(&self, cutoff: DateTime<Utc>) -> Result<usize, StoreError>;

    /// Number of stored entries, including stale ones.
    fn len(&self) -> Result<usize, StoreError>;

    fn is_empty(&self) -> Result<bool, StoreError> {
        Ok(self.len()? == 0)
    }
}

/// In-process store backed by a concurrent map.
#[derive(Default)]
pub struct MemoryStore {
    data: DashMap<String, CacheEntry>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl CacheStore for MemoryStore {
    fn get(&self, ticker: &str) -> Result<Option<CacheEntry>, StoreError> {
        Ok(self.data.get(ticker).map(|e| e.value().clone()))
    }

    fn upsert(&self, entry: &CacheEntry) -> Result<(), StoreError> {
        self.data.insert(entry.ticker().to_string(), entry.clone());
        Ok(())
    }

    fn remove(&self, ticker: &str) -> Result<bool, StoreError> {
        Ok(self.data.remove(ticker).is_some())
    }

    fn remove_if_older_than(&self, ticker: &str, cutoff: DateTime<Utc>) -> Result<bool, StoreError> {
        Ok(self
            .data
            .remove_if(ticker, |_, entry| entry.computed_at() < cutoff)
            .is_some())
    }

    fn purge_older_than(&self, cutoff: DateTime<Utc>) -> Result<usize, StoreError> {
        let before = self.data.len();
        self.data.retain(|_, entry| entry.computed_at() >= cutoff);
        Ok(before.saturating_sub(self.data.len()))
    }

    fn len(&self) -> Result<usize, StoreError> {
        Ok(self.data.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{MetricsRecord, Signal};

    fn entry(ticker: &str, price: f64, computed_at: DateTime<Utc>) -> CacheEntry {
        CacheEntry::new(MetricsRecord {
            ticker: ticker.to_string(),
            sma_50: Some(price),
            sma_200: None,
            deviation: None,
            signal: Signal::Neutral,
            current_price: price,
            data_points: 60,
            computed_at,
        })
    }

    #[test]
    fn test_memory_store_basic() {
        let store = MemoryStore::new();
        let now = Utc::now();
        store.upsert(&entry("AAPL", 100.0, now)).unwrap();

        assert_eq!(store.get("AAPL").unwrap().unwrap().record.current_price, 100.0);
        assert!(store.get("MSFT").unwrap().is_none());
    }

    #[test]
    fn test_memory_store_overwrite() {
        let store = MemoryStore::new();
        let now = Utc::now();
        store.upsert(&entry("AAPL", 100.0, now)).unwrap();
        store.upsert(&entry("AAPL", 105.0, now)).unwrap();

        assert_eq!(store.len().unwrap(), 1);
        assert_eq!(store.get("AAPL").unwrap().unwrap().record.current_price, 105.0);
    }

    #[test]
    fn test_memory_store_remove() {
        let store = MemoryStore::new();
        store.upsert(&entry("AAPL", 100.0, Utc::now())).unwrap();

        assert!(store.remove("AAPL").unwrap());
        assert!(!store.remove("AAPL").unwrap());
        assert!(store.is_empty().unwrap());
    }

    #[test]
    fn test_memory_store_conditional_remove() {
        let store = MemoryStore::new();
        let now = Utc::now();
        let cutoff = now - chrono::Duration::hours(24);

        store.upsert(&entry("AAPL", 100.0, now)).unwrap();
        assert!(!store.remove_if_older_than("AAPL", cutoff).unwrap());
        assert_eq!(store.len().unwrap(), 1);

        store.upsert(&entry("AAPL", 90.0, now - chrono::Duration::hours(30))).unwrap();
        assert!(store.remove_if_older_than("AAPL", cutoff).unwrap());
        assert!(store.is_empty().unwrap());
    }

    #[test]
    fn test_memory_store_purge() {
        let store = MemoryStore::new();
        let now = Utc::now();
        store.upsert(&entry("OLD", 1.0, now - chrono::Duration::hours(30))).unwrap();
        store.upsert(&entry("NEW", 2.0, now)).unwrap();

        let purged = store.purge_older_than(now - chrono::Duration::hours(24)).unwrap();
        assert_eq!(purged, 1);
        assert!(store.get("OLD").unwrap().is_none());
        assert!(store.get("NEW").unwrap().is_some());
    }
}
