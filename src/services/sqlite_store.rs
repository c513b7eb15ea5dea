//! SQLite persistence for cached metrics records.
//!
//! One row per normalized ticker in `metrics_cache`; writes are upserts so
//! concurrent refreshes of the same ticker never produce duplicates.

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::path::Path;
use std::sync::{Mutex, MutexGuard};
use tracing::{debug, info};

use crate::error::StoreError;
use crate::services::cache::CacheStore;
use crate::types::{CacheEntry, MetricsRecord, Signal};

/// SQLite-backed cache store.
pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    /// Open (or create) a store at the given path.
    pub fn new<P: AsRef<Path>>(path: P) -> Result<Self, StoreError> {
        let conn = Connection::open(path)?;
        let store = Self {
            conn: Mutex::new(conn),
        };
        store.init_schema()?;
        info!("SQLite cache store initialized");
        Ok(store)
    }

    /// Create an in-memory store (for testing).
    pub fn new_in_memory() -> Result<Self, StoreError> {
        let conn = Connection::open_in_memory()?;
        let store = Self {
            conn: Mutex::new(conn),
        };
        store.init_schema()?;
        debug!("In-memory SQLite cache store initialized");
        Ok(store)
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>, StoreError> {
        self.conn.lock().map_err(|_| StoreError::Poisoned)
    }

    fn init_schema(&self) -> Result<(), StoreError> {
        let conn = self.lock()?;

        conn.execute(
            "CREATE TABLE IF NOT EXISTS metrics_cache (
                ticker TEXT PRIMARY KEY,
                sma_50 REAL,
                sma_200 REAL,
                deviation REAL,
                signal TEXT NOT NULL,
                current_price REAL NOT NULL,
                data_points INTEGER NOT NULL,
                computed_at INTEGER NOT NULL
            )",
            [],
        )?;

        conn.execute(
            "CREATE INDEX IF NOT EXISTS idx_metrics_cache_computed_at
             ON metrics_cache(computed_at)",
            [],
        )?;

        Ok(())
    }
}

/// Raw column values before validation.
struct CacheRow {
    ticker: String,
    sma_50: Option<f64>,
    sma_200: Option<f64>,
    deviation: Option<f64>,
    signal: String,
    current_price: f64,
    data_points: i64,
    computed_at: i64,
}

impl CacheRow {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            ticker: row.get(0)?,
            sma_50: row.get(1)?,
            sma_200: row.get(2)?,
            deviation: row.get(3)?,
            signal: row.get(4)?,
            current_price: row.get(5)?,
            data_points: row.get(6)?,
            computed_at: row.get(7)?,
        })
    }

    fn into_entry(self) -> Result<CacheEntry, StoreError> {
        let corrupt = |reason: String| StoreError::Corrupt {
            ticker: self.ticker.clone(),
            reason,
        };

        let signal: Signal = self.signal.parse().map_err(corrupt)?;
        let computed_at = DateTime::<Utc>::from_timestamp_millis(self.computed_at)
            .ok_or_else(|| corrupt(format!("bad timestamp {}", self.computed_at)))?;
        let data_points = usize::try_from(self.data_points)
            .map_err(|_| corrupt(format!("bad data_points {}", self.data_points)))?;

        Ok(CacheEntry::new(MetricsRecord {
            ticker: self.ticker,
            sma_50: self.sma_50,
            sma_200: self.sma_200,
            deviation: self.deviation,
            signal,
            current_price: self.current_price,
            data_points,
            computed_at,
        }))
    }
}

impl CacheStore for SqliteStore {
    fn get(&self, ticker: &str) -> Result<Option<CacheEntry>, StoreError> {
        let conn = self.lock()?;

        let row = conn
            .query_row(
                "SELECT ticker, sma_50, sma_200, deviation, signal, current_price,
                        data_points, computed_at
                 FROM metrics_cache WHERE ticker = ?1",
                params![ticker],
                CacheRow::from_row,
            )
            .optional()?;

        row.map(CacheRow::into_entry).transpose()
    }

    fn upsert(&self, entry: &CacheEntry) -> Result<(), StoreError> {
        let conn = self.lock()?;
        let record = &entry.record;

        conn.execute(
            "INSERT INTO metrics_cache
             (ticker, sma_50, sma_200, deviation, signal, current_price, data_points, computed_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
             ON CONFLICT(ticker) DO UPDATE SET
                sma_50 = excluded.sma_50,
                sma_200 = excluded.sma_200,
                deviation = excluded.deviation,
                signal = excluded.signal,
                current_price = excluded.current_price,
                data_points = excluded.data_points,
                computed_at = excluded.computed_at",
            params![
                record.ticker,
                record.sma_50,
                record.sma_200,
                record.deviation,
                record.signal.as_str(),
                record.current_price,
                record.data_points as i64,
                record.computed_at.timestamp_millis(),
            ],
        )?;

        debug!("Cached metrics for {}", record.ticker);
        Ok(())
    }

    fn remove(&self, ticker: &str) -> Result<bool, StoreError> {
        let conn = self.lock()?;
        let removed = conn.execute("DELETE FROM metrics_cache WHERE ticker = ?1", params![ticker])?;
        Ok(removed > 0)
    }

    fn remove_if_older_than(&self, ticker: &str, cutoff: DateTime<Utc>) -> Result<bool, StoreError> {
        let conn = self.lock()?;
        let removed = conn.execute(
            "DELETE FROM metrics_cache WHERE ticker = ?1 AND computed_at < ?2",
            params![ticker, cutoff.timestamp_millis()],
        )?;
        Ok(removed > 0)
    }

    fn purge_older_than(&self, cutoff: DateTime<Utc>) -> Result<usize, StoreError> {
        let conn = self.lock()?;
        let removed = conn.execute(
            "DELETE FROM metrics_cache WHERE computed_at < ?1",
            params![cutoff.timestamp_millis()],
        )?;
        Ok(removed)
    }

    fn len(&self) -> Result<usize, StoreError> {
        let conn = self.lock()?;
        let count: i64 = conn.query_row("SELECT COUNT(*) FROM metrics_cache", [], |row| row.get(0))?;
        Ok(count as usize)
    }
}
