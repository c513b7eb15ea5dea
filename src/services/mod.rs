pub mod cache;
pub mod metrics;
pub mod metrics_cache;
pub mod sqlite_store;
pub mod stock_service;

pub use cache::{CacheStore, MemoryStore};
pub use metrics_cache::{normalize_ticker, MetricsCache};
pub use sqlite_store::SqliteStore;
pub use stock_service::{MetricsLookup, StockService};
