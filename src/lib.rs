//! Arthos - stock metrics server with SMA indicators, deviation signals and a
//! time-bounded metrics cache.

pub mod api;
pub mod config;
pub mod error;
pub mod services;
pub mod sources;
pub mod types;

use std::sync::Arc;

use config::Config;
use services::StockService;

/// Application state shared across handlers.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub stock_service: Arc<StockService>,
}

// Re-export commonly used types
pub use error::{AppError, Result};
pub use types::*;
