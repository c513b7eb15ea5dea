use std::env;
use std::str::FromStr;

/// Default upstream base URL (stable API).
pub const DEFAULT_FMP_BASE_URL: &str = "https://financialmodelingprep.com/stable";

/// Upper bound for day-count settings (about a century).
const MAX_DAYS: i64 = 36_500;
/// Upper bound for the cache freshness window (ten years).
const MAX_TTL_MINUTES: i64 = 10 * 365 * 24 * 60;

/// Cache configuration.
#[derive(Debug, Clone)]
pub struct CacheConfig {
    /// SQLite database path (":memory:" for an in-memory store).
    pub database_path: String,
    /// Maximum age of a cached record before it is treated as stale, in minutes.
    pub ttl_minutes: i64,
    /// Interval between expired-row purges, in seconds (0 disables the task).
    pub purge_interval_secs: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            database_path: "arthos.db".to_string(),
            ttl_minutes: 24 * 60,
            purge_interval_secs: 3600,
        }
    }
}

impl CacheConfig {
    /// Freshness window as a chrono duration.
    pub fn freshness(&self) -> chrono::Duration {
        chrono::Duration::minutes(self.ttl_minutes)
    }
}

/// Application configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// Server host address.
    pub host: String,
    /// Server port.
    pub port: u16,
    /// Financial Modeling Prep API key.
    pub fmp_api_key: Option<String>,
    /// Financial Modeling Prep base URL.
    pub fmp_base_url: String,
    /// Upstream request timeout (seconds).
    pub upstream_timeout_secs: u64,
    /// History requested from upstream, in calendar days.
    pub lookback_days: i64,
    /// Chart display window, in calendar days.
    pub chart_window_days: i64,
    /// Cache settings.
    pub cache: CacheConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8000,
            fmp_api_key: None,
            fmp_base_url: DEFAULT_FMP_BASE_URL.to_string(),
            upstream_timeout_secs: 30,
            lookback_days: 730,
            chart_window_days: 365,
            cache: CacheConfig::default(),
        }
    }
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Self {
        Self::from_vars(|key| env::var(key).ok())
    }

    /// Load configuration through `var`. Missing, unparseable and
    /// out-of-range values fall back to defaults.
    pub fn from_vars<F>(var: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();

        Self {
            host: var("HOST").unwrap_or(defaults.host),
            port: parse_var(&var, "PORT").unwrap_or(defaults.port),
            fmp_api_key: var("FMP_API_KEY").filter(|k| !k.trim().is_empty()),
            fmp_base_url: var("FMP_API_BASE_URL").unwrap_or(defaults.fmp_base_url),
            upstream_timeout_secs: parse_var(&var, "UPSTREAM_TIMEOUT_SECS")
                .unwrap_or(defaults.upstream_timeout_secs),
            lookback_days: parse_var(&var, "LOOKBACK_DAYS")
                .filter(|d: &i64| (1..=MAX_DAYS).contains(d))
                .unwrap_or(defaults.lookback_days),
            chart_window_days: parse_var(&var, "CHART_WINDOW_DAYS")
                .filter(|d: &i64| (1..=MAX_DAYS).contains(d))
                .unwrap_or(defaults.chart_window_days),
            cache: CacheConfig {
                database_path: var("DATABASE_PATH").unwrap_or(defaults.cache.database_path),
                ttl_minutes: parse_var(&var, "CACHE_TTL_MINUTES")
                    .filter(|m: &i64| (0..=MAX_TTL_MINUTES).contains(m))
                    .unwrap_or(defaults.cache.ttl_minutes),
                purge_interval_secs: parse_var(&var, "CACHE_PURGE_INTERVAL_SECS")
                    .unwrap_or(defaults.cache.purge_interval_secs),
            },
        }
    }

    /// Upstream lookback as a chrono duration.
    pub fn lookback(&self) -> chrono::Duration {
        chrono::Duration::days(self.lookback_days)
    }
}

fn parse_var<T, F>(var: &F, key: &str) -> Option<T>
where
    T: FromStr,
    F: Fn(&str) -> Option<String>,
{
    var(key).and_then(|v| parse_value(&v))
}

fn parse_value<T: FromStr>(raw: &str) -> Option<T> {
    raw.trim().parse().ok()
}
