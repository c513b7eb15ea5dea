use arthos::config::Config;
use arthos::services::{CacheStore, MemoryStore, MetricsCache, SqliteStore, StockService};
use arthos::sources::FmpClient;
use arthos::{api, AppState};
use std::sync::Arc;
use std::time::Duration;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Open the configured cache store, falling back to memory if SQLite is unusable.
fn open_store(config: &Config) -> Arc<dyn CacheStore> {
    let path = &config.cache.database_path;
    let opened = if path == ":memory:" {
        SqliteStore::new_in_memory()
    } else {
        SqliteStore::new(path)
    };

    match opened {
        Ok(store) => {
            info!("Using SQLite cache at {}", path);
            Arc::new(store)
        }
        Err(e) => {
            warn!("SQLite cache unavailable ({}), using in-memory cache", e);
            Arc::new(MemoryStore::new())
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables
    dotenvy::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "arthos=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    let config = Arc::new(Config::from_env());
    info!("Starting Arthos server on {}:{}", config.host, config.port);

    let fmp = FmpClient::new(
        config.fmp_api_key.clone(),
        config.fmp_base_url.clone(),
        Duration::from_secs(config.upstream_timeout_secs),
    )?;
    if !fmp.has_api_key() {
        warn!("FMP_API_KEY not set; upstream lookups will fail until it is configured");
    }

    let cache = MetricsCache::new(open_store(&config), config.cache.freshness());
    info!("Cache freshness window: {} minutes", config.cache.ttl_minutes);

    let stock_service = StockService::new(Arc::new(fmp), cache, &config);

    // Periodic purge of expired cache rows
    if config.cache.purge_interval_secs > 0 {
        let stock_service = stock_service.clone();
        let interval = Duration::from_secs(config.cache.purge_interval_secs);
        tokio::spawn(async move {
            loop {
                tokio::time::sleep(interval).await;
                match stock_service.purge_expired() {
                    Ok(0) => {}
                    Ok(n) => info!("Purged {} expired cache entries", n),
                    Err(e) => warn!("Cache purge failed: {}", e),
                }
            }
        });
    }

    let state = AppState {
        config: config.clone(),
        stock_service,
    };

    // Build CORS layer
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    // Build the router
    let app = api::router()
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    // Start the server
    let addr = format!("{}:{}", config.host, config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!("Arthos server listening on {}", addr);

    axum::serve(listener, app).await?;

    Ok(())
}
