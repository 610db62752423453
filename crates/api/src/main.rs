use std::sync::Arc;

use sqlx::postgres::PgPoolOptions;

use stockpile_api::{ApiConfig, AppState, build_router};
use stockpile_bridge::{
    HttpEventForwarder, InMemorySeenSet, OrderWatcher, PollingSource, WatcherConfig,
};
use stockpile_ledger::{InMemoryStockStore, PostgresStockStore, StockStore};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    stockpile_observability::init();

    let config = ApiConfig::from_env()?;

    let store: Arc<dyn StockStore> = match &config.database_url {
        Some(url) => {
            let pool = PgPoolOptions::new().max_connections(10).connect(url).await?;
            let store = PostgresStockStore::new(pool);
            store.ensure_schema().await?;
            Arc::new(store)
        }
        None => {
            tracing::warn!("DATABASE_URL not set; using in-memory store");
            Arc::new(InMemoryStockStore::new())
        }
    };

    // One watcher per process: the polling source works against either
    // store backend and the seen-set keeps forwarding at most once per
    // process lifetime.
    let forwarder = HttpEventForwarder::new(
        config.notifier_url.clone(),
        config.journal_path.clone(),
        HttpEventForwarder::DEFAULT_TIMEOUT,
    )
    .map_err(|e| anyhow::anyhow!("forwarder init failed: {e}"))?;
    let watcher = OrderWatcher::spawn(
        "order-watcher",
        WatcherConfig::default(),
        PollingSource::new(store.clone(), config.poll_interval),
        InMemorySeenSet::new(),
        forwarder,
    );

    let app = build_router(AppState {
        store: store.clone(),
    });

    let listener = tokio::net::TcpListener::bind(&config.bind_addr).await?;
    tracing::info!("api listening on {}", listener.local_addr()?);

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
        })
        .await?;

    // Stop signal: let any in-flight forwarding finish, start no new cycles.
    watcher.shutdown();
    Ok(())
}
