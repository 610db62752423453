use std::sync::Arc;

use sqlx::postgres::PgPoolOptions;

use stockpile_ledger::PostgresStockStore;
use stockpile_notifier::http::{NotifierState, build_router};
use stockpile_notifier::{NotifierConfig, SmtpMailer};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    stockpile_observability::init();

    let config = NotifierConfig::from_env()?;

    let pool = PgPoolOptions::new()
        .max_connections(5)
        .connect(&config.database_url)
        .await?;
    let store = PostgresStockStore::new(pool);
    store.ensure_schema().await?;

    let mailer = SmtpMailer::new(
        &config.smtp_host,
        config.smtp_port,
        &config.smtp_user,
        &config.smtp_password,
        &config.smtp_from,
        config.smtp_use_tls,
    )?;

    let state = NotifierState {
        catalog: Arc::new(store),
        mailer: Arc::new(mailer),
    };

    let listener = tokio::net::TcpListener::bind(&config.bind_addr).await?;
    tracing::info!("notifier listening on {}", listener.local_addr()?);

    axum::serve(listener, build_router(state)).await?;
    Ok(())
}
