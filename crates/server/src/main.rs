use std::sync::Arc;

use anyhow::Context;
use cronica_catalog::TmdbClient;
use cronica_server::config::ServerConfig;
use cronica_tracker::{LogSink, Tracker};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = ServerConfig::from_env()?;

    // Initialize tracing
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into());
    if config.log_json {
        tracing_subscriber::fmt().json().with_env_filter(filter).init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }

    info!(db_path = %config.db_path, "connecting to database");
    let pool = cronica_db::connect(&config.db_path)
        .await
        .context("failed to connect to database")?;

    // Run migrations
    cronica_db::migrate::run(&pool)
        .await
        .context("failed to run migrations")?;
    info!("migrations complete");

    let catalog = TmdbClient::new(config.tmdb_api_key.clone()).with_language(&config.tmdb_language);
    let app_state = cronica_server::state::AppState::new(Tracker::new(pool, Arc::new(catalog)));

    let scheduled = app_state.tracker.reschedule_all().await;
    info!(scheduled, "pending notifications restored");

    // Spawn notification delivery loop
    {
        let tracker = app_state.tracker.clone();
        let interval = std::time::Duration::from_secs(config.notify_interval_secs.max(1));
        tokio::spawn(async move {
            loop {
                let delivered = tracker.deliver_due_notifications(&LogSink).await;
                if delivered > 0 {
                    info!(delivered, "notifications delivered");
                }
                tokio::time::sleep(interval).await;
            }
        });
    }

    let app = cronica_server::routes::build_router(app_state);

    let listener = tokio::net::TcpListener::bind(&config.bind_addr)
        .await
        .context("failed to bind")?;
    info!(addr = %config.bind_addr, "server listening");

    axum::serve(listener, app).await?;
    Ok(())
}
