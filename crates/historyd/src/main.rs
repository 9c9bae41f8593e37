use jobhistory::api;
use jobhistory::config;
use jobhistory::db;
use jobhistory::jobs::{FsLogTailReader, HistoryService, JobsRepo};

use std::sync::Arc;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,sqlx=warn".into()),
        )
        .with(tracing_subscriber::fmt::layer().compact())
        .init();

    let cfg = config::Config::from_env()?;

    info!(
        api = cfg.api_addr.as_deref().unwrap_or("disabled"),
        migrate_on_startup = cfg.migrate_on_startup,
        log_root = %cfg
            .log_root
            .as_ref()
            .map(|p| p.display().to_string())
            .unwrap_or_else(|| "<absolute paths>".to_string()),
        log_tail_lines = cfg.log_tail_lines,
        query_timeout_ms = cfg.query_timeout.map(|d| d.as_millis() as u64).unwrap_or(0),
        "historyd starting"
    );

    let pool = db::make_pool(&cfg.database_url).await?;
    if cfg.migrate_on_startup {
        db::run_migrations(&pool).await?;
        info!("migrations applied");
    }

    let history = HistoryService::new(
        Arc::new(JobsRepo::new(pool.clone())),
        Arc::new(FsLogTailReader::new(cfg.log_root.clone())),
    )
    .with_log_tail_lines(cfg.log_tail_lines)
    .with_query_timeout(cfg.query_timeout);

    let app = api::router(api::ApiState { history });

    let Some(addr) = cfg.api_addr else {
        info!("api disabled, nothing to serve");
        return Ok(());
    };

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!("history api listening on http://{addr}");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    pool.close().await;
    info!("historyd stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!(error = %e, "failed to listen for ctrl-c");
        std::future::pending::<()>().await;
    }
    info!("shutdown requested");
}
