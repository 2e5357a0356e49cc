use anyhow::Context;
use payment_api::config::{AppConfig, LogFormat};
use payment_api::http::router::build_router;
use payment_api::metrics::PaymentMetrics;
use payment_api::repo::payments_repo::PaymentsRepo;
use payment_api::repo::PaymentStore;
use payment_api::service::lifecycle::LifecycleSettings;
use payment_api::settlement::RandomSettlement;
use payment_api::{cache, telemetry, AppState};
use sqlx::postgres::PgPoolOptions;
use std::sync::Arc;
use std::time::Duration;

const CACHE_STARTUP_PING_TIMEOUT: Duration = Duration::from_secs(5);

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    telemetry::init(LogFormat::from_env());

    let cfg = AppConfig::from_env();

    let pool = PgPoolOptions::new()
        .max_connections(cfg.database.pool_max)
        .idle_timeout(cfg.database.idle_timeout)
        .acquire_timeout(cfg.database.connect_timeout)
        .connect_with(cfg.database.connect_options()?)
        .await
        .context("failed to connect to PostgreSQL")?;

    sqlx::query("SELECT 1")
        .execute(&pool)
        .await
        .context("PostgreSQL connectivity check failed")?;
    tracing::info!("PostgreSQL connection established");

    sqlx::migrate!("./migrations").run(&pool).await?;
    tracing::info!("database schema is up to date");

    let store: Arc<dyn PaymentStore> = Arc::new(PaymentsRepo::new(pool.clone()));

    let cache = cache::from_config(&cfg.cache)?;
    match tokio::time::timeout(CACHE_STARTUP_PING_TIMEOUT, cache.ping()).await {
        Ok(true) => tracing::info!(backend = cache.backend(), "cache connection established"),
        _ => tracing::warn!(
            backend = cache.backend(),
            "cache not available, continuing without cache"
        ),
    }

    let metrics = PaymentMetrics::new()?;
    let settlement = Arc::new(RandomSettlement::new(cfg.lifecycle.success_probability));
    let state = AppState::new(
        store,
        cache,
        settlement,
        metrics,
        LifecycleSettings {
            resolution_delay: cfg.lifecycle.resolution_delay,
            default_currency: cfg.lifecycle.default_currency.clone(),
        },
    );

    if cfg.lifecycle.recovery_scan_enabled {
        if let Err(e) = state.lifecycle.recover_pending().await {
            tracing::warn!(error = %e, "recovery scan failed, stranded payments stay pending");
        }
    }

    let app = build_router(state);
    let listener = tokio::net::TcpListener::bind(&cfg.bind_addr).await?;
    tracing::info!("payment api listening on {}", cfg.bind_addr);
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    pool.close().await;
    tracing::info!("shutdown complete");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "failed to listen for ctrl-c");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    tracing::info!("shutdown signal received, closing HTTP server");
}
