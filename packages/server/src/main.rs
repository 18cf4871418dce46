use std::sync::Arc;

use anyhow::Context;
use api::AppState;
use db::{DbConfig, NavRepository};
use dispatch::{Coordinator, Dispatcher, Queue, SimpleWorker};
use scrape_core::AppConfig;
use scrape_core::config::LogFormat;
use storage::StatStorage;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    // --- Configuration ---
    let config = AppConfig::from_env().context("Invalid configuration")?;

    // --- Tracing ---
    init_tracing(config.log.format);
    tracing::info!(
        addr = %config.bind_addr(),
        worker_num = config.core.worker_num,
        queue_num = config.core.queue_num,
        sync = config.core.sync,
        "Loaded configuration"
    );

    // --- Metrics ---
    let metrics = api::metrics::init_metrics();

    // --- Database ---
    let db = db::init(&DbConfig::endpoint(&config.db_endpoint))
        .await
        .context("Failed to initialize database")?;

    // --- Stat storage ---
    let stats = Arc::new(StatStorage::from_config(&config.stat).context("Invalid stat storage")?);
    stats.init().await.context("Failed to load stat storage")?;
    tracing::info!(
        engine = stats.engine_str(),
        total_count = stats.total_count(),
        "Stat storage ready"
    );

    // --- Queue ---
    let dispatcher = Dispatcher::new()
        .with_nav_repository(NavRepository::new(db))
        .with_fan_out(config.batch_workers);
    let worker = SimpleWorker::with_capacity(config.core.queue_num).with_runner(dispatcher);
    let queue = Arc::new(Queue::new(worker, config.core.worker_num)?);
    queue.start()?;

    // --- App state ---
    let coordinator = Coordinator::new(queue.clone()).with_hide_token(config.log.hide_token);
    let shutdown_timeout = config.core.shutdown_timeout;
    let addr = config.bind_addr();
    let mut state = AppState::new(config, coordinator, stats.clone());
    if let Some(handle) = metrics {
        state = state.with_metrics(handle);
    }
    let app = api::router(Arc::new(state));

    // --- Start server ---
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind to {addr}"))?;
    tracing::info!(%addr, "Starting server");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    // --- Post-shutdown cleanup ---
    tracing::info!("Server stopped accepting connections, draining queue");

    queue.shutdown();
    if let Err(e) = queue.wait_timeout(shutdown_timeout).await {
        tracing::warn!(error = %e, usage = queue.usage(), "Queue did not drain in time");
    }

    stats.close().await.context("Failed to persist stat storage")?;

    tracing::info!("Graceful shutdown complete");
    Ok(())
}

fn init_tracing(format: LogFormat) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "info".into());
    let registry = tracing_subscriber::registry().with(filter);

    match format {
        LogFormat::Json => registry.with(tracing_subscriber::fmt::layer().json()).init(),
        LogFormat::Text => registry.with(tracing_subscriber::fmt::layer()).init(),
    }
}

/// Wait for SIGINT (Ctrl-C) or SIGTERM on Unix.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for Ctrl-C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            tracing::info!("Received SIGINT (Ctrl-C), starting graceful shutdown");
        }
        () = terminate => {
            tracing::info!("Received SIGTERM, starting graceful shutdown");
        }
    }
}
