//! Stationcast Server: weather-station image fan-out pipeline.
//!
//! Main entry point that wires all crates together, starts the two worker
//! runners and serves the HTTP API.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing_subscriber::{EnvFilter, fmt};

use stationcast_api::{AppState, build_app};
use stationcast_core::config::AppConfig;
use stationcast_core::error::AppError;
use stationcast_status::StatusStore;
use stationcast_storage::{ArtifactStoreManager, ResultsReader, UrlSigner};
use stationcast_worker::sources::{HttpImageSource, HttpSnapshotSource};
use stationcast_worker::{
    CommandQueueManager, FeedExpander, JobDispatcher, StationImageWorker, WorkerRunner,
};

#[tokio::main]
async fn main() {
    let env = std::env::var("STATIONCAST_ENV").unwrap_or_else(|_| "development".to_string());
    let config = match AppConfig::load(&env) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Failed to load configuration: {e}");
            std::process::exit(1);
        }
    };

    init_logging(&config);
    tracing::info!(env = %env, "Configuration loaded");

    if let Err(e) = run(config).await {
        tracing::error!(error = %e, "Server error");
        std::process::exit(1);
    }
}

/// Initialize tracing/logging
fn init_logging(config: &AppConfig) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.logging.level));

    match config.logging.format.as_str() {
        "json" => {
            fmt()
                .json()
                .with_env_filter(filter)
                .with_target(true)
                .with_thread_ids(true)
                .init();
        }
        _ => {
            fmt()
                .pretty()
                .with_env_filter(filter)
                .with_target(true)
                .init();
        }
    }
}

/// Main server run function
async fn run(config: AppConfig) -> Result<(), AppError> {
    tracing::info!("Starting Stationcast v{}", env!("CARGO_PKG_VERSION"));

    tracing::info!(provider = %config.status.provider, "Initializing status store...");
    let status = StatusStore::new(&config.status).await?;

    tracing::info!(provider = %config.storage.provider, "Initializing artifact store...");
    let signer = UrlSigner::new(&config.storage.signing_secret, &config.server.public_base_url)?;
    let artifacts = ArtifactStoreManager::new(&config.storage, signer.clone()).await?;
    let results = ResultsReader::new(artifacts.clone());

    tracing::info!(provider = %config.queue.provider, "Initializing command queues...");
    let queues = CommandQueueManager::new(&config.queue).await?;
    let dispatcher = JobDispatcher::new(status.clone(), queues.clone());

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let grace = Duration::from_secs(config.server.shutdown_grace_seconds);

    let workers = if config.worker.enabled {
        let expander = FeedExpander::new(
            status.clone(),
            queues.clone(),
            Arc::new(HttpSnapshotSource::new(&config.feed)?),
            config.feed.clone(),
        );
        let station_worker = StationImageWorker::new(
            status.clone(),
            artifacts.clone(),
            Arc::new(HttpImageSource::new(&config.image)?),
            config.feed.item_key_field.clone(),
        );

        let runners = [
            WorkerRunner::new(
                queues.clone(),
                queues.start_queue(),
                Arc::new(expander),
                &config.worker,
            ),
            WorkerRunner::new(
                queues.clone(),
                queues.work_queue(),
                Arc::new(station_worker),
                &config.worker,
            ),
        ];
        runners
            .into_iter()
            .map(|runner| {
                let runner = runner.with_shutdown_grace(grace);
                let cancel = shutdown_rx.clone();
                tokio::spawn(async move { runner.run(cancel).await })
            })
            .collect::<Vec<JoinHandle<()>>>()
    } else {
        tracing::warn!("Worker runners disabled; commands will only be queued");
        Vec::new()
    };

    let state = AppState {
        config: Arc::new(config.clone()),
        status,
        dispatcher,
        results,
        artifacts,
        signer,
    };

    let app = build_app(state);
    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .map_err(|e| AppError::internal(format!("Failed to bind {addr}: {e}")))?;

    tracing::info!(addr = %addr, "Stationcast listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            shutdown_signal().await;
            let _ = shutdown_tx.send(true);
        })
        .await
        .map_err(|e| AppError::internal(format!("Server error: {e}")))?;

    for handle in workers {
        if let Err(e) = handle.await {
            tracing::error!(error = %e, "Worker task panicked");
        }
    }

    tracing::info!("Stationcast shut down");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}
