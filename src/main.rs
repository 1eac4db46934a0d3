use std::sync::Arc;
use tracing::{error, info, warn};
use transcript_cache::{
    CacheMonitor, CacheService, Config, KeyValueBackend, PostgresStore, RedisBackend,
    SearchIndexingService, ServiceError,
};

#[tokio::main]
async fn main() -> Result<(), ServiceError> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_target(false)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .json()
        .init();

    let config = Config::from_env()?;

    info!(
        "Starting transcript cache service ({})",
        config.environment.as_str()
    );

    // Composition root: every service is an explicit object with injected
    // dependencies, torn down in reverse order on shutdown
    let backend = Arc::new(RedisBackend::new(config.redis.clone(), config.environment));
    let cache = Arc::new(CacheService::new(backend.clone(), config.ttl.clone()));
    let monitor = CacheMonitor::new(cache.clone(), config.monitor.clone(), config.environment);

    let store = Arc::new(PostgresStore::new(config.database.clone()).await?);
    store.initialize_schema().await?;
    let indexer = Arc::new(SearchIndexingService::new(
        store.clone(),
        config.indexing.clone(),
    ));

    // The cache is optional: a failed connect only means store-only mode
    if !backend.connect().await {
        warn!("Starting without cache, Redis is unreachable");
    }

    if config.monitor.enabled {
        monitor.start_monitoring(None);
    }

    // Background sweep for completed transcripts missing an index row
    {
        let indexer = indexer.clone();
        tokio::spawn(async move {
            match indexer.index_all_unindexed_transcripts().await {
                Ok(count) if count > 0 => info!("Indexed {} transcripts at startup", count),
                Ok(_) => {}
                Err(e) => warn!("Startup index sweep failed: {}", e),
            }
        });
    }

    wait_for_shutdown().await;

    info!("Shutting down");
    // Stop the monitor before closing the backend it probes
    monitor.stop_monitoring();
    backend.disconnect().await;

    Ok(())
}

#[cfg(unix)]
async fn wait_for_shutdown() {
    use tokio::signal::unix::{signal, SignalKind};

    match signal(SignalKind::terminate()) {
        Ok(mut sigterm) => {
            tokio::select! {
                _ = tokio::signal::ctrl_c() => info!("Received SIGINT"),
                _ = sigterm.recv() => info!("Received SIGTERM"),
            }
        }
        Err(e) => {
            error!("Failed to install SIGTERM handler: {}", e);
            let _ = tokio::signal::ctrl_c().await;
        }
    }
}

#[cfg(not(unix))]
async fn wait_for_shutdown() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!("Failed to listen for shutdown signal: {}", e);
    }
}
