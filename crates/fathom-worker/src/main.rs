use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use sqlx::postgres::PgPoolOptions;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use fathom_core::Config;
use fathom_processing::MediaProcessor;
use fathom_storage::{BlobStore, S3BlobStore};
use fathom_worker::{
    ConsumerConfig, ContainerController, MediaWorker, MediaWorkerEventService, PgMediaStore,
    ShutdownHandle,
};

#[tokio::main]
async fn main() -> Result<(), anyhow::Error> {
    dotenvy::dotenv().ok();
    let config = Config::from_env()?;

    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| "fathom=debug".into()))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let pool = PgPoolOptions::new()
        .max_connections(config.db_max_connections)
        .connect(&config.database_url)
        .await
        .context("Failed to connect to database")?;

    let blobs: Arc<dyn BlobStore> = Arc::new(
        S3BlobStore::new(
            config.s3_bucket.clone(),
            config.s3_region.clone(),
            config.s3_endpoint.clone(),
        )
        .await
        .context("Failed to initialize blob store")?,
    );

    let worker = MediaWorker::new(
        Arc::new(PgMediaStore::new(pool)),
        blobs,
        MediaProcessor::new(config.thumbnail_sizes.clone()),
    );

    let (controller, shutdown) = ContainerController::new(
        ConsumerConfig {
            brokers: config.kafka_brokers.clone(),
            group_id: config.kafka_group_id.clone(),
            poll_interval: Duration::from_millis(config.kafka_poll_interval_ms),
            max_batch_size: config.kafka_max_batch_size,
        },
        Arc::new(MediaWorkerEventService::new(worker)),
    )
    .context("Failed to create event consumer")?;

    tokio::spawn(handle_signals(shutdown));

    // A broker failure propagates out of start(); exiting nonzero lets the
    // host supervisor restart the worker.
    controller.start().await?;

    Ok(())
}

/// Wire SIGTERM/ctrl-c to the controller's shutdown handle. The entry
/// point owns the handle; there is no global signal state.
async fn handle_signals(shutdown: ShutdownHandle) {
    let ctrl_c = tokio::signal::ctrl_c();

    #[cfg(unix)]
    {
        let mut sigterm =
            match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
                Ok(sigterm) => sigterm,
                Err(e) => {
                    tracing::error!(error = %e, "Failed to install SIGTERM handler");
                    return;
                }
            };

        tokio::select! {
            _ = ctrl_c => tracing::info!("Ctrl-C received, shutting down"),
            _ = sigterm.recv() => tracing::info!("SIGTERM received, shutting down"),
        }
    }

    #[cfg(not(unix))]
    {
        let _ = ctrl_c.await;
        tracing::info!("Ctrl-C received, shutting down");
    }

    shutdown.shutdown();
}
