//! Clinical Data API - Main entry point

use anyhow::{Context, Result};
use clinical_common::logging::{init_logging, LogConfig};
use std::{net::SocketAddr, sync::Arc, time::Duration};
use tokio::signal;
use tracing::info;

use clinical_api::{
    api::{self, AppState},
    config::Config,
    db,
    features::{
        etl_jobs::{EtlServiceClient, JobLifecycleManager, PgJobStore},
        measurements::PgMeasurementStore,
        FeatureState,
    },
};

#[tokio::main]
async fn main() -> Result<()> {
    // Environment variables take precedence over these defaults
    let log_config = LogConfig::builder()
        .log_file_prefix("clinical-api")
        .filter_directives("clinical_api=debug,tower_http=debug,sqlx=info")
        .build()
        .merge_env()?;

    let _log_guard = init_logging(&log_config)?;

    info!("Starting Clinical Data API");

    let config = Config::load()?;
    info!(
        host = %config.server.host,
        port = config.server.port,
        etl_service = %config.etl.base_url,
        reconcile_policy = ?config.etl.reconcile_policy,
        "Configuration loaded"
    );

    let pool = db::create_pool(&config.database)
        .await
        .context("Failed to connect to database")?;

    sqlx::migrate!()
        .run(&pool)
        .await
        .context("Failed to run migrations")?;
    info!("Database migrations completed");

    let etl_client = EtlServiceClient::from_config(&config.etl)
        .context("Failed to build ETL service client")?;

    let manager = JobLifecycleManager::new(
        Arc::new(PgJobStore::new(pool.clone())),
        Arc::new(etl_client),
    )
    .with_policy(config.etl.reconcile_policy);

    let features = FeatureState {
        jobs: Arc::new(manager),
        measurements: Arc::new(PgMeasurementStore::new(pool.clone())),
    };

    let app = api::create_router(AppState::new(pool, features), &config);

    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port)
        .parse()
        .context("Invalid server address")?;

    api::serve(app, addr, shutdown_signal(config.server.shutdown_timeout_secs)).await?;

    info!("Server shut down gracefully");

    Ok(())
}

/// Resolves on Ctrl+C or SIGTERM, then allows in-flight requests a grace period
async fn shutdown_signal(timeout_secs: u64) {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!("Failed to install Ctrl+C handler: {}", e);
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            },
            Err(e) => {
                tracing::error!("Failed to install SIGTERM handler: {}", e);
            },
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, starting graceful shutdown");
        },
        _ = terminate => {
            info!("Received terminate signal, starting graceful shutdown");
        },
    }

    info!("Waiting up to {} seconds for connections to close", timeout_secs);
    tokio::time::sleep(Duration::from_secs(timeout_secs.min(5))).await;
}
