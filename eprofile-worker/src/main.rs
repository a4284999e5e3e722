//! # eProfile Worker
//!
//! Runs periodic maintenance against the eProfile database:
//! - downgrades lapsed subscriptions to FREE
//! - purges analytics events past retention
//!
//! ## Usage
//!
//! ```bash
//! cargo run -p eprofile-worker
//! ```

use eprofile_shared::db::pool::{close_pool, create_pool, pool_stats, DatabaseConfig};
use eprofile_worker::{
    config::WorkerConfig,
    jobs::{AnalyticsRetentionJob, SubscriptionExpiryJob},
    orchestrator::{JobOrchestrator, OrchestratorConfig},
};
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "eprofile_worker=debug,eprofile_shared=info".into());
    let registry = tracing_subscriber::registry().with(filter);

    if std::env::var("LOG_FORMAT").is_ok_and(|v| v.eq_ignore_ascii_case("json")) {
        registry.with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }

    tracing::info!("eProfile Worker v{} starting...", env!("CARGO_PKG_VERSION"));

    let config = WorkerConfig::from_env()?;

    let db = create_pool(DatabaseConfig {
        min_connections: 1,
        ..DatabaseConfig::new(config.database_url.clone()).with_max_connections(config.max_connections)
    })
    .await?;

    let mut orchestrator = JobOrchestrator::new(OrchestratorConfig {
        sweep_interval: Duration::from_secs(config.sweep_interval_secs),
        job_timeout: Duration::from_secs(config.job_timeout_secs),
    });
    orchestrator.register_job(Arc::new(SubscriptionExpiryJob::new(db.clone())));
    orchestrator.register_job(Arc::new(AnalyticsRetentionJob::new(
        db.clone(),
        config.analytics_retention_days,
    )));

    let shutdown = orchestrator.shutdown_token();
    tokio::spawn(async move {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for shutdown signal");
        }
        tracing::info!("Shutdown signal received");
        shutdown.cancel();
    });

    orchestrator.run().await;

    let stats = pool_stats(&db);
    tracing::debug!(size = stats.size, in_use = stats.in_use(), "Pool before close");
    close_pool(db).await;
    tracing::info!("Worker stopped");

    Ok(())
}
