//! Periodic cleanup of old metric samples.
//!
//! Alerts keep their own copy of the triggering value, so purging samples
//! never affects alert history.

use std::time::Duration;

use chrono::Utc;
use servwatch_db::repositories::MetricRepo;
use sqlx::PgPool;
use tokio_util::sync::CancellationToken;

/// How often the cleanup job runs.
const CLEANUP_INTERVAL: Duration = Duration::from_secs(3600);

/// Run the retention loop until `cancel` is triggered.
///
/// Deletes metric rows older than `retention_days`.
pub async fn run(pool: PgPool, retention_days: i64, cancel: CancellationToken) {
    tracing::info!(
        retention_days,
        interval_secs = CLEANUP_INTERVAL.as_secs(),
        "Metrics retention job started"
    );

    let mut interval = tokio::time::interval(CLEANUP_INTERVAL);

    loop {
        tokio::select! {
            _ = cancel.cancelled() => {
                tracing::info!("Metrics retention job stopping");
                break;
            }
            _ = interval.tick() => {
                let cutoff = Utc::now() - chrono::Duration::days(retention_days);
                match MetricRepo::delete_older_than(&pool, cutoff).await {
                    Ok(0) => tracing::debug!("Metrics retention: no rows to purge"),
                    Ok(deleted) => tracing::info!(deleted, "Metrics retention: purged old rows"),
                    Err(e) => tracing::error!(error = %e, "Metrics retention: cleanup failed"),
                }
            }
        }
    }
}
