//! Repository for the `metrics` table (append-only time-series).

use sqlx::PgPool;
use servwatch_core::types::{DbId, Timestamp};

use crate::models::metric::{CreateMetric, Metric};

/// Column list for `metrics` SELECT queries.
const COLUMNS: &str = "\
    id, server_id, timestamp, cpu_usage, cpu_temp, \
    memory_total, memory_used, memory_free, \
    disk_total, disk_used, disk_free, \
    net_upload, net_download, created_at";

/// Provides query operations for metric samples.
pub struct MetricRepo;

impl MetricRepo {
    /// Insert one sample. A missing timestamp defaults to `NOW()`.
    pub async fn insert(pool: &PgPool, input: &CreateMetric) -> Result<Metric, sqlx::Error> {
        let query = format!(
            "INSERT INTO metrics (server_id, timestamp, cpu_usage, cpu_temp, \
                memory_total, memory_used, memory_free, \
                disk_total, disk_used, disk_free, net_upload, net_download) \
             VALUES ($1, COALESCE($2, NOW()), $3, $4, $5, $6, $7, $8, $9, $10, $11, $12) \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Metric>(&query)
            .bind(input.server_id)
            .bind(input.timestamp)
            .bind(input.cpu_usage)
            .bind(input.cpu_temp)
            .bind(input.memory_total)
            .bind(input.memory_used)
            .bind(input.memory_free)
            .bind(input.disk_total)
            .bind(input.disk_used)
            .bind(input.disk_free)
            .bind(input.net_upload)
            .bind(input.net_download)
            .fetch_one(pool)
            .await
    }

    /// Most recent sample for a server.
    pub async fn latest_for_server(
        pool: &PgPool,
        server_id: DbId,
    ) -> Result<Option<Metric>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM metrics WHERE server_id = $1 \
             ORDER BY timestamp DESC, id DESC LIMIT 1"
        );
        sqlx::query_as::<_, Metric>(&query)
            .bind(server_id)
            .fetch_optional(pool)
            .await
    }

    /// Samples for a server, newest first.
    pub async fn list_for_server(
        pool: &PgPool,
        server_id: DbId,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<Metric>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM metrics WHERE server_id = $1 \
             ORDER BY timestamp DESC, id DESC LIMIT $2 OFFSET $3"
        );
        sqlx::query_as::<_, Metric>(&query)
            .bind(server_id)
            .bind(limit)
            .bind(offset)
            .fetch_all(pool)
            .await
    }

    /// Delete samples older than `cutoff`. Returns the number of rows deleted.
    pub async fn delete_older_than(pool: &PgPool, cutoff: Timestamp) -> Result<u64, sqlx::Error> {
        let result = sqlx::query("DELETE FROM metrics WHERE timestamp < $1")
            .bind(cutoff)
            .execute(pool)
            .await?;
        Ok(result.rows_affected())
    }
}
