//! Repository for the `alerts` table.
//!
//! Status changes are conditional updates so that a concurrent transition
//! loses cleanly (`None`) instead of overwriting.

use sqlx::PgPool;
use servwatch_core::alert::in_cooldown;
use servwatch_core::types::{DbId, Timestamp};

use crate::models::alert::{Alert, AlertFilter, NewAlert, OpenAlertOutcome};

/// Column list shared across queries.
const COLUMNS: &str = "\
    id, title, message, metric_type, metric_value, threshold_value, operator, severity, \
    status, server_id, threshold_id, triggered_at, resolved_at, acknowledged_at, \
    acknowledged_by, notified_at, notify_channels, notes, deleted_at, created_at, updated_at";

/// Default page size for alert listings.
const DEFAULT_LIMIT: i64 = 100;

/// SQL assignment appending `param` to `notes` on a new line, unless empty.
fn append_notes_sql(param: &str) -> String {
    format!(
        "notes = CASE WHEN {param} = '' THEN notes \
         WHEN notes = '' THEN {param} \
         ELSE notes || E'\\n' || {param} END"
    )
}

/// Provides lifecycle and query operations for alerts.
pub struct AlertRepo;

impl AlertRepo {
    /// Find an alert by id. Excludes soft-deleted rows.
    pub async fn find_by_id(pool: &PgPool, id: DbId) -> Result<Option<Alert>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM alerts WHERE id = $1 AND deleted_at IS NULL");
        sqlx::query_as::<_, Alert>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// The active or acknowledged alert for a (server, threshold) pair, if any.
    pub async fn find_open(
        pool: &PgPool,
        server_id: DbId,
        threshold_id: DbId,
    ) -> Result<Option<Alert>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM alerts \
             WHERE server_id = $1 AND threshold_id = $2 \
               AND status IN ('active', 'acknowledged') AND deleted_at IS NULL \
             ORDER BY triggered_at DESC LIMIT 1"
        );
        sqlx::query_as::<_, Alert>(&query)
            .bind(server_id)
            .bind(threshold_id)
            .fetch_optional(pool)
            .await
    }

    /// List alerts matching `filter`, newest first.
    pub async fn list(pool: &PgPool, filter: &AlertFilter) -> Result<Vec<Alert>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM alerts \
             WHERE deleted_at IS NULL \
               AND ($1::BIGINT IS NULL OR server_id = $1) \
               AND ($2::TEXT IS NULL OR status = $2) \
               AND ($3::TEXT IS NULL OR severity = $3) \
               AND ($4::TIMESTAMPTZ IS NULL OR triggered_at >= $4) \
               AND ($5::TIMESTAMPTZ IS NULL OR triggered_at <= $5) \
             ORDER BY triggered_at DESC, id DESC \
             LIMIT $6 OFFSET $7"
        );
        sqlx::query_as::<_, Alert>(&query)
            .bind(filter.server_id)
            .bind(&filter.status)
            .bind(&filter.severity)
            .bind(filter.start_time)
            .bind(filter.end_time)
            .bind(filter.limit.unwrap_or(DEFAULT_LIMIT))
            .bind(filter.offset.unwrap_or(0))
            .fetch_all(pool)
            .await
    }

    /// All alerts with status `active`, newest first.
    pub async fn list_active(pool: &PgPool) -> Result<Vec<Alert>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM alerts \
             WHERE status = 'active' AND deleted_at IS NULL \
             ORDER BY triggered_at DESC, id DESC"
        );
        sqlx::query_as::<_, Alert>(&query).fetch_all(pool).await
    }

    /// Open a new alert unless one is already open or the threshold is cooling down.
    ///
    /// Runs in one transaction holding a row lock on the threshold, so
    /// concurrent evaluations of the same threshold are serialized. The
    /// threshold's `last_triggered_at` only ever moves forward.
    pub async fn open_if_absent(
        pool: &PgPool,
        input: &NewAlert,
    ) -> Result<OpenAlertOutcome, sqlx::Error> {
        let mut tx = pool.begin().await?;

        let threshold: Option<(Option<Timestamp>, i32)> = sqlx::query_as(
            "SELECT last_triggered_at, cooldown_minutes FROM alert_thresholds \
             WHERE id = $1 AND enabled AND deleted_at IS NULL \
             FOR UPDATE",
        )
        .bind(input.threshold_id)
        .fetch_optional(&mut *tx)
        .await?;

        let Some((last_triggered_at, cooldown_minutes)) = threshold else {
            tx.rollback().await?;
            return Ok(OpenAlertOutcome::ThresholdGone);
        };

        let existing: Option<DbId> = sqlx::query_scalar(
            "SELECT id FROM alerts \
             WHERE server_id = $1 AND threshold_id = $2 \
               AND status IN ('active', 'acknowledged') AND deleted_at IS NULL \
             LIMIT 1",
        )
        .bind(input.server_id)
        .bind(input.threshold_id)
        .fetch_optional(&mut *tx)
        .await?;

        if let Some(id) = existing {
            tx.rollback().await?;
            return Ok(OpenAlertOutcome::AlreadyOpen(id));
        }

        if in_cooldown(last_triggered_at, cooldown_minutes, input.triggered_at) {
            tx.rollback().await?;
            return Ok(OpenAlertOutcome::CoolingDown);
        }

        let query = format!(
            "INSERT INTO alerts (title, message, metric_type, metric_value, threshold_value, \
                operator, severity, status, server_id, threshold_id, triggered_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, 'active', $8, $9, $10) \
             RETURNING {COLUMNS}"
        );
        let alert = sqlx::query_as::<_, Alert>(&query)
            .bind(&input.title)
            .bind(&input.message)
            .bind(&input.metric_type)
            .bind(input.metric_value)
            .bind(input.threshold_value)
            .bind(&input.operator)
            .bind(&input.severity)
            .bind(input.server_id)
            .bind(input.threshold_id)
            .bind(input.triggered_at)
            .fetch_one(&mut *tx)
            .await?;

        sqlx::query(
            "UPDATE alert_thresholds \
             SET last_triggered_at = GREATEST(COALESCE(last_triggered_at, $2), $2) \
             WHERE id = $1",
        )
        .bind(input.threshold_id)
        .bind(input.triggered_at)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(OpenAlertOutcome::Opened(alert))
    }

    /// Store the channels that accepted the alert notification.
    pub async fn record_notification(
        pool: &PgPool,
        id: DbId,
        channels: &[String],
        notified_at: Timestamp,
    ) -> Result<(), sqlx::Error> {
        sqlx::query(
            "UPDATE alerts SET notify_channels = $2, notified_at = $3, updated_at = NOW() \
             WHERE id = $1",
        )
        .bind(id)
        .bind(channels)
        .bind(notified_at)
        .execute(pool)
        .await?;
        Ok(())
    }

    /// Move an `active` alert to `acknowledged`.
    ///
    /// Returns `None` when the alert is missing or no longer active.
    pub async fn acknowledge_if_active(
        pool: &PgPool,
        id: DbId,
        acknowledged_by: Option<DbId>,
        note: &str,
        at: Timestamp,
    ) -> Result<Option<Alert>, sqlx::Error> {
        let query = format!(
            "UPDATE alerts SET status = 'acknowledged', acknowledged_at = $2, \
                acknowledged_by = $3, {}, updated_at = NOW() \
             WHERE id = $1 AND status = 'active' AND deleted_at IS NULL \
             RETURNING {COLUMNS}",
            append_notes_sql("$4")
        );
        sqlx::query_as::<_, Alert>(&query)
            .bind(id)
            .bind(at)
            .bind(acknowledged_by)
            .bind(note.trim())
            .fetch_optional(pool)
            .await
    }

    /// Move an `active` or `acknowledged` alert to `resolved`.
    ///
    /// Returns `None` when the alert is missing or already closed.
    pub async fn resolve_if_open(
        pool: &PgPool,
        id: DbId,
        note: &str,
        at: Timestamp,
    ) -> Result<Option<Alert>, sqlx::Error> {
        let query = format!(
            "UPDATE alerts SET status = 'resolved', resolved_at = $2, {}, updated_at = NOW() \
             WHERE id = $1 AND status IN ('active', 'acknowledged') AND deleted_at IS NULL \
             RETURNING {COLUMNS}",
            append_notes_sql("$3")
        );
        sqlx::query_as::<_, Alert>(&query)
            .bind(id)
            .bind(at)
            .bind(note.trim())
            .fetch_optional(pool)
            .await
    }
}
