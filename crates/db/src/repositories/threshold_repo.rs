//! Repository for the `alert_thresholds` table.
//!
//! `last_triggered_at` is never written here; it moves only inside
//! [`AlertRepo::open_if_absent`](super::AlertRepo::open_if_absent).

use sqlx::PgPool;
use servwatch_core::threshold::ThresholdDefinition;
use servwatch_core::types::DbId;

use crate::models::threshold::AlertThreshold;

/// Column list shared across queries.
const COLUMNS: &str = "\
    id, name, description, metric_type, operator, value, duration_secs, severity, \
    enabled, enable_discord, enable_email, enable_webhook, webhook_url, \
    cooldown_minutes, last_triggered_at, server_id, group_id, created_by, \
    deleted_at, created_at, updated_at";

/// Provides CRUD and scope lookups for thresholds.
pub struct ThresholdRepo;

impl ThresholdRepo {
    /// Insert a threshold. The definition must already be validated.
    pub async fn create(
        pool: &PgPool,
        input: &ThresholdDefinition,
        created_by: Option<DbId>,
    ) -> Result<AlertThreshold, sqlx::Error> {
        let query = format!(
            "INSERT INTO alert_thresholds (name, description, metric_type, operator, value, \
                duration_secs, severity, enabled, enable_discord, enable_email, enable_webhook, \
                webhook_url, cooldown_minutes, server_id, group_id, created_by) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16) \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, AlertThreshold>(&query)
            .bind(&input.name)
            .bind(&input.description)
            .bind(&input.metric_type)
            .bind(&input.operator)
            .bind(input.value)
            .bind(input.duration_secs)
            .bind(&input.severity)
            .bind(input.enabled)
            .bind(input.enable_discord)
            .bind(input.enable_email)
            .bind(input.enable_webhook)
            .bind(&input.webhook_url)
            .bind(input.cooldown_minutes)
            .bind(input.server_id)
            .bind(input.group_id)
            .bind(created_by)
            .fetch_one(pool)
            .await
    }

    /// Find a threshold by id. Excludes soft-deleted rows.
    pub async fn find_by_id(
        pool: &PgPool,
        id: DbId,
    ) -> Result<Option<AlertThreshold>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM alert_thresholds WHERE id = $1 AND deleted_at IS NULL"
        );
        sqlx::query_as::<_, AlertThreshold>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// All thresholds, enabled or not. Excludes soft-deleted rows.
    pub async fn list(pool: &PgPool) -> Result<Vec<AlertThreshold>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM alert_thresholds WHERE deleted_at IS NULL ORDER BY id"
        );
        sqlx::query_as::<_, AlertThreshold>(&query)
            .fetch_all(pool)
            .await
    }

    /// Replace a threshold's definition.
    ///
    /// Returns `None` if no live row with the given `id` exists.
    pub async fn update(
        pool: &PgPool,
        id: DbId,
        input: &ThresholdDefinition,
    ) -> Result<Option<AlertThreshold>, sqlx::Error> {
        let query = format!(
            "UPDATE alert_thresholds SET \
                name = $2, description = $3, metric_type = $4, operator = $5, value = $6, \
                duration_secs = $7, severity = $8, enabled = $9, enable_discord = $10, \
                enable_email = $11, enable_webhook = $12, webhook_url = $13, \
                cooldown_minutes = $14, server_id = $15, group_id = $16, updated_at = NOW() \
             WHERE id = $1 AND deleted_at IS NULL \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, AlertThreshold>(&query)
            .bind(id)
            .bind(&input.name)
            .bind(&input.description)
            .bind(&input.metric_type)
            .bind(&input.operator)
            .bind(input.value)
            .bind(input.duration_secs)
            .bind(&input.severity)
            .bind(input.enabled)
            .bind(input.enable_discord)
            .bind(input.enable_email)
            .bind(input.enable_webhook)
            .bind(&input.webhook_url)
            .bind(input.cooldown_minutes)
            .bind(input.server_id)
            .bind(input.group_id)
            .fetch_optional(pool)
            .await
    }

    /// Soft-delete a threshold. Returns `true` if a row was marked deleted.
    pub async fn soft_delete(pool: &PgPool, id: DbId) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE alert_thresholds SET deleted_at = NOW(), updated_at = NOW() \
             WHERE id = $1 AND deleted_at IS NULL",
        )
        .bind(id)
        .execute(pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Enabled thresholds targeting `server_id` directly, followed by global ones.
    ///
    /// Group-scoped rows are excluded; see [`Self::list_enabled_for_group`].
    pub async fn list_enabled_direct(
        pool: &PgPool,
        server_id: DbId,
    ) -> Result<Vec<AlertThreshold>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM alert_thresholds \
             WHERE enabled AND deleted_at IS NULL AND group_id IS NULL \
               AND (server_id = $1 OR server_id IS NULL) \
             ORDER BY server_id NULLS LAST, id"
        );
        sqlx::query_as::<_, AlertThreshold>(&query)
            .bind(server_id)
            .fetch_all(pool)
            .await
    }

    /// Enabled thresholds scoped to `group_id`.
    pub async fn list_enabled_for_group(
        pool: &PgPool,
        group_id: DbId,
    ) -> Result<Vec<AlertThreshold>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM alert_thresholds \
             WHERE enabled AND deleted_at IS NULL AND group_id = $1 \
             ORDER BY id"
        );
        sqlx::query_as::<_, AlertThreshold>(&query)
            .bind(group_id)
            .fetch_all(pool)
            .await
    }
}
