//! [`AlertStore`] backed by the PostgreSQL repositories.

use async_trait::async_trait;
use servwatch_core::types::{DbId, Timestamp};
use servwatch_db::models::alert::{Alert, NewAlert, OpenAlertOutcome};
use servwatch_db::models::server::Server;
use servwatch_db::models::threshold::AlertThreshold;
use servwatch_db::repositories::{AlertRepo, ServerGroupRepo, ServerRepo, ThresholdRepo};
use servwatch_db::DbPool;

use crate::error::StoreError;
use crate::store::AlertStore;

#[derive(Clone)]
pub struct PgAlertStore {
    pool: DbPool,
}

impl PgAlertStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl AlertStore for PgAlertStore {
    async fn direct_thresholds(&self, server_id: DbId) -> Result<Vec<AlertThreshold>, StoreError> {
        Ok(ThresholdRepo::list_enabled_direct(&self.pool, server_id).await?)
    }

    async fn group_ids_for_server(&self, server_id: DbId) -> Result<Vec<DbId>, StoreError> {
        Ok(ServerGroupRepo::group_ids_for_server(&self.pool, server_id).await?)
    }

    async fn group_thresholds(&self, group_id: DbId) -> Result<Vec<AlertThreshold>, StoreError> {
        Ok(ThresholdRepo::list_enabled_for_group(&self.pool, group_id).await?)
    }

    async fn find_threshold(&self, id: DbId) -> Result<Option<AlertThreshold>, StoreError> {
        Ok(ThresholdRepo::find_by_id(&self.pool, id).await?)
    }

    async fn find_server(&self, id: DbId) -> Result<Option<Server>, StoreError> {
        Ok(ServerRepo::find_by_id(&self.pool, id).await?)
    }

    async fn find_alert(&self, id: DbId) -> Result<Option<Alert>, StoreError> {
        Ok(AlertRepo::find_by_id(&self.pool, id).await?)
    }

    async fn find_open_alert(
        &self,
        server_id: DbId,
        threshold_id: DbId,
    ) -> Result<Option<Alert>, StoreError> {
        Ok(AlertRepo::find_open(&self.pool, server_id, threshold_id).await?)
    }

    async fn open_alert_if_absent(&self, input: &NewAlert) -> Result<OpenAlertOutcome, StoreError> {
        match AlertRepo::open_if_absent(&self.pool, input).await {
            Ok(outcome) => Ok(outcome),
            // A concurrent insert that slipped past the row lock trips the
            // partial unique index; treat it as the existing open alert.
            Err(sqlx::Error::Database(db_err)) if db_err.is_unique_violation() => {
                let existing =
                    AlertRepo::find_open(&self.pool, input.server_id, input.threshold_id).await?;
                Ok(OpenAlertOutcome::AlreadyOpen(existing.map(|a| a.id).unwrap_or_default()))
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn record_notification(
        &self,
        alert_id: DbId,
        channels: &[String],
        notified_at: Timestamp,
    ) -> Result<(), StoreError> {
        Ok(AlertRepo::record_notification(&self.pool, alert_id, channels, notified_at).await?)
    }

    async fn acknowledge_alert(
        &self,
        alert_id: DbId,
        acknowledged_by: Option<DbId>,
        note: &str,
        at: Timestamp,
    ) -> Result<Option<Alert>, StoreError> {
        Ok(AlertRepo::acknowledge_if_active(&self.pool, alert_id, acknowledged_by, note, at).await?)
    }

    async fn resolve_alert(
        &self,
        alert_id: DbId,
        note: &str,
        at: Timestamp,
    ) -> Result<Option<Alert>, StoreError> {
        Ok(AlertRepo::resolve_if_open(&self.pool, alert_id, note, at).await?)
    }
}
