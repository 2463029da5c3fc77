//! Persistence seam for the alert engine.

use async_trait::async_trait;
use servwatch_core::types::{DbId, Timestamp};
use servwatch_db::models::alert::{Alert, NewAlert, OpenAlertOutcome};
use servwatch_db::models::server::Server;
use servwatch_db::models::threshold::AlertThreshold;

use crate::error::StoreError;

/// Everything the engine reads and writes.
///
/// Implementations must make [`open_alert_if_absent`](Self::open_alert_if_absent)
/// atomic: the open-alert check, cooldown check, insert and
/// `last_triggered_at` update happen as one unit.
#[async_trait]
pub trait AlertStore: Send + Sync {
    /// Enabled, live thresholds scoped to `server_id` or global, server-specific first.
    async fn direct_thresholds(&self, server_id: DbId) -> Result<Vec<AlertThreshold>, StoreError>;

    /// Direct group memberships of `server_id`.
    async fn group_ids_for_server(&self, server_id: DbId) -> Result<Vec<DbId>, StoreError>;

    /// Enabled, live thresholds scoped to `group_id`.
    async fn group_thresholds(&self, group_id: DbId) -> Result<Vec<AlertThreshold>, StoreError>;

    async fn find_threshold(&self, id: DbId) -> Result<Option<AlertThreshold>, StoreError>;

    async fn find_server(&self, id: DbId) -> Result<Option<Server>, StoreError>;

    async fn find_alert(&self, id: DbId) -> Result<Option<Alert>, StoreError>;

    /// The active or acknowledged alert for the pair, if any.
    async fn find_open_alert(
        &self,
        server_id: DbId,
        threshold_id: DbId,
    ) -> Result<Option<Alert>, StoreError>;

    async fn open_alert_if_absent(&self, input: &NewAlert) -> Result<OpenAlertOutcome, StoreError>;

    async fn record_notification(
        &self,
        alert_id: DbId,
        channels: &[String],
        notified_at: Timestamp,
    ) -> Result<(), StoreError>;

    /// Conditional `active -> acknowledged`. `None` if the alert was not active.
    async fn acknowledge_alert(
        &self,
        alert_id: DbId,
        acknowledged_by: Option<DbId>,
        note: &str,
        at: Timestamp,
    ) -> Result<Option<Alert>, StoreError>;

    /// Conditional `{active, acknowledged} -> resolved`. `None` if already closed.
    async fn resolve_alert(
        &self,
        alert_id: DbId,
        note: &str,
        at: Timestamp,
    ) -> Result<Option<Alert>, StoreError>;
}
