//! In-memory [`AlertStore`] for engine tests and local experiments.
//!
//! All state lives behind one `tokio::sync::Mutex`, which makes
//! [`open_alert_if_absent`](AlertStore::open_alert_if_absent) atomic the
//! same way the PostgreSQL row lock does. Failure switches let tests
//! simulate an unavailable group lookup or store.

use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use chrono::Utc;
use servwatch_core::alert::{append_note, in_cooldown, AlertStatus};
use servwatch_core::error::CoreError;
use servwatch_core::threshold::ThresholdDefinition;
use servwatch_core::types::{DbId, Timestamp};
use servwatch_db::models::alert::{Alert, NewAlert, OpenAlertOutcome};
use servwatch_db::models::server::Server;
use servwatch_db::models::threshold::AlertThreshold;
use tokio::sync::Mutex;

use crate::error::StoreError;
use crate::store::AlertStore;

#[derive(Default)]
struct State {
    next_id: DbId,
    servers: Vec<Server>,
    memberships: Vec<(DbId, DbId)>,
    thresholds: Vec<AlertThreshold>,
    alerts: Vec<Alert>,
}

impl State {
    fn next_id(&mut self) -> DbId {
        self.next_id += 1;
        self.next_id
    }

    fn open_alert(&self, server_id: DbId, threshold_id: DbId) -> Option<&Alert> {
        self.alerts.iter().find(|a| {
            a.server_id == server_id
                && a.threshold_id == Some(threshold_id)
                && is_open(a)
                && a.deleted_at.is_none()
        })
    }
}

fn is_open(alert: &Alert) -> bool {
    alert
        .status
        .parse::<AlertStatus>()
        .map(AlertStatus::is_open)
        .unwrap_or(false)
}

fn live(threshold: &AlertThreshold) -> bool {
    threshold.enabled && threshold.deleted_at.is_none()
}

#[derive(Default)]
pub struct InMemoryAlertStore {
    state: Mutex<State>,
    fail_group_lookup: AtomicBool,
    fail_writes: AtomicBool,
}

impl InMemoryAlertStore {
    pub fn new() -> Self {
        Self::default()
    }

    // -- seeding -----------------------------------------------------------

    pub async fn add_server(&self, hostname: &str, ip_address: &str) -> DbId {
        let mut state = self.state.lock().await;
        let id = state.next_id();
        let now = Utc::now();
        state.servers.push(Server {
            id,
            hostname: hostname.to_string(),
            ip_address: ip_address.to_string(),
            description: String::new(),
            deleted_at: None,
            created_at: now,
            updated_at: now,
        });
        id
    }

    /// Create a group id and place `server_ids` in it.
    pub async fn add_group(&self, server_ids: &[DbId]) -> DbId {
        let mut state = self.state.lock().await;
        let group_id = state.next_id();
        for &server_id in server_ids {
            state.memberships.push((group_id, server_id));
        }
        group_id
    }

    /// Insert a threshold from an admin definition. Validates like the API.
    pub async fn add_threshold(&self, def: &ThresholdDefinition) -> Result<AlertThreshold, CoreError> {
        def.validate_definition()?;
        let mut state = self.state.lock().await;
        let id = state.next_id();
        let now = Utc::now();
        let row = AlertThreshold {
            id,
            name: def.name.clone(),
            description: def.description.clone(),
            metric_type: def.metric_type.clone(),
            operator: def.operator.clone(),
            value: def.value,
            duration_secs: def.duration_secs,
            severity: def.severity.clone(),
            enabled: def.enabled,
            enable_discord: def.enable_discord,
            enable_email: def.enable_email,
            enable_webhook: def.enable_webhook,
            webhook_url: def.webhook_url.clone(),
            cooldown_minutes: def.cooldown_minutes,
            last_triggered_at: None,
            server_id: def.server_id,
            group_id: def.group_id,
            created_by: None,
            deleted_at: None,
            created_at: now,
            updated_at: now,
        };
        state.thresholds.push(row.clone());
        Ok(row)
    }

    /// Set `last_triggered_at` directly, as a stale admin write would.
    pub async fn set_last_triggered(&self, threshold_id: DbId, at: Option<Timestamp>) {
        let mut state = self.state.lock().await;
        if let Some(t) = state.thresholds.iter_mut().find(|t| t.id == threshold_id) {
            t.last_triggered_at = at;
        }
    }

    /// Soft-delete an alert, hiding it from every lookup.
    pub async fn soft_delete_alert(&self, alert_id: DbId) {
        let mut state = self.state.lock().await;
        if let Some(alert) = state.alerts.iter_mut().find(|a| a.id == alert_id) {
            alert.deleted_at = Some(Utc::now());
        }
    }

    // -- failure switches --------------------------------------------------

    pub fn fail_group_lookup(&self, fail: bool) {
        self.fail_group_lookup.store(fail, Ordering::SeqCst);
    }

    pub fn fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    fn check_writes(&self) -> Result<(), StoreError> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(StoreError::Database(sqlx::Error::PoolTimedOut));
        }
        Ok(())
    }

    // -- inspection --------------------------------------------------------

    pub async fn alerts(&self) -> Vec<Alert> {
        self.state.lock().await.alerts.clone()
    }

    pub async fn threshold(&self, id: DbId) -> Option<AlertThreshold> {
        self.state
            .lock()
            .await
            .thresholds
            .iter()
            .find(|t| t.id == id)
            .cloned()
    }
}

#[async_trait]
impl AlertStore for InMemoryAlertStore {
    async fn direct_thresholds(&self, server_id: DbId) -> Result<Vec<AlertThreshold>, StoreError> {
        let state = self.state.lock().await;
        let mut rows: Vec<AlertThreshold> = state
            .thresholds
            .iter()
            .filter(|t| live(t) && t.group_id.is_none())
            .filter(|t| t.server_id.is_none() || t.server_id == Some(server_id))
            .cloned()
            .collect();
        rows.sort_by_key(|t| (t.server_id.is_none(), t.id));
        Ok(rows)
    }

    async fn group_ids_for_server(&self, server_id: DbId) -> Result<Vec<DbId>, StoreError> {
        if self.fail_group_lookup.load(Ordering::SeqCst) {
            return Err(StoreError::Database(sqlx::Error::PoolTimedOut));
        }
        let state = self.state.lock().await;
        let mut ids: Vec<DbId> = state
            .memberships
            .iter()
            .filter(|(_, s)| *s == server_id)
            .map(|(g, _)| *g)
            .collect();
        ids.sort_unstable();
        Ok(ids)
    }

    async fn group_thresholds(&self, group_id: DbId) -> Result<Vec<AlertThreshold>, StoreError> {
        let state = self.state.lock().await;
        Ok(state
            .thresholds
            .iter()
            .filter(|t| live(t) && t.group_id == Some(group_id))
            .cloned()
            .collect())
    }

    async fn find_threshold(&self, id: DbId) -> Result<Option<AlertThreshold>, StoreError> {
        Ok(self.threshold(id).await.filter(|t| t.deleted_at.is_none()))
    }

    async fn find_server(&self, id: DbId) -> Result<Option<Server>, StoreError> {
        let state = self.state.lock().await;
        Ok(state.servers.iter().find(|s| s.id == id).cloned())
    }

    async fn find_alert(&self, id: DbId) -> Result<Option<Alert>, StoreError> {
        let state = self.state.lock().await;
        Ok(state
            .alerts
            .iter()
            .find(|a| a.id == id && a.deleted_at.is_none())
            .cloned())
    }

    async fn find_open_alert(
        &self,
        server_id: DbId,
        threshold_id: DbId,
    ) -> Result<Option<Alert>, StoreError> {
        let state = self.state.lock().await;
        Ok(state.open_alert(server_id, threshold_id).cloned())
    }

    async fn open_alert_if_absent(&self, input: &NewAlert) -> Result<OpenAlertOutcome, StoreError> {
        self.check_writes()?;
        let mut state = self.state.lock().await;

        let Some(threshold) = state
            .thresholds
            .iter()
            .find(|t| t.id == input.threshold_id && live(t))
        else {
            return Ok(OpenAlertOutcome::ThresholdGone);
        };
        let (last, cooldown) = (threshold.last_triggered_at, threshold.cooldown_minutes);

        if let Some(existing) = state.open_alert(input.server_id, input.threshold_id) {
            return Ok(OpenAlertOutcome::AlreadyOpen(existing.id));
        }
        if in_cooldown(last, cooldown, input.triggered_at) {
            return Ok(OpenAlertOutcome::CoolingDown);
        }

        let id = state.next_id();
        let now = Utc::now();
        let alert = Alert {
            id,
            title: input.title.clone(),
            message: input.message.clone(),
            metric_type: input.metric_type.clone(),
            metric_value: input.metric_value,
            threshold_value: input.threshold_value,
            operator: input.operator.clone(),
            severity: input.severity.clone(),
            status: AlertStatus::Active.as_str().to_string(),
            server_id: input.server_id,
            threshold_id: Some(input.threshold_id),
            triggered_at: input.triggered_at,
            resolved_at: None,
            acknowledged_at: None,
            acknowledged_by: None,
            notified_at: None,
            notify_channels: Vec::new(),
            notes: String::new(),
            deleted_at: None,
            created_at: now,
            updated_at: now,
        };
        state.alerts.push(alert.clone());

        if let Some(t) = state.thresholds.iter_mut().find(|t| t.id == input.threshold_id) {
            t.last_triggered_at = Some(match t.last_triggered_at {
                Some(prev) => prev.max(input.triggered_at),
                None => input.triggered_at,
            });
        }
        Ok(OpenAlertOutcome::Opened(alert))
    }

    async fn record_notification(
        &self,
        alert_id: DbId,
        channels: &[String],
        notified_at: Timestamp,
    ) -> Result<(), StoreError> {
        self.check_writes()?;
        let mut state = self.state.lock().await;
        if let Some(alert) = state.alerts.iter_mut().find(|a| a.id == alert_id) {
            alert.notify_channels = channels.to_vec();
            alert.notified_at = Some(notified_at);
            alert.updated_at = Utc::now();
        }
        Ok(())
    }

    async fn acknowledge_alert(
        &self,
        alert_id: DbId,
        acknowledged_by: Option<DbId>,
        note: &str,
        at: Timestamp,
    ) -> Result<Option<Alert>, StoreError> {
        self.check_writes()?;
        let mut state = self.state.lock().await;
        let Some(alert) = state
            .alerts
            .iter_mut()
            .find(|a| {
                a.id == alert_id
                    && a.status == AlertStatus::Active.as_str()
                    && a.deleted_at.is_none()
            })
        else {
            return Ok(None);
        };
        alert.status = AlertStatus::Acknowledged.as_str().to_string();
        alert.acknowledged_at = Some(at);
        alert.acknowledged_by = acknowledged_by;
        alert.notes = append_note(&alert.notes, note);
        alert.updated_at = Utc::now();
        Ok(Some(alert.clone()))
    }

    async fn resolve_alert(
        &self,
        alert_id: DbId,
        note: &str,
        at: Timestamp,
    ) -> Result<Option<Alert>, StoreError> {
        self.check_writes()?;
        let mut state = self.state.lock().await;
        let Some(alert) = state
            .alerts
            .iter_mut()
            .find(|a| a.id == alert_id && is_open(a) && a.deleted_at.is_none())
        else {
            return Ok(None);
        };
        alert.status = AlertStatus::Resolved.as_str().to_string();
        alert.resolved_at = Some(at);
        alert.notes = append_note(&alert.notes, note);
        alert.updated_at = Utc::now();
        Ok(Some(alert.clone()))
    }
}
