//! Alert lifecycle management.
//!
//! Per (server, threshold) pair the engine moves through
//! `none -> active -> {acknowledged, resolved}` and `acknowledged -> resolved`.
//! Opening is delegated to [`AlertStore::open_alert_if_absent`] so the
//! duplicate and cooldown checks are atomic with the insert. Notification
//! failures are logged by the dispatcher and never fail an evaluation.

use std::sync::Arc;

use chrono::Utc;
use servwatch_core::alert::{
    alert_message, alert_title, ensure_can_acknowledge, ensure_can_resolve, in_cooldown,
    AUTO_RESOLVE_NOTE,
};
use servwatch_core::condition::{evaluate, Evaluation};
use servwatch_core::error::CoreError;
use servwatch_core::metric::MetricSample;
use servwatch_core::threshold::ThresholdRule;
use servwatch_core::types::{DbId, Timestamp};
use servwatch_db::models::alert::{Alert, NewAlert, OpenAlertOutcome};
use servwatch_db::models::server::Server;
use servwatch_db::models::threshold::AlertThreshold;
use servwatch_events::{AlertNotice, NotificationDispatcher};

use crate::error::StoreError;
use crate::resolver::resolve_applicable;
use crate::store::AlertStore;

/// What one evaluation pass did.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EvaluationReport {
    /// Thresholds the sample was checked against.
    pub evaluated: usize,
    pub opened: Vec<DbId>,
    pub resolved: Vec<DbId>,
    /// Triggered, but an alert for the pair was already open.
    pub already_open: usize,
    /// Triggered, but the threshold is inside its cooldown window.
    pub cooling_down: usize,
    /// The sample had no value for the threshold's metric.
    pub unmeasurable: usize,
}

pub struct AlertEngine {
    store: Arc<dyn AlertStore>,
    dispatcher: Arc<NotificationDispatcher>,
}

impl AlertEngine {
    pub fn new(store: Arc<dyn AlertStore>, dispatcher: Arc<NotificationDispatcher>) -> Self {
        Self { store, dispatcher }
    }

    pub fn store(&self) -> &Arc<dyn AlertStore> {
        &self.store
    }

    // -----------------------------------------------------------------------
    // Evaluation
    // -----------------------------------------------------------------------

    /// Evaluate a persisted sample against every applicable threshold.
    pub async fn evaluate_metric(&self, sample: &MetricSample) -> Result<EvaluationReport, StoreError> {
        self.evaluate_metric_at(sample, Utc::now()).await
    }

    /// [`evaluate_metric`](Self::evaluate_metric) with an explicit clock.
    ///
    /// A store error on one threshold does not stop the others; the first
    /// such error is returned once all thresholds have been processed.
    pub async fn evaluate_metric_at(
        &self,
        sample: &MetricSample,
        now: Timestamp,
    ) -> Result<EvaluationReport, StoreError> {
        let thresholds = resolve_applicable(self.store.as_ref(), sample.server_id).await?;
        let mut report = EvaluationReport::default();
        if thresholds.is_empty() {
            return Ok(report);
        }

        let server = match self.store.find_server(sample.server_id).await {
            Ok(server) => server,
            Err(e) => {
                tracing::warn!(server_id = sample.server_id, error = %e, "Server lookup failed");
                None
            }
        };

        let mut first_error = None;
        for row in &thresholds {
            let rule = match row.to_rule() {
                Ok(rule) => rule,
                Err(e) => {
                    tracing::warn!(threshold_id = row.id, error = %e, "Skipping malformed threshold");
                    continue;
                }
            };

            let evaluation = evaluate(sample, &rule);
            report.evaluated += 1;

            let ctx = Context {
                sample,
                rule: &rule,
                row,
                server: server.as_ref(),
                now,
            };
            if let Err(e) = self.apply(&ctx, evaluation, &mut report).await {
                tracing::error!(
                    server_id = sample.server_id,
                    threshold_id = rule.id,
                    error = %e,
                    "Alert evaluation failed for threshold"
                );
                first_error.get_or_insert(e);
            }
        }

        match first_error {
            Some(e) => Err(e),
            None => Ok(report),
        }
    }

    async fn apply(
        &self,
        ctx: &Context<'_>,
        evaluation: Evaluation,
        report: &mut EvaluationReport,
    ) -> Result<(), StoreError> {
        if !evaluation.measurable {
            tracing::debug!(
                server_id = ctx.sample.server_id,
                threshold_id = ctx.rule.id,
                metric = %ctx.rule.metric_type,
                "Metric not measurable for this sample"
            );
            report.unmeasurable += 1;
            return Ok(());
        }

        if evaluation.triggered {
            self.open(ctx, evaluation.value, report).await
        } else if evaluation.clears(ctx.rule) {
            self.auto_resolve(ctx, report).await
        } else {
            Ok(())
        }
    }

    async fn open(
        &self,
        ctx: &Context<'_>,
        value: f64,
        report: &mut EvaluationReport,
    ) -> Result<(), StoreError> {
        let server_id = ctx.sample.server_id;
        let rule = ctx.rule;

        if let Some(existing) = self.store.find_open_alert(server_id, rule.id).await? {
            tracing::debug!(server_id, threshold_id = rule.id, alert_id = existing.id, "Alert already open");
            report.already_open += 1;
            return Ok(());
        }
        if in_cooldown(rule.last_triggered_at, rule.cooldown_minutes, ctx.now) {
            tracing::debug!(server_id, threshold_id = rule.id, "Threshold in cooldown");
            report.cooling_down += 1;
            return Ok(());
        }

        let input = NewAlert {
            title: alert_title(
                rule.metric_type,
                ctx.server.map(|s| s.hostname.as_str()),
                server_id,
            ),
            message: alert_message(rule.metric_type, value, rule.operator, rule.value),
            metric_type: rule.metric_type.as_str().to_string(),
            metric_value: value,
            threshold_value: rule.value,
            operator: rule.operator.symbol().to_string(),
            severity: rule.severity.as_str().to_string(),
            server_id,
            threshold_id: rule.id,
            triggered_at: ctx.now,
        };

        match self.store.open_alert_if_absent(&input).await? {
            OpenAlertOutcome::Opened(alert) => {
                tracing::info!(
                    alert_id = alert.id,
                    server_id,
                    threshold_id = rule.id,
                    severity = %rule.severity,
                    value,
                    "Alert opened"
                );
                report.opened.push(alert.id);
                self.notify_opened(alert, ctx).await;
            }
            OpenAlertOutcome::AlreadyOpen(alert_id) => {
                tracing::debug!(server_id, threshold_id = rule.id, alert_id, "Alert opened concurrently");
                report.already_open += 1;
            }
            OpenAlertOutcome::CoolingDown => {
                tracing::debug!(server_id, threshold_id = rule.id, "Threshold in cooldown");
                report.cooling_down += 1;
            }
            OpenAlertOutcome::ThresholdGone => {
                tracing::debug!(server_id, threshold_id = rule.id, "Threshold disabled or deleted during evaluation");
            }
        }
        Ok(())
    }

    async fn notify_opened(&self, alert: Alert, ctx: &Context<'_>) {
        let channels = ctx.rule.channels.enabled();
        if channels.is_empty() {
            return;
        }
        let alert_id = alert.id;
        let notice = notice_for(alert, ctx.server, Some(ctx.row));
        let sent = self.dispatcher.dispatch_alert(&notice, &channels).await;
        if let Err(e) = self.store.record_notification(alert_id, &sent, Utc::now()).await {
            tracing::error!(alert_id, error = %e, "Failed to record notification channels");
        }
    }

    /// Close the open alert for the pair, if any. A no-op when none is open
    /// or another evaluation resolved it first.
    async fn auto_resolve(&self, ctx: &Context<'_>, report: &mut EvaluationReport) -> Result<(), StoreError> {
        let server_id = ctx.sample.server_id;
        let Some(open) = self.store.find_open_alert(server_id, ctx.rule.id).await? else {
            return Ok(());
        };

        let Some(resolved) = self.store.resolve_alert(open.id, AUTO_RESOLVE_NOTE, ctx.now).await? else {
            tracing::debug!(alert_id = open.id, "Alert already closed, skipping auto-resolve");
            return Ok(());
        };

        tracing::info!(alert_id = resolved.id, server_id, threshold_id = ctx.rule.id, "Alert auto-resolved");
        report.resolved.push(resolved.id);
        self.notify_resolved(resolved, ctx.server, Some(ctx.row)).await;
        Ok(())
    }

    async fn notify_resolved(&self, alert: Alert, server: Option<&Server>, threshold: Option<&AlertThreshold>) {
        if alert.notify_channels.is_empty() {
            return;
        }
        let channels = alert.notify_channels.clone();
        let notice = notice_for(alert, server, threshold);
        self.dispatcher.dispatch_resolved(&notice, &channels).await;
    }

    // -----------------------------------------------------------------------
    // Manual transitions
    // -----------------------------------------------------------------------

    /// `active -> acknowledged`, by a user.
    pub async fn acknowledge(
        &self,
        alert_id: DbId,
        user_id: Option<DbId>,
        notes: Option<&str>,
    ) -> Result<Alert, StoreError> {
        let alert = self.require_alert(alert_id).await?;
        ensure_can_acknowledge(alert_id, alert.status()?)?;

        match self
            .store
            .acknowledge_alert(alert_id, user_id, notes.unwrap_or_default(), Utc::now())
            .await?
        {
            Some(acknowledged) => {
                tracing::info!(alert_id, user_id, "Alert acknowledged");
                Ok(acknowledged)
            }
            None => Err(self.lost_race(alert_id, "acknowledge").await),
        }
    }

    /// `{active, acknowledged} -> resolved`, by a user. Sends the resolution
    /// notice on the channels the alert was delivered to.
    pub async fn resolve(
        &self,
        alert_id: DbId,
        user_id: Option<DbId>,
        notes: Option<&str>,
    ) -> Result<Alert, StoreError> {
        let alert = self.require_alert(alert_id).await?;
        ensure_can_resolve(alert_id, alert.status()?)?;

        let Some(resolved) = self
            .store
            .resolve_alert(alert_id, notes.unwrap_or_default(), Utc::now())
            .await?
        else {
            return Err(self.lost_race(alert_id, "resolve").await);
        };
        tracing::info!(alert_id, user_id, "Alert resolved");

        if !resolved.notify_channels.is_empty() {
            let server = self.store.find_server(resolved.server_id).await.ok().flatten();
            let threshold = match resolved.threshold_id {
                Some(id) => self.store.find_threshold(id).await.ok().flatten(),
                None => None,
            };
            self.notify_resolved(resolved.clone(), server.as_ref(), threshold.as_ref())
                .await;
        }
        Ok(resolved)
    }

    async fn require_alert(&self, alert_id: DbId) -> Result<Alert, StoreError> {
        self.store.find_alert(alert_id).await?.ok_or_else(|| {
            CoreError::NotFound {
                entity: "alert",
                id: alert_id,
            }
            .into()
        })
    }

    /// Build the error for a conditional update that matched nothing
    /// because the alert changed state after it was read.
    async fn lost_race(&self, alert_id: DbId, action: &'static str) -> StoreError {
        let current = match self.store.find_alert(alert_id).await {
            Ok(Some(alert)) => alert.status,
            Ok(None) => {
                return CoreError::NotFound {
                    entity: "alert",
                    id: alert_id,
                }
                .into()
            }
            Err(e) => return e,
        };
        CoreError::IllegalTransition {
            id: alert_id,
            from: current,
            action,
        }
        .into()
    }
}

/// Per-threshold evaluation inputs.
struct Context<'a> {
    sample: &'a MetricSample,
    rule: &'a ThresholdRule,
    row: &'a AlertThreshold,
    server: Option<&'a Server>,
    now: Timestamp,
}

fn notice_for(alert: Alert, server: Option<&Server>, threshold: Option<&AlertThreshold>) -> AlertNotice {
    let mut notice = AlertNotice::new(alert);
    if let Some(server) = server {
        notice.hostname = Some(server.hostname.clone());
        notice.ip_address = Some(server.ip_address.clone());
    }
    notice.webhook_url = threshold
        .map(|t| t.webhook_url.clone())
        .filter(|url| !url.trim().is_empty());
    notice
}
