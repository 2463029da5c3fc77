//! Alert threshold rows.

use serde::Serialize;
use sqlx::FromRow;
use servwatch_core::channels::ChannelSet;
use servwatch_core::error::CoreError;
use servwatch_core::threshold::{ThresholdRule, ThresholdScope};
use servwatch_core::types::{DbId, Timestamp};

/// A threshold as stored. Create and update input is
/// [`servwatch_core::threshold::ThresholdDefinition`].
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct AlertThreshold {
    pub id: DbId,
    pub name: String,
    pub description: String,
    pub metric_type: String,
    pub operator: String,
    pub value: f64,
    pub duration_secs: i32,
    pub severity: String,
    pub enabled: bool,
    pub enable_discord: bool,
    pub enable_email: bool,
    pub enable_webhook: bool,
    pub webhook_url: String,
    pub cooldown_minutes: i32,
    pub last_triggered_at: Option<Timestamp>,
    pub server_id: Option<DbId>,
    pub group_id: Option<DbId>,
    pub created_by: Option<DbId>,
    pub deleted_at: Option<Timestamp>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl AlertThreshold {
    /// Parse the stored columns into an evaluator rule.
    ///
    /// Fails only if the row violates the constraints enforced on write.
    pub fn to_rule(&self) -> Result<ThresholdRule, CoreError> {
        Ok(ThresholdRule {
            id: self.id,
            name: self.name.clone(),
            metric_type: self.metric_type.parse()?,
            operator: self.operator.parse()?,
            value: self.value,
            severity: self.severity.parse()?,
            cooldown_minutes: self.cooldown_minutes,
            scope: ThresholdScope::from_columns(self.server_id, self.group_id)?,
            channels: ChannelSet {
                discord: self.enable_discord,
                email: self.enable_email,
                webhook: self.enable_webhook,
            },
            last_triggered_at: self.last_triggered_at,
        })
    }
}
