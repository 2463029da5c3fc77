//! Alert incident rows, the insert DTO and list filters.

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use servwatch_core::alert::AlertStatus;
use servwatch_core::error::CoreError;
use servwatch_core::types::{DbId, Timestamp};

/// An alert incident.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Alert {
    pub id: DbId,
    pub title: String,
    pub message: String,
    pub metric_type: String,
    pub metric_value: f64,
    pub threshold_value: f64,
    pub operator: String,
    pub severity: String,
    pub status: String,
    pub server_id: DbId,
    pub threshold_id: Option<DbId>,
    pub triggered_at: Timestamp,
    pub resolved_at: Option<Timestamp>,
    pub acknowledged_at: Option<Timestamp>,
    pub acknowledged_by: Option<DbId>,
    pub notified_at: Option<Timestamp>,
    pub notify_channels: Vec<String>,
    pub notes: String,
    pub deleted_at: Option<Timestamp>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl Alert {
    pub fn status(&self) -> Result<AlertStatus, CoreError> {
        self.status.parse()
    }
}

/// Values for a freshly opened alert. Status is always `active`.
#[derive(Debug, Clone)]
pub struct NewAlert {
    pub title: String,
    pub message: String,
    pub metric_type: String,
    pub metric_value: f64,
    pub threshold_value: f64,
    pub operator: String,
    pub severity: String,
    pub server_id: DbId,
    pub threshold_id: DbId,
    pub triggered_at: Timestamp,
}

/// Result of the atomic check-and-open step.
#[derive(Debug, Clone)]
pub enum OpenAlertOutcome {
    Opened(Alert),
    /// An active or acknowledged alert already exists for the pair.
    AlreadyOpen(DbId),
    /// The threshold fired too recently.
    CoolingDown,
    /// The threshold was deleted or disabled after it was resolved.
    ThresholdGone,
}

/// Optional filters for alert listing.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AlertFilter {
    pub server_id: Option<DbId>,
    pub status: Option<String>,
    pub severity: Option<String>,
    pub start_time: Option<Timestamp>,
    pub end_time: Option<Timestamp>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

/// Body for manual acknowledge / resolve actions.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AlertActionInput {
    pub notes: Option<String>,
}
