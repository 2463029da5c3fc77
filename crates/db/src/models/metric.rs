//! Metric sample rows (append-only).

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use servwatch_core::metric::MetricSample;
use servwatch_core::types::{DbId, Timestamp};

/// A stored metric sample.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Metric {
    pub id: DbId,
    pub server_id: DbId,
    pub timestamp: Timestamp,
    pub cpu_usage: f64,
    pub cpu_temp: Option<f64>,
    pub memory_total: i64,
    pub memory_used: i64,
    pub memory_free: i64,
    pub disk_total: i64,
    pub disk_used: i64,
    pub disk_free: i64,
    pub net_upload: i64,
    pub net_download: i64,
    pub created_at: Timestamp,
}

impl Metric {
    /// The evaluator's view of this row.
    pub fn to_sample(&self) -> MetricSample {
        MetricSample {
            server_id: self.server_id,
            timestamp: self.timestamp,
            cpu_usage: self.cpu_usage,
            cpu_temp: self.cpu_temp,
            memory_total: self.memory_total,
            memory_used: self.memory_used,
            memory_free: self.memory_free,
            disk_total: self.disk_total,
            disk_used: self.disk_used,
            disk_free: self.disk_free,
            net_upload: self.net_upload,
            net_download: self.net_download,
        }
    }
}

/// DTO pushed by a host agent. `timestamp` defaults to the insert time.
#[derive(Debug, Clone, Deserialize)]
pub struct CreateMetric {
    pub server_id: DbId,
    pub timestamp: Option<Timestamp>,
    #[serde(default)]
    pub cpu_usage: f64,
    pub cpu_temp: Option<f64>,
    #[serde(default)]
    pub memory_total: i64,
    #[serde(default)]
    pub memory_used: i64,
    #[serde(default)]
    pub memory_free: i64,
    #[serde(default)]
    pub disk_total: i64,
    #[serde(default)]
    pub disk_used: i64,
    #[serde(default)]
    pub disk_free: i64,
    #[serde(default)]
    pub net_upload: i64,
    #[serde(default)]
    pub net_download: i64,
}
