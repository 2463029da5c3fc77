//! Metric types and the sample shape the evaluator reads.
//!
//! A [`MetricSample`] is one measurement pushed by a host agent. Only the
//! fields needed to derive the five alertable scalars are used here; the
//! optional secondary fields are carried for storage and display.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::types::{DbId, Timestamp};

/// Bytes per megabyte used for network conversions.
const BYTES_PER_MB: f64 = 1024.0 * 1024.0;

/// The scalar a threshold compares against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MetricType {
    Cpu,
    Memory,
    Disk,
    NetworkIn,
    NetworkOut,
}

impl MetricType {
    pub const ALL: [MetricType; 5] = [
        MetricType::Cpu,
        MetricType::Memory,
        MetricType::Disk,
        MetricType::NetworkIn,
        MetricType::NetworkOut,
    ];

    /// Canonical storage name (`cpu`, `memory`, ...).
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Cpu => "cpu",
            Self::Memory => "memory",
            Self::Disk => "disk",
            Self::NetworkIn => "network_in",
            Self::NetworkOut => "network_out",
        }
    }

    /// Human-readable label used in alert titles and messages.
    pub fn label(self) -> &'static str {
        match self {
            Self::Cpu => "CPU",
            Self::Memory => "Memory",
            Self::Disk => "Disk",
            Self::NetworkIn => "Network (in)",
            Self::NetworkOut => "Network (out)",
        }
    }
}

impl fmt::Display for MetricType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MetricType {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "cpu" => Ok(Self::Cpu),
            "memory" => Ok(Self::Memory),
            "disk" => Ok(Self::Disk),
            "network_in" => Ok(Self::NetworkIn),
            "network_out" => Ok(Self::NetworkOut),
            other => Err(CoreError::Validation(format!(
                "unknown metric type: {other}"
            ))),
        }
    }
}

/// One measurement for one server. Immutable once ingested.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricSample {
    pub server_id: DbId,
    pub timestamp: Timestamp,
    /// CPU usage percentage (0-100).
    pub cpu_usage: f64,
    pub cpu_temp: Option<f64>,
    pub memory_total: i64,
    pub memory_used: i64,
    pub memory_free: i64,
    pub disk_total: i64,
    pub disk_used: i64,
    pub disk_free: i64,
    /// Bytes sent since the previous sample.
    pub net_upload: i64,
    /// Bytes received since the previous sample.
    pub net_download: i64,
}

impl MetricSample {
    /// Extract the scalar for `metric_type`.
    ///
    /// Returns `None` when the value is undefined, i.e. a percentage whose
    /// `total` is zero.
    pub fn value_of(&self, metric_type: MetricType) -> Option<f64> {
        match metric_type {
            MetricType::Cpu => Some(self.cpu_usage),
            MetricType::Memory => percent(self.memory_used, self.memory_total),
            MetricType::Disk => percent(self.disk_used, self.disk_total),
            MetricType::NetworkIn => Some(self.net_download as f64 / BYTES_PER_MB),
            MetricType::NetworkOut => Some(self.net_upload as f64 / BYTES_PER_MB),
        }
    }
}

fn percent(used: i64, total: i64) -> Option<f64> {
    if total == 0 {
        return None;
    }
    Some(used as f64 / total as f64 * 100.0)
}
