//! Alert lifecycle rules: status values, manual transition guards, the
//! cooldown window and notification text.
//!
//! Pure logic, no database access.

use std::fmt;
use std::str::FromStr;

use chrono::Duration;
use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::metric::MetricType;
use crate::threshold::Operator;
use crate::types::{DbId, Timestamp};

/// Note appended to an alert closed by the evaluator.
pub const AUTO_RESOLVE_NOTE: &str = "auto-resolved when values normalized";

// ---------------------------------------------------------------------------
// Status
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AlertStatus {
    Active,
    Acknowledged,
    Resolved,
    Suppressed,
}

impl AlertStatus {
    /// Statuses that count as an open incident for a (server, threshold) pair.
    pub const OPEN: [AlertStatus; 2] = [AlertStatus::Active, AlertStatus::Acknowledged];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Acknowledged => "acknowledged",
            Self::Resolved => "resolved",
            Self::Suppressed => "suppressed",
        }
    }

    pub fn is_open(self) -> bool {
        matches!(self, Self::Active | Self::Acknowledged)
    }

    pub fn can_acknowledge(self) -> bool {
        self == Self::Active
    }

    pub fn can_resolve(self) -> bool {
        self.is_open()
    }
}

impl fmt::Display for AlertStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AlertStatus {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "active" => Ok(Self::Active),
            "acknowledged" => Ok(Self::Acknowledged),
            "resolved" => Ok(Self::Resolved),
            "suppressed" => Ok(Self::Suppressed),
            other => Err(CoreError::Validation(format!("unknown alert status: {other}"))),
        }
    }
}

/// Guard for the manual `active -> acknowledged` transition.
pub fn ensure_can_acknowledge(id: DbId, status: AlertStatus) -> Result<(), CoreError> {
    if status.can_acknowledge() {
        Ok(())
    } else {
        Err(CoreError::IllegalTransition {
            id,
            from: status.as_str().to_string(),
            action: "acknowledge",
        })
    }
}

/// Guard for the manual `{active, acknowledged} -> resolved` transition.
pub fn ensure_can_resolve(id: DbId, status: AlertStatus) -> Result<(), CoreError> {
    if status.can_resolve() {
        Ok(())
    } else {
        Err(CoreError::IllegalTransition {
            id,
            from: status.as_str().to_string(),
            action: "resolve",
        })
    }
}

// ---------------------------------------------------------------------------
// Cooldown
// ---------------------------------------------------------------------------

/// Whether `now` is before `last + cooldown_minutes`.
///
/// A `now` earlier than `last` (a sample read before a concurrent evaluation
/// committed) is still cooling down. A threshold that has never fired, or has
/// a zero cooldown, is never cooling down.
pub fn in_cooldown(last_triggered_at: Option<Timestamp>, cooldown_minutes: i32, now: Timestamp) -> bool {
    match last_triggered_at {
        Some(last) if cooldown_minutes > 0 => {
            now < last + Duration::minutes(i64::from(cooldown_minutes))
        }
        _ => false,
    }
}

// ---------------------------------------------------------------------------
// Notification text
// ---------------------------------------------------------------------------

/// Alert title, e.g. `Alert: CPU on web-01`.
pub fn alert_title(metric_type: MetricType, hostname: Option<&str>, server_id: DbId) -> String {
    match hostname {
        Some(host) => format!("Alert: {} on {host}", metric_type.label()),
        None => format!("Alert: {} on Server #{server_id}", metric_type.label()),
    }
}

/// Alert body describing the crossing.
pub fn alert_message(metric_type: MetricType, value: f64, operator: Operator, threshold: f64) -> String {
    format!(
        "Metric {} reached {value:.2}, crossing the configured threshold {operator} {threshold:.2}",
        metric_type.label()
    )
}

/// Append `note` to existing alert notes, one per line.
pub fn append_note(existing: &str, note: &str) -> String {
    let note = note.trim();
    if note.is_empty() {
        existing.to_string()
    } else if existing.is_empty() {
        note.to_string()
    } else {
        format!("{existing}\n{note}")
    }
}

/// Human readable incident duration used in resolution notices.
pub fn format_duration(duration: Duration) -> String {
    let secs = duration.num_seconds().max(0);
    if secs < 60 {
        format!("{secs} seconds")
    } else if secs < 3600 {
        format!("{} minutes", secs / 60)
    } else if secs < 86_400 {
        format!("{}h {}m", secs / 3600, (secs % 3600) / 60)
    } else {
        format!("{}d {}h", secs / 86_400, (secs % 86_400) / 3600)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use chrono::{TimeZone, Utc};

    fn at(h: u32, m: u32, s: u32) -> Timestamp {
        Utc.with_ymd_and_hms(2024, 5, 1, h, m, s).unwrap()
    }

    #[test]
    fn only_active_alerts_can_be_acknowledged() {
        assert!(ensure_can_acknowledge(1, AlertStatus::Active).is_ok());
        for status in [AlertStatus::Acknowledged, AlertStatus::Resolved, AlertStatus::Suppressed] {
            assert_matches!(
                ensure_can_acknowledge(1, status),
                Err(CoreError::IllegalTransition { action: "acknowledge", .. })
            );
        }
    }

    #[test]
    fn open_alerts_can_be_resolved() {
        assert!(ensure_can_resolve(1, AlertStatus::Active).is_ok());
        assert!(ensure_can_resolve(1, AlertStatus::Acknowledged).is_ok());
        assert_matches!(
            ensure_can_resolve(7, AlertStatus::Resolved),
            Err(CoreError::IllegalTransition { id: 7, action: "resolve", .. })
        );
        assert_matches!(
            ensure_can_resolve(7, AlertStatus::Suppressed),
            Err(CoreError::IllegalTransition { .. })
        );
    }

    #[test]
    fn cooldown_window_is_half_open() {
        let last = at(12, 0, 0);
        assert!(in_cooldown(Some(last), 2, at(12, 0, 30)));
        assert!(in_cooldown(Some(last), 2, at(12, 1, 59)));
        assert!(!in_cooldown(Some(last), 2, at(12, 2, 0)));
        assert!(!in_cooldown(Some(last), 2, at(12, 3, 0)));
    }

    #[test]
    fn sample_older_than_last_trigger_is_cooling_down() {
        let last = at(12, 0, 1);
        assert!(in_cooldown(Some(last), 15, at(12, 0, 0)));
        assert!(in_cooldown(Some(last), 15, at(11, 30, 0)));
    }

    #[test]
    fn no_cooldown_without_history_or_duration() {
        assert!(!in_cooldown(None, 15, at(12, 0, 0)));
        assert!(!in_cooldown(Some(at(12, 0, 0)), 0, at(12, 0, 0)));
    }

    #[test]
    fn title_falls_back_to_server_id() {
        assert_eq!(alert_title(MetricType::Cpu, Some("web-01"), 3), "Alert: CPU on web-01");
        assert_eq!(alert_title(MetricType::Disk, None, 3), "Alert: Disk on Server #3");
    }

    #[test]
    fn message_formats_two_decimals() {
        assert_eq!(
            alert_message(MetricType::Memory, 91.236, Operator::GreaterEqual, 90.0),
            "Metric Memory reached 91.24, crossing the configured threshold >= 90.00"
        );
    }

    #[test]
    fn notes_are_appended() {
        assert_eq!(append_note("", "first"), "first");
        assert_eq!(append_note("first", "second"), "first\nsecond");
        assert_eq!(append_note("first", "  "), "first");
    }

    #[test]
    fn durations_pick_largest_units() {
        assert_eq!(format_duration(Duration::seconds(42)), "42 seconds");
        assert_eq!(format_duration(Duration::seconds(125)), "2 minutes");
        assert_eq!(format_duration(Duration::seconds(3 * 3600 + 15 * 60)), "3h 15m");
        assert_eq!(format_duration(Duration::seconds(2 * 86_400 + 5 * 3600)), "2d 5h");
    }

    #[test]
    fn status_round_trips() {
        for status in [
            AlertStatus::Active,
            AlertStatus::Acknowledged,
            AlertStatus::Resolved,
            AlertStatus::Suppressed,
        ] {
            assert_eq!(status.as_str().parse::<AlertStatus>().unwrap(), status);
        }
        assert!(!AlertStatus::Resolved.is_open());
        assert!(AlertStatus::Acknowledged.is_open());
    }
}
