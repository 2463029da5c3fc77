//! Threshold rules: comparison operators, severities, scope and validation.
//!
//! The comparison operator carries both halves of the hysteresis rule: the
//! trigger check used to open an alert and the clear check used to
//! auto-resolve one. The two are not plain negations of each other for the
//! inclusive operators; see [`Operator::clears`].

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::channels::ChannelSet;
use crate::error::CoreError;
use crate::metric::MetricType;
use crate::types::{DbId, Timestamp};

/// Default cooldown applied when a threshold is created without one.
pub const DEFAULT_COOLDOWN_MINUTES: i32 = 15;

// ---------------------------------------------------------------------------
// Operator
// ---------------------------------------------------------------------------

/// Comparison applied as `value <op> threshold`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Operator {
    #[serde(rename = ">")]
    GreaterThan,
    #[serde(rename = "<")]
    LessThan,
    #[serde(rename = ">=")]
    GreaterEqual,
    #[serde(rename = "<=")]
    LessEqual,
    /// Exact floating-point equality. Rarely satisfiable for measured values.
    #[serde(rename = "==")]
    Equal,
}

impl Operator {
    pub fn symbol(self) -> &'static str {
        match self {
            Self::GreaterThan => ">",
            Self::LessThan => "<",
            Self::GreaterEqual => ">=",
            Self::LessEqual => "<=",
            Self::Equal => "==",
        }
    }

    /// Whether `value` meets the trigger condition.
    pub fn check(self, value: f64, threshold: f64) -> bool {
        match self {
            Self::GreaterThan => value > threshold,
            Self::LessThan => value < threshold,
            Self::GreaterEqual => value >= threshold,
            Self::LessEqual => value <= threshold,
            Self::Equal => value == threshold,
        }
    }

    /// Whether an open alert raised by this operator should resolve at `value`.
    ///
    /// Strictness flips relative to the trigger: `>=` only clears strictly
    /// below the threshold, so a value sitting exactly on the boundary keeps
    /// the alert open.
    pub fn clears(self, value: f64, threshold: f64) -> bool {
        match self {
            Self::GreaterThan => value <= threshold,
            Self::LessThan => value >= threshold,
            Self::GreaterEqual => value < threshold,
            Self::LessEqual => value > threshold,
            Self::Equal => value != threshold,
        }
    }

    /// Wording used in alert messages.
    pub fn describe(self) -> &'static str {
        match self {
            Self::GreaterThan => "above",
            Self::LessThan => "below",
            Self::GreaterEqual => "at or above",
            Self::LessEqual => "at or below",
            Self::Equal => "equal to",
        }
    }
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}

impl FromStr for Operator {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            ">" => Ok(Self::GreaterThan),
            "<" => Ok(Self::LessThan),
            ">=" => Ok(Self::GreaterEqual),
            "<=" => Ok(Self::LessEqual),
            "==" => Ok(Self::Equal),
            other => Err(CoreError::Validation(format!(
                "unknown operator: {other} (expected one of >, <, >=, <=, ==)"
            ))),
        }
    }
}

// ---------------------------------------------------------------------------
// Severity
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Info,
    Warning,
    Critical,
}

impl Severity {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Info => "info",
            Self::Warning => "warning",
            Self::Critical => "critical",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Severity {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "info" => Ok(Self::Info),
            "warning" => Ok(Self::Warning),
            "critical" => Ok(Self::Critical),
            other => Err(CoreError::Validation(format!("unknown severity: {other}"))),
        }
    }
}

// ---------------------------------------------------------------------------
// Scope
// ---------------------------------------------------------------------------

/// Which servers a threshold applies to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ThresholdScope {
    Global,
    Server(DbId),
    Group(DbId),
}

impl ThresholdScope {
    /// Build a scope from the two nullable columns, rejecting the case where
    /// both are set.
    pub fn from_columns(server_id: Option<DbId>, group_id: Option<DbId>) -> Result<Self, CoreError> {
        match (server_id, group_id) {
            (None, None) => Ok(Self::Global),
            (Some(id), None) => Ok(Self::Server(id)),
            (None, Some(id)) => Ok(Self::Group(id)),
            (Some(_), Some(_)) => Err(CoreError::Validation(
                "a threshold may target a server or a group, not both".to_string(),
            )),
        }
    }
}

// ---------------------------------------------------------------------------
// ThresholdRule
// ---------------------------------------------------------------------------

/// A validated threshold as the evaluator sees it.
#[derive(Debug, Clone, PartialEq)]
pub struct ThresholdRule {
    pub id: DbId,
    pub name: String,
    pub metric_type: MetricType,
    pub operator: Operator,
    pub value: f64,
    pub severity: Severity,
    pub cooldown_minutes: i32,
    pub scope: ThresholdScope,
    pub channels: ChannelSet,
    pub last_triggered_at: Option<Timestamp>,
}

// ---------------------------------------------------------------------------
// ThresholdDefinition (admin input)
// ---------------------------------------------------------------------------

/// Admin-supplied threshold definition used for both create and full update.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct ThresholdDefinition {
    #[validate(length(min = 1, max = 100, message = "name must be 1-100 characters"))]
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub metric_type: String,
    pub operator: String,
    pub value: f64,
    #[serde(default)]
    #[validate(range(min = 0, message = "duration_secs must not be negative"))]
    pub duration_secs: i32,
    pub severity: String,
    #[serde(default)]
    pub enable_discord: bool,
    #[serde(default)]
    pub enable_email: bool,
    #[serde(default)]
    pub enable_webhook: bool,
    #[serde(default)]
    #[validate(length(max = 255, message = "webhook_url must be at most 255 characters"))]
    pub webhook_url: String,
    #[serde(default = "default_cooldown")]
    #[validate(range(min = 0, message = "cooldown_minutes must not be negative"))]
    pub cooldown_minutes: i32,
    pub server_id: Option<DbId>,
    pub group_id: Option<DbId>,
    #[serde(default = "default_enabled")]
    pub enabled: bool,
}

fn default_cooldown() -> i32 {
    DEFAULT_COOLDOWN_MINUTES
}

fn default_enabled() -> bool {
    true
}

impl ThresholdDefinition {
    /// Validate field ranges, enumerations and the scope invariant.
    pub fn validate_definition(&self) -> Result<(), CoreError> {
        self.validate()
            .map_err(|e| CoreError::Validation(e.to_string()))?;
        self.metric_type.parse::<MetricType>()?;
        self.operator.parse::<Operator>()?;
        self.severity.parse::<Severity>()?;
        ThresholdScope::from_columns(self.server_id, self.group_id)?;
        if !self.value.is_finite() {
            return Err(CoreError::Validation("value must be a finite number".to_string()));
        }
        if self.enable_webhook && self.webhook_url.trim().is_empty() {
            return Err(CoreError::Validation(
                "webhook_url is required when the webhook channel is enabled".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    fn definition() -> ThresholdDefinition {
        ThresholdDefinition {
            name: "High CPU".to_string(),
            description: String::new(),
            metric_type: "cpu".to_string(),
            operator: ">".to_string(),
            value: 90.0,
            duration_secs: 0,
            severity: "critical".to_string(),
            enable_discord: true,
            enable_email: false,
            enable_webhook: false,
            webhook_url: String::new(),
            cooldown_minutes: 15,
            server_id: None,
            group_id: None,
            enabled: true,
        }
    }

    #[test]
    fn trigger_checks_follow_operator() {
        assert!(Operator::GreaterThan.check(91.0, 90.0));
        assert!(!Operator::GreaterThan.check(90.0, 90.0));
        assert!(Operator::GreaterEqual.check(90.0, 90.0));
        assert!(Operator::LessThan.check(10.0, 20.0));
        assert!(Operator::LessEqual.check(20.0, 20.0));
        assert!(Operator::Equal.check(50.0, 50.0));
    }

    #[test]
    fn clear_rule_swaps_strictness() {
        // `>` clears on the boundary, `>=` does not.
        assert!(Operator::GreaterThan.clears(90.0, 90.0));
        assert!(!Operator::GreaterEqual.clears(90.0, 90.0));
        assert!(Operator::GreaterEqual.clears(89.9, 90.0));

        assert!(Operator::LessThan.clears(20.0, 20.0));
        assert!(!Operator::LessEqual.clears(20.0, 20.0));
        assert!(Operator::LessEqual.clears(20.1, 20.0));

        assert!(Operator::Equal.clears(50.1, 50.0));
        assert!(!Operator::Equal.clears(50.0, 50.0));
    }

    #[test]
    fn equality_is_exact_and_fragile() {
        // Known weak comparison mode: 0.1 + 0.2 is not 0.3 in binary floating point.
        assert!(!Operator::Equal.check(0.1 + 0.2, 0.3));
    }

    #[test]
    fn operator_parses_only_supported_symbols() {
        for symbol in [">", "<", ">=", "<=", "=="] {
            let op: Operator = symbol.parse().unwrap();
            assert_eq!(op.symbol(), symbol);
        }
        assert_matches!("!=".parse::<Operator>(), Err(CoreError::Validation(_)));
        assert_matches!("=>".parse::<Operator>(), Err(CoreError::Validation(_)));
    }

    #[test]
    fn scope_rejects_server_and_group_together() {
        assert_eq!(ThresholdScope::from_columns(None, None).unwrap(), ThresholdScope::Global);
        assert_eq!(
            ThresholdScope::from_columns(Some(3), None).unwrap(),
            ThresholdScope::Server(3)
        );
        assert_eq!(
            ThresholdScope::from_columns(None, Some(4)).unwrap(),
            ThresholdScope::Group(4)
        );
        assert_matches!(
            ThresholdScope::from_columns(Some(3), Some(4)),
            Err(CoreError::Validation(_))
        );
    }

    #[test]
    fn valid_definition_passes() {
        assert!(definition().validate_definition().is_ok());
    }

    #[test]
    fn definition_with_both_scopes_is_rejected() {
        let mut def = definition();
        def.server_id = Some(1);
        def.group_id = Some(2);
        assert_matches!(def.validate_definition(), Err(CoreError::Validation(_)));
    }

    #[test]
    fn definition_with_bad_operator_is_rejected() {
        let mut def = definition();
        def.operator = "~".to_string();
        assert_matches!(def.validate_definition(), Err(CoreError::Validation(_)));
    }

    #[test]
    fn definition_with_negative_cooldown_is_rejected() {
        let mut def = definition();
        def.cooldown_minutes = -1;
        assert_matches!(def.validate_definition(), Err(CoreError::Validation(_)));
    }

    #[test]
    fn webhook_channel_requires_url() {
        let mut def = definition();
        def.enable_webhook = true;
        assert_matches!(def.validate_definition(), Err(CoreError::Validation(_)));
        def.webhook_url = "https://hooks.example.com/alerts".to_string();
        assert!(def.validate_definition().is_ok());
    }

    #[test]
    fn definition_defaults_apply_when_fields_omitted() {
        let def: ThresholdDefinition = serde_json::from_value(serde_json::json!({
            "name": "Disk",
            "metric_type": "disk",
            "operator": ">=",
            "value": 90.0,
            "severity": "warning"
        }))
        .unwrap();
        assert_eq!(def.cooldown_minutes, DEFAULT_COOLDOWN_MINUTES);
        assert!(def.enabled);
        assert!(def.validate_definition().is_ok());
    }
}
