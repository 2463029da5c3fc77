//! Condition evaluation: sample + threshold rule -> (value, triggered).
//!
//! Pure logic, no database access.

use crate::metric::MetricSample;
use crate::threshold::ThresholdRule;

/// Outcome of evaluating one rule against one sample.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Evaluation {
    /// Extracted scalar, or `0.0` when the metric is not measurable.
    pub value: f64,
    pub triggered: bool,
    /// `false` when the sample cannot produce a value for the rule's metric
    /// (a percentage with a zero total).
    pub measurable: bool,
}

impl Evaluation {
    /// Whether an open alert under `rule` should auto-resolve.
    ///
    /// Never true for an unmeasurable sample: missing data is not evidence
    /// that the condition has cleared.
    pub fn clears(&self, rule: &ThresholdRule) -> bool {
        self.measurable && rule.operator.clears(self.value, rule.value)
    }
}

/// Evaluate the trigger condition of `rule` against `sample`.
pub fn evaluate(sample: &MetricSample, rule: &ThresholdRule) -> Evaluation {
    match sample.value_of(rule.metric_type) {
        Some(value) => Evaluation {
            value,
            triggered: rule.operator.check(value, rule.value),
            measurable: true,
        },
        None => Evaluation {
            value: 0.0,
            triggered: false,
            measurable: false,
        },
    }
}
