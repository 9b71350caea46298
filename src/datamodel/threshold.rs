use serde::{Deserialize, Serialize};
use std::fmt;
use utoipa::ToSchema;

/// Comparison applied between a sample value and a threshold value.
///
/// `Undefined` only exists so that validation can report a missing or
/// unknown operator. Code acting on thresholds handles the six real
/// operators and treats `Undefined` as never breaching.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum ThresholdOperator {
    LessThan,
    LessThanOrEqual,
    Equal,
    NotEqual,
    GreaterThanOrEqual,
    GreaterThan,
    #[default]
    Undefined,
}

impl ThresholdOperator {
    pub fn as_str(&self) -> &'static str {
        match self {
            ThresholdOperator::LessThan => "lt",
            ThresholdOperator::LessThanOrEqual => "lte",
            ThresholdOperator::Equal => "eq",
            ThresholdOperator::NotEqual => "neq",
            ThresholdOperator::GreaterThanOrEqual => "gte",
            ThresholdOperator::GreaterThan => "gt",
            ThresholdOperator::Undefined => "undefined",
        }
    }

    /// PromQL comparison symbol, used when rendering alert expressions.
    pub fn symbol(&self) -> Option<&'static str> {
        match self {
            ThresholdOperator::LessThan => Some("<"),
            ThresholdOperator::LessThanOrEqual => Some("<="),
            ThresholdOperator::Equal => Some("=="),
            ThresholdOperator::NotEqual => Some("!="),
            ThresholdOperator::GreaterThanOrEqual => Some(">="),
            ThresholdOperator::GreaterThan => Some(">"),
            ThresholdOperator::Undefined => None,
        }
    }

    /// Returns true when `value` breaches a threshold set at `threshold`.
    pub fn is_breached(&self, value: f64, threshold: f64) -> bool {
        match self {
            ThresholdOperator::LessThan => value < threshold,
            ThresholdOperator::LessThanOrEqual => value <= threshold,
            ThresholdOperator::Equal => value == threshold,
            ThresholdOperator::NotEqual => value != threshold,
            ThresholdOperator::GreaterThanOrEqual => value >= threshold,
            ThresholdOperator::GreaterThan => value > threshold,
            ThresholdOperator::Undefined => false,
        }
    }
}

impl From<String> for ThresholdOperator {
    fn from(value: String) -> Self {
        match value.as_str() {
            "lt" => ThresholdOperator::LessThan,
            "lte" => ThresholdOperator::LessThanOrEqual,
            "eq" => ThresholdOperator::Equal,
            "neq" => ThresholdOperator::NotEqual,
            "gte" => ThresholdOperator::GreaterThanOrEqual,
            "gt" => ThresholdOperator::GreaterThan,
            _ => ThresholdOperator::Undefined,
        }
    }
}

impl From<ThresholdOperator> for String {
    fn from(value: ThresholdOperator) -> Self {
        value.as_str().to_string()
    }
}

impl fmt::Display for ThresholdOperator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Threshold {
    #[serde(default)]
    pub level: String,
    #[serde(default)]
    #[schema(value_type = String, example = "gt")]
    pub operator: ThresholdOperator,
    #[serde(default)]
    pub value: f64,
}

impl Threshold {
    pub fn new(level: &str, operator: ThresholdOperator, value: f64) -> Self {
        Self {
            level: level.to_string(),
            operator,
            value,
        }
    }
}
