use once_cell::sync::Lazy;
use regex::Regex;
use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum IntervalError {
    #[error("Invalid interval '{0}', expected a duration such as 30s, 1m or 1h30m")]
    Invalid(String),
    #[error("Interval must be greater than zero")]
    Zero,
}

static SEGMENT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(\d+)(ms|s|m|h)").expect("Failed to compile regex"));

static FULL: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(?:\d+(?:ms|s|m|h))+$").expect("Failed to compile regex"));

/// Parses command line intervals like `500ms`, `30s`, `1m` or `1h30m`.
pub fn parse_interval(input: &str) -> Result<Duration, IntervalError> {
    let input = input.trim();
    if !FULL.is_match(input) {
        return Err(IntervalError::Invalid(input.to_string()));
    }

    let mut total = Duration::ZERO;
    for capture in SEGMENT.captures_iter(input) {
        let amount: u64 = capture[1]
            .parse()
            .map_err(|_| IntervalError::Invalid(input.to_string()))?;
        let segment = match &capture[2] {
            "ms" => Duration::from_millis(amount),
            "s" => Duration::from_secs(amount),
            "m" => Duration::from_secs(amount.saturating_mul(60)),
            _ => Duration::from_secs(amount.saturating_mul(3600)),
        };
        total = total.saturating_add(segment);
    }

    if total.is_zero() {
        return Err(IntervalError::Zero);
    }
    Ok(total)
}
