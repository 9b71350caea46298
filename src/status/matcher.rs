use crate::datamodel::Threshold;
use crate::datamodel::status::{
    LEVEL_CRITICAL, LEVEL_WARNING, STATUS_HEALTHY, STATUS_UNDEFINED, STATUS_UNKNOWN,
};

/// Computes the status of an indicator from its thresholds and the values
/// returned by its query.
///
/// A threshold is breached when any value satisfies it. When several
/// thresholds are breached, `critical` wins over `warning`, which wins over
/// every other level; other levels are ordered lexicographically. Thresholds
/// sharing a level are all evaluated, any of them breaching is enough.
pub fn match_thresholds(thresholds: &[Threshold], values: &[f64]) -> String {
    if thresholds.is_empty() {
        return STATUS_UNDEFINED.to_string();
    }
    if values.is_empty() {
        return STATUS_UNKNOWN.to_string();
    }

    let mut breached = thresholds
        .iter()
        .filter(|threshold| {
            values
                .iter()
                .any(|value| threshold.operator.is_breached(*value, threshold.value))
        })
        .map(|threshold| threshold.level.as_str())
        .peekable();

    if breached.peek().is_none() {
        return STATUS_HEALTHY.to_string();
    }

    breached
        .min_by(|a, b| priority(a).cmp(&priority(b)).then_with(|| a.cmp(b)))
        .unwrap_or(STATUS_HEALTHY)
        .to_string()
}

fn priority(level: &str) -> u8 {
    match level {
        LEVEL_CRITICAL => 0,
        LEVEL_WARNING => 1,
        _ => 2,
    }
}
