use super::document::{CHART_TYPES, IndicatorDocument, SUPPORTED_API_VERSIONS, is_supported_api_version};
use super::threshold::ThresholdOperator;
use once_cell::sync::Lazy;
use regex::Regex;
use thiserror::Error;

/// Bare Prometheus metric identifier, without label selectors.
static METRIC_NAME: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[a-zA-Z_:][a-zA-Z0-9_:]*$").expect("Failed to compile regex"));

/// Label key reserved by the dashboards for the query step.
const RESERVED_STEP_LABEL: &str = "step";

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ValidationError {
    #[error("apiVersion is required")]
    MissingApiVersion,

    #[error("invalid apiVersion '{0}', supported versions are: {supported}", supported = SUPPORTED_API_VERSIONS.join(", "))]
    UnsupportedApiVersion(String),

    #[error("product name is required")]
    MissingProductName,

    #[error("product version is required")]
    MissingProductVersion,

    #[error("metadata cannot contain the reserved '{0}' label")]
    ReservedStepLabel(String),

    #[error("indicators[{index}] name is required")]
    MissingIndicatorName { index: usize },

    #[error("indicators[{index}] name '{name}' must not contain leading, trailing or repeated whitespace")]
    IndicatorNameNotNormalised { index: usize, name: String },

    #[error("indicators[{index}] name '{name}' must be a valid promql metric name without label selectors")]
    InvalidIndicatorName { index: usize, name: String },

    #[error("indicators[{index}] promql is required")]
    MissingPromql { index: usize },

    #[error("indicators[{index}].thresholds[{threshold}] operator is required and must be one of lt, lte, eq, neq, gte, gt")]
    UndefinedOperator { index: usize, threshold: usize },

    #[error("indicators[{index}] invalid chartType '{chart_type}', allowed values are: {allowed}", allowed = CHART_TYPES.join(", "))]
    InvalidChartType { index: usize, chart_type: String },

    #[error("layout sections[{section}] references unknown indicator '{name}'")]
    UnknownLayoutIndicator { section: usize, name: String },
}

fn normalise_whitespace(value: &str) -> String {
    value.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Checks a document and returns every error found.
///
/// An empty result means the document can be stored.
pub fn validate(document: &IndicatorDocument) -> Vec<ValidationError> {
    let mut errors = Vec::new();

    if document.api_version.is_empty() {
        errors.push(ValidationError::MissingApiVersion);
    } else if !is_supported_api_version(&document.api_version) {
        errors.push(ValidationError::UnsupportedApiVersion(
            document.api_version.clone(),
        ));
    }

    let product = &document.spec.product;
    if product.name.is_empty() {
        errors.push(ValidationError::MissingProductName);
    }
    if product.version.is_empty() {
        errors.push(ValidationError::MissingProductVersion);
    }

    for key in document.metadata.labels.keys() {
        if key.eq_ignore_ascii_case(RESERVED_STEP_LABEL) {
            errors.push(ValidationError::ReservedStepLabel(key.clone()));
        }
    }

    for (index, indicator) in document.spec.indicators.iter().enumerate() {
        let name = &indicator.name;
        if name.is_empty() {
            errors.push(ValidationError::MissingIndicatorName { index });
        } else if normalise_whitespace(name) != *name {
            errors.push(ValidationError::IndicatorNameNotNormalised {
                index,
                name: name.clone(),
            });
        } else if !METRIC_NAME.is_match(name) {
            errors.push(ValidationError::InvalidIndicatorName {
                index,
                name: name.clone(),
            });
        }

        if indicator.promql.trim().is_empty() {
            errors.push(ValidationError::MissingPromql { index });
        }

        for (threshold, value) in indicator.thresholds.iter().enumerate() {
            if value.operator == ThresholdOperator::Undefined {
                errors.push(ValidationError::UndefinedOperator { index, threshold });
            }
        }

        let chart_type = &indicator.presentation.chart_type;
        if !chart_type.is_empty() && !CHART_TYPES.contains(&chart_type.as_str()) {
            errors.push(ValidationError::InvalidChartType {
                index,
                chart_type: chart_type.clone(),
            });
        }
    }

    for (section_index, section) in document.spec.layout.sections.iter().enumerate() {
        for name in &section.indicators {
            if document.indicator(name).is_none() {
                errors.push(ValidationError::UnknownLayoutIndicator {
                    section: section_index,
                    name: name.clone(),
                });
            }
        }
    }

    errors
}
