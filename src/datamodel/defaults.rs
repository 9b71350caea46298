use super::document::{IndicatorDocument, IndicatorType, Section};

pub const DEFAULT_ALERT_FOR: &str = "1m";
pub const DEFAULT_ALERT_STEP: &str = "1m";
pub const DEFAULT_CHART_TYPE: &str = "step";

/// Sections synthesised when a document has no layout, in display order.
const DEFAULT_SECTIONS: &[(&str, &[IndicatorType])] = &[
    (
        "Service Level Indicators",
        &[IndicatorType::ServiceLevelIndicator],
    ),
    (
        "Key Performance Indicators",
        &[IndicatorType::KeyPerformanceIndicator],
    ),
    (
        "Metrics",
        &[IndicatorType::DefaultIndicator, IndicatorType::Undefined],
    ),
];

/// Fills the unset parts of a document with their default values.
///
/// Applying the defaults twice gives the same document.
pub fn apply_defaults(document: &mut IndicatorDocument) {
    for indicator in document.spec.indicators.iter_mut() {
        if indicator.alert.for_duration.is_empty() {
            indicator.alert.for_duration = DEFAULT_ALERT_FOR.to_string();
        }
        if indicator.alert.step.is_empty() {
            indicator.alert.step = DEFAULT_ALERT_STEP.to_string();
        }

        let presentation = &mut indicator.presentation;
        if presentation.chart_type.is_empty() {
            presentation.chart_type = DEFAULT_CHART_TYPE.to_string();
        }
        if presentation.labels.is_none() {
            presentation.labels = Some(Vec::new());
        }
    }

    if document.spec.layout.sections.is_empty() {
        document.spec.layout.sections = default_sections(document);
    }

    if document.spec.layout.title.is_empty() {
        let product = &document.spec.product;
        document.spec.layout.title = format!("{} - {}", product.name, product.version);
    }
}

fn default_sections(document: &IndicatorDocument) -> Vec<Section> {
    DEFAULT_SECTIONS
        .iter()
        .filter_map(|(title, types)| {
            let indicators: Vec<String> = document
                .spec
                .indicators
                .iter()
                .filter(|indicator| types.contains(&indicator.indicator_type))
                .map(|indicator| indicator.name.clone())
                .collect();

            if indicators.is_empty() {
                None
            } else {
                Some(Section {
                    title: title.to_string(),
                    description: String::new(),
                    indicators,
                })
            }
        })
        .collect()
}
