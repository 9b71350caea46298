use super::{Artifact, DocumentConverter, artifact_file_name};
use crate::datamodel::status::{LEVEL_CRITICAL, LEVEL_WARNING};
use crate::datamodel::{Indicator, IndicatorDocument, ThresholdOperator};
use anyhow::{Context, Result};
use serde_json::{Value, json};

const SCHEMA_VERSION: u32 = 16;

fn panel_title(indicator: &Indicator) -> String {
    indicator
        .documentation
        .get("title")
        .filter(|title| !title.is_empty())
        .cloned()
        .unwrap_or_else(|| indicator.name.clone())
}

/// Grafana graph panel thresholds only know about "above" and "below".
fn panel_thresholds(indicator: &Indicator) -> Vec<Value> {
    indicator
        .thresholds
        .iter()
        .filter_map(|threshold| {
            let op = match threshold.operator {
                ThresholdOperator::GreaterThan | ThresholdOperator::GreaterThanOrEqual => "gt",
                ThresholdOperator::LessThan | ThresholdOperator::LessThanOrEqual => "lt",
                _ => return None,
            };
            let color_mode = match threshold.level.as_str() {
                LEVEL_CRITICAL => "critical",
                LEVEL_WARNING => "warning",
                _ => "custom",
            };
            Some(json!({
                "value": threshold.value,
                "colorMode": color_mode,
                "op": op,
                "fill": true,
                "line": true,
                "yaxis": "left",
            }))
        })
        .collect()
}

fn row(indicator: &Indicator, id: usize) -> Value {
    let title = panel_title(indicator);
    let units = match indicator.presentation.units.as_str() {
        "" => "short",
        units => units,
    };
    json!({
        "title": title,
        "collapse": false,
        "panels": [{
            "id": id,
            "title": title,
            "type": "graph",
            "description": indicator.documentation.get("description").cloned().unwrap_or_default(),
            "span": 12,
            "targets": [{
                "expr": indicator.promql,
                "refId": "A",
            }],
            "thresholds": panel_thresholds(indicator),
            "yaxes": [
                { "format": units, "show": true },
                { "format": "short", "show": false },
            ],
        }],
    })
}

/// Dashboard with one row per indicator, each row holding a single graph.
pub fn dashboard(document: &IndicatorDocument) -> Value {
    let layout = &document.spec.layout;
    let title = if layout.title.is_empty() {
        format!(
            "{} - {}",
            document.product_name(),
            document.spec.product.version
        )
    } else {
        layout.title.clone()
    };

    let rows: Vec<Value> = document
        .spec
        .indicators
        .iter()
        .enumerate()
        .map(|(index, indicator)| row(indicator, index + 1))
        .collect();

    let tags: Vec<String> = document
        .labels()
        .iter()
        .map(|(key, value)| format!("{}:{}", key, value))
        .collect();

    json!({
        "uid": document.registered_uid(),
        "title": title,
        "description": layout.description,
        "tags": tags,
        "editable": false,
        "schemaVersion": SCHEMA_VERSION,
        "time": { "from": "now-1h", "to": "now" },
        "rows": rows,
    })
}

#[derive(Debug, Default, Clone, Copy)]
pub struct GrafanaDashboardConverter;

impl DocumentConverter for GrafanaDashboardConverter {
    fn convert(&self, document: &IndicatorDocument) -> Result<Option<Artifact>> {
        if document.spec.indicators.is_empty() {
            return Ok(None);
        }
        let content = serde_json::to_vec_pretty(&dashboard(document))
            .context("Unable to serialise dashboard")?;
        Ok(Some(Artifact::new(
            artifact_file_name(document, "json"),
            content,
        )))
    }
}
