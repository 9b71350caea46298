//! Indicator documents shared by the tests.

use crate::datamodel::{
    Indicator, IndicatorDocument, Labels, Product, Threshold, ThresholdOperator,
};

/// A valid document in its JSON wire form.
pub fn document_json(product: &str, deployment: &str) -> String {
    format!(
        r#"{{
    "apiVersion": "indicatorprotocol.io/v1",
    "kind": "IndicatorDocument",
    "metadata": {{ "labels": {{ "deployment": "{deployment}" }} }},
    "spec": {{
        "product": {{ "name": "{product}", "version": "1.2.3" }},
        "indicators": [
            {{
                "name": "latency",
                "promql": "avg(latency_ms)",
                "thresholds": [
                    {{ "level": "warning", "operator": "gt", "value": 100 }},
                    {{ "level": "critical", "operator": "gt", "value": 500 }}
                ],
                "alert": {{ "for": "5m", "step": "10s" }},
                "presentation": {{ "chartType": "step", "frequency": 0, "units": "ms" }}
            }},
            {{
                "name": "errors",
                "promql": "sum(rate(errors_total[5m]))",
                "alert": {{ "for": "1m", "step": "1m" }},
                "presentation": {{ "chartType": "bar", "frequency": 0 }}
            }}
        ],
        "layout": {{ "title": "{product} - 1.2.3" }}
    }}
}}"#
    )
}

/// A valid document in its YAML file form, before defaults are applied.
pub fn document_yaml(product: &str, deployment: &str) -> String {
    format!(
        r#"apiVersion: indicatorprotocol.io/v1
kind: IndicatorDocument
metadata:
  labels:
    deployment: {deployment}
spec:
  product:
    name: {product}
    version: 1.2.3
  indicators:
  - name: latency
    promql: avg(latency_ms)
    thresholds:
    - level: warning
      operator: gt
      value: 100
    - level: critical
      operator: gt
      value: 500
"#
    )
}

/// The typed counterpart of [`document_json`].
pub fn document(product: &str, deployment: &str) -> IndicatorDocument {
    let mut labels = Labels::new();
    labels.insert("deployment".to_string(), deployment.to_string());

    IndicatorDocument::new(
        Product {
            name: product.to_string(),
            version: "1.2.3".to_string(),
        },
        labels,
        vec![
            Indicator::new("latency", "avg(latency_ms)").with_thresholds(vec![
                Threshold::new("warning", ThresholdOperator::GreaterThan, 100.0),
                Threshold::new("critical", ThresholdOperator::GreaterThan, 500.0),
            ]),
            Indicator::new("errors", "sum(rate(errors_total[5m]))"),
        ],
    )
}
