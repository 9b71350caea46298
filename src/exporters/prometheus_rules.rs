//! Prometheus alerting rules, one rule file per document.
//!
//! ```yaml
//! groups:
//! - name: my-product
//!   rules:
//!   - alert: latency
//!     expr: histogram_quantile(0.9, rate(latency_bucket[5m])) > 100
//!     for: 1m
//!     labels: { product: my-product, version: 1.2.3, level: critical }
//!     annotations: { title: Latency }
//! ```

use super::{Artifact, DocumentConverter, artifact_file_name};
use crate::datamodel::IndicatorDocument;
use anyhow::{Context, Result};
use serde::Serialize;
use std::collections::BTreeMap;
use tracing::{Level, event};

#[derive(Debug, Serialize, PartialEq)]
pub struct RuleFile {
    pub groups: Vec<RuleGroup>,
}

#[derive(Debug, Serialize, PartialEq)]
pub struct RuleGroup {
    pub name: String,
    pub rules: Vec<AlertRule>,
}

#[derive(Debug, Serialize, PartialEq)]
pub struct AlertRule {
    pub alert: String,
    pub expr: String,
    #[serde(rename = "for", skip_serializing_if = "String::is_empty")]
    pub for_duration: String,
    pub labels: BTreeMap<String, String>,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub annotations: BTreeMap<String, String>,
}

/// Group name: the product, prefixed by the `namespace` label when present.
pub fn group_name(document: &IndicatorDocument) -> String {
    match document.labels().get("namespace") {
        Some(namespace) if !namespace.is_empty() => {
            format!("{}/{}", namespace, document.product_name())
        }
        _ => document.product_name().to_string(),
    }
}

pub fn rule_file(document: &IndicatorDocument) -> RuleFile {
    let mut rules = Vec::new();

    for indicator in &document.spec.indicators {
        for threshold in &indicator.thresholds {
            let Some(symbol) = threshold.operator.symbol() else {
                event!(
                    Level::WARN,
                    "Skipping threshold {} of indicator {}: undefined operator",
                    threshold.level,
                    indicator.name
                );
                continue;
            };

            let mut labels = document.labels().clone();
            labels.insert("product".to_string(), document.product_name().to_string());
            labels.insert(
                "version".to_string(),
                document.spec.product.version.clone(),
            );
            labels.insert("level".to_string(), threshold.level.clone());

            rules.push(AlertRule {
                alert: indicator.name.clone(),
                expr: format!("{} {} {}", indicator.promql.trim(), symbol, threshold.value),
                for_duration: indicator.alert.for_duration.clone(),
                labels,
                annotations: indicator.documentation.clone(),
            });
        }
    }

    RuleFile {
        groups: vec![RuleGroup {
            name: group_name(document),
            rules,
        }],
    }
}

#[derive(Debug, Default, Clone, Copy)]
pub struct PrometheusRulesConverter;

impl DocumentConverter for PrometheusRulesConverter {
    /// Documents without any usable threshold produce no file.
    fn convert(&self, document: &IndicatorDocument) -> Result<Option<Artifact>> {
        let file = rule_file(document);
        if file.groups.iter().all(|group| group.rules.is_empty()) {
            return Ok(None);
        }
        let content = serde_yaml::to_string(&file).context("Unable to serialise alert rules")?;
        Ok(Some(Artifact::new(
            artifact_file_name(document, "yml"),
            content.into_bytes(),
        )))
    }
}
