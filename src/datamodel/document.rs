use super::threshold::Threshold;
use super::uid::document_uid;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use utoipa::ToSchema;

pub const API_VERSION_V1: &str = "indicatorprotocol.io/v1";
pub const SUPPORTED_API_VERSIONS: &[&str] = &[API_VERSION_V1];
pub const DOCUMENT_KIND: &str = "IndicatorDocument";

pub type Labels = BTreeMap<String, String>;

pub fn is_supported_api_version(api_version: &str) -> bool {
    SUPPORTED_API_VERSIONS.contains(&api_version)
}

fn default_kind() -> String {
    DOCUMENT_KIND.to_string()
}

/// A product scoped bundle of indicators.
///
/// The wire format is shared by the registration body and the elements of
/// the listing response. `uid` is computed by the registry and ignored on
/// registration, as are the per indicator `status` fields.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct IndicatorDocument {
    #[serde(default)]
    pub api_version: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub uid: String,
    #[serde(default = "default_kind")]
    pub kind: String,
    #[serde(default)]
    pub metadata: Metadata,
    #[serde(default)]
    pub spec: DocumentSpec,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Metadata {
    #[serde(default)]
    pub labels: BTreeMap<String, String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct DocumentSpec {
    #[serde(default)]
    pub product: Product,
    #[serde(default)]
    pub indicators: Vec<Indicator>,
    #[serde(default)]
    pub layout: Layout,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct Product {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub version: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Indicator {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub promql: String,
    #[serde(default)]
    pub thresholds: Vec<Threshold>,
    #[serde(default)]
    pub alert: Alert,
    #[serde(default)]
    pub documentation: BTreeMap<String, String>,
    #[serde(default)]
    pub presentation: Presentation,
    #[serde(default, rename = "type")]
    #[schema(value_type = String, example = "serviceLevelIndicator")]
    pub indicator_type: IndicatorType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<IndicatorStatus>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct Alert {
    #[serde(default, rename = "for")]
    pub for_duration: String,
    #[serde(default)]
    pub step: String,
}

pub const CHART_TYPES: &[&str] = &["step", "bar", "status", "quota"];

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Presentation {
    /// Kept as a plain string so an unknown chart type is reported by
    /// validation instead of failing deserialization.
    #[serde(default)]
    pub chart_type: String,
    #[serde(default)]
    pub current_value: bool,
    #[serde(default)]
    pub frequency: i64,
    #[serde(default)]
    pub labels: Option<Vec<String>>,
    #[serde(default)]
    pub units: String,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum IndicatorType {
    ServiceLevelIndicator,
    KeyPerformanceIndicator,
    DefaultIndicator,
    #[default]
    Undefined,
}

impl IndicatorType {
    pub fn as_str(&self) -> &'static str {
        match self {
            IndicatorType::ServiceLevelIndicator => "serviceLevelIndicator",
            IndicatorType::KeyPerformanceIndicator => "keyPerformanceIndicator",
            IndicatorType::DefaultIndicator => "defaultIndicator",
            IndicatorType::Undefined => "undefined",
        }
    }
}

impl From<String> for IndicatorType {
    fn from(value: String) -> Self {
        match value.as_str() {
            "serviceLevelIndicator" | "sli" => IndicatorType::ServiceLevelIndicator,
            "keyPerformanceIndicator" | "kpi" => IndicatorType::KeyPerformanceIndicator,
            "defaultIndicator" | "other" => IndicatorType::DefaultIndicator,
            _ => IndicatorType::Undefined,
        }
    }
}

impl From<IndicatorType> for String {
    fn from(value: IndicatorType) -> Self {
        value.as_str().to_string()
    }
}

impl fmt::Display for IndicatorType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct Layout {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub owner: String,
    #[serde(default)]
    pub sections: Vec<Section>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct Section {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub indicators: Vec<String>,
}

/// Last known phase of an indicator, as written by the status controller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct IndicatorStatus {
    pub value: Option<String>,
    pub updated_at: DateTime<Utc>,
}

impl IndicatorDocument {
    pub fn new(product: Product, labels: Labels, indicators: Vec<Indicator>) -> Self {
        Self {
            api_version: API_VERSION_V1.to_string(),
            uid: String::new(),
            kind: default_kind(),
            metadata: Metadata { labels },
            spec: DocumentSpec {
                product,
                indicators,
                layout: Layout::default(),
            },
        }
    }

    pub fn product_name(&self) -> &str {
        &self.spec.product.name
    }

    pub fn labels(&self) -> &Labels {
        &self.metadata.labels
    }

    /// Deterministic identifier computed from the product name and labels.
    pub fn uid(&self) -> String {
        document_uid(&self.spec.product.name, &self.metadata.labels)
    }

    /// The uid the registry listed the document with, or the computed one
    /// when the document carries none.
    pub fn registered_uid(&self) -> String {
        if self.uid.is_empty() {
            self.uid()
        } else {
            self.uid.clone()
        }
    }

    /// Two documents share an identity when product name and labels are equal.
    pub fn same_identity(&self, other: &IndicatorDocument) -> bool {
        self.spec.product.name == other.spec.product.name
            && self.metadata.labels == other.metadata.labels
    }

    pub fn indicator(&self, name: &str) -> Option<&Indicator> {
        self.spec.indicators.iter().find(|i| i.name == name)
    }
}

impl Indicator {
    pub fn new(name: &str, promql: &str) -> Self {
        Self {
            name: name.to_string(),
            promql: promql.to_string(),
            ..Default::default()
        }
    }

    pub fn with_thresholds(mut self, thresholds: Vec<Threshold>) -> Self {
        self.thresholds = thresholds;
        self
    }
}
