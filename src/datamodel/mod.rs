pub mod defaults;
pub mod document;
pub mod reader;
pub mod status;
pub mod threshold;
pub mod uid;
pub mod validation;

pub use defaults::apply_defaults;
pub use document::{
    Alert, DocumentSpec, Indicator, IndicatorDocument, IndicatorStatus, IndicatorType, Labels,
    Layout, Metadata, Presentation, Product, Section,
};
pub use reader::{DocumentError, read_document_json, read_document_yaml};
pub use status::StatusUpdate;
pub use threshold::{Threshold, ThresholdOperator};
pub use validation::{ValidationError, validate};
