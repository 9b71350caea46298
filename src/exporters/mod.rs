use crate::datamodel::IndicatorDocument;
use anyhow::Result;

pub mod controller;
pub mod filesystem;
pub mod grafana;
pub mod prometheus_rules;
pub mod reloader;

pub use controller::{ExporterController, ExporterControllerConfig};
pub use filesystem::{Filesystem, InMemoryFilesystem, OsFilesystem};
pub use grafana::GrafanaDashboardConverter;
pub use prometheus_rules::PrometheusRulesConverter;
pub use reloader::{PrometheusReloader, Reloader};

/// A file produced from one document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Artifact {
    pub filename: String,
    pub content: Vec<u8>,
}

impl Artifact {
    pub fn new(filename: impl Into<String>, content: Vec<u8>) -> Self {
        Self {
            filename: filename.into(),
            content,
        }
    }
}

/// Turns a document into an artifact. `Ok(None)` means the document has
/// nothing to export.
pub trait DocumentConverter: Send + Sync {
    fn convert(&self, document: &IndicatorDocument) -> Result<Option<Artifact>>;
}

impl<F> DocumentConverter for F
where
    F: Fn(&IndicatorDocument) -> Result<Option<Artifact>> + Send + Sync,
{
    fn convert(&self, document: &IndicatorDocument) -> Result<Option<Artifact>> {
        self(document)
    }
}

/// File name of the artifact of a document. Path separators in the uid are
/// replaced so the file always lands directly in the output directory.
pub(crate) fn artifact_file_name(document: &IndicatorDocument, extension: &str) -> String {
    let uid: String = document
        .registered_uid()
        .chars()
        .map(|c| if matches!(c, '/' | '\\') { '_' } else { c })
        .collect();
    format!("{}.{}", uid, extension)
}
