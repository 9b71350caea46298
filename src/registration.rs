//! Periodic registration of indicator document files.
//!
//! Each cycle reads the document files, applies the patches, fills in the
//! defaults, validates, then registers every document. Registering again
//! before the registry time to live elapses keeps the documents alive.

use crate::client::DocumentRegistrar;
use crate::datamodel::{IndicatorDocument, apply_defaults, read_document_yaml, validate};
use crate::patch::{Patch, PatchSource, apply_patches};
use crate::scheduler::run_periodically;
use anyhow::{Context, Result, bail};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{Level, event};

/// Turns the raw bytes of a document file into a document ready to be
/// registered.
pub fn prepare_document(bytes: &[u8], patches: &[Patch]) -> Result<IndicatorDocument> {
    let patched = apply_patches(patches, bytes).context("Unable to patch document")?;
    let mut document = read_document_yaml(&patched)?;
    apply_defaults(&mut document);

    let errors = validate(&document);
    if !errors.is_empty() {
        let errors: Vec<String> = errors.iter().map(|e| e.to_string()).collect();
        bail!("Invalid document: {}", errors.join(", "));
    }
    Ok(document)
}

pub struct RegistrationAgent {
    registrar: Arc<dyn DocumentRegistrar>,
    patch_source: Arc<dyn PatchSource>,
    document_paths: Vec<PathBuf>,
    interval: Duration,
}

impl RegistrationAgent {
    pub fn new(
        registrar: Arc<dyn DocumentRegistrar>,
        patch_source: Arc<dyn PatchSource>,
        document_paths: Vec<PathBuf>,
        interval: Duration,
    ) -> Self {
        Self {
            registrar,
            patch_source,
            document_paths,
            interval,
        }
    }

    pub async fn start(&self, token: CancellationToken) {
        run_periodically("registration", self.interval, token, || {
            self.register_all()
        })
        .await
    }

    /// Registers every document file. A document that fails does not stop
    /// the others; the cycle reports how many failed.
    pub async fn register_all(&self) -> Result<()> {
        let patches = self.patch_source.load().unwrap_or_else(|error| {
            event!(Level::WARN, "Unable to load patches: {:#}", error);
            Vec::new()
        });

        let mut failures = 0;
        for path in &self.document_paths {
            if let Err(error) = self.register_file(path, &patches).await {
                failures += 1;
                event!(
                    Level::ERROR,
                    "Unable to register {}: {:#}",
                    path.display(),
                    error
                );
            }
        }

        if failures > 0 {
            bail!(
                "{} of {} documents failed to register",
                failures,
                self.document_paths.len()
            );
        }
        Ok(())
    }

    async fn register_file(&self, path: &Path, patches: &[Patch]) -> Result<()> {
        let bytes = tokio::fs::read(path)
            .await
            .with_context(|| format!("Unable to read {}", path.display()))?;
        let document = prepare_document(&bytes, patches)?;
        self.registrar.register(&document).await?;
        event!(
            Level::DEBUG,
            "Registered {} from {}",
            document.product_name(),
            path.display()
        );
        Ok(())
    }
}
