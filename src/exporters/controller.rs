use super::filesystem::Filesystem;
use super::reloader::Reloader;
use super::{Artifact, DocumentConverter};
use crate::client::DocumentGetter;
use crate::scheduler::run_periodically;
use anyhow::{Context, Result, anyhow};
use std::path::{Component, Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{Level, event};

pub struct ExporterControllerConfig {
    pub document_getter: Arc<dyn DocumentGetter>,
    pub converter: Arc<dyn DocumentConverter>,
    pub output_directory: PathBuf,
    pub filesystem: Arc<dyn Filesystem>,
    pub update_frequency: Duration,
    /// Kind of artifact, for logs.
    pub doc_type: String,
    pub reloader: Option<Arc<dyn Reloader>>,
}

/// Keeps a directory in sync with the documents of the registry.
///
/// Each update replaces the whole content of the output directory with the
/// artifacts of the current documents, then triggers the reloader.
pub struct ExporterController {
    config: ExporterControllerConfig,
}

impl ExporterController {
    pub fn new(config: ExporterControllerConfig) -> Self {
        Self { config }
    }

    pub async fn start(&self, token: CancellationToken) {
        event!(
            Level::INFO,
            "Exporting {} to {}",
            self.config.doc_type,
            self.config.output_directory.display()
        );
        run_periodically(
            &self.config.doc_type,
            self.config.update_frequency,
            token,
            || self.update(),
        )
        .await
    }

    pub async fn update(&self) -> Result<()> {
        let documents = match self.config.document_getter.indicator_documents().await {
            Ok(documents) => documents,
            Err(error) => {
                event!(Level::ERROR, "Unable to fetch indicator documents: {:#}", error);
                return Err(anyhow!("failed to fetch indicator documents"));
            }
        };

        // convert everything before touching the directory
        let mut artifacts: Vec<Artifact> = Vec::with_capacity(documents.len());
        for document in &documents {
            match self.config.converter.convert(document) {
                Ok(Some(artifact)) if is_plain_file_name(&artifact.filename) => {
                    artifacts.push(artifact)
                }
                Ok(Some(artifact)) => event!(
                    Level::ERROR,
                    "Refusing to write {} for document {}: not a plain file name",
                    artifact.filename,
                    document.uid
                ),
                Ok(None) => {}
                Err(error) => event!(
                    Level::ERROR,
                    "Unable to convert document {} to {}: {:#}",
                    document.uid,
                    self.config.doc_type,
                    error
                ),
            }
        }

        self.clear_directory();

        for artifact in &artifacts {
            let path = self.config.output_directory.join(&artifact.filename);
            if let Err(error) = self.config.filesystem.write(&path, &artifact.content) {
                event!(
                    Level::ERROR,
                    "Unable to write {}: {}",
                    path.display(),
                    error
                );
            }
        }
        event!(
            Level::DEBUG,
            "Wrote {} {} files",
            artifacts.len(),
            self.config.doc_type
        );

        if let Some(reloader) = &self.config.reloader {
            reloader
                .reload()
                .await
                .with_context(|| format!("Unable to reload after exporting {}", self.config.doc_type))?;
        }

        Ok(())
    }

    fn clear_directory(&self) {
        let directory = &self.config.output_directory;
        if let Err(error) = self.config.filesystem.create_dir_all(directory) {
            event!(
                Level::ERROR,
                "Unable to create {}: {}",
                directory.display(),
                error
            );
        }

        let files = match self.config.filesystem.read_dir(directory) {
            Ok(files) => files,
            Err(error) => {
                event!(
                    Level::ERROR,
                    "Unable to list {}: {}",
                    directory.display(),
                    error
                );
                return;
            }
        };

        for file in files {
            if let Err(error) = self.config.filesystem.remove(&file) {
                event!(
                    Level::ERROR,
                    "Unable to remove {}: {}",
                    file.display(),
                    error
                );
            }
        }
    }
}

/// True when the name designates a file directly inside a directory.
fn is_plain_file_name(filename: &str) -> bool {
    let mut components = Path::new(filename).components();
    matches!(
        (components.next(), components.next()),
        (Some(Component::Normal(_)), None)
    ) && !filename.contains(['/', '\\'])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::datamodel::{IndicatorDocument, Labels, Product};
    use crate::exporters::filesystem::InMemoryFilesystem;
    use async_trait::async_trait;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Default)]
    struct FakeRegistry {
        documents: Mutex<Option<Vec<IndicatorDocument>>>,
    }

    impl FakeRegistry {
        fn set(&self, documents: Option<Vec<IndicatorDocument>>) {
            *self.documents.lock().unwrap() = documents;
        }
    }

    #[async_trait]
    impl DocumentGetter for FakeRegistry {
        async fn indicator_documents(&self) -> Result<Vec<IndicatorDocument>> {
            self.documents
                .lock()
                .unwrap()
                .clone()
                .ok_or_else(|| anyhow!("connection refused"))
        }
    }

    #[derive(Default)]
    struct CountingReloader {
        calls: AtomicUsize,
        fail: bool,
    }

    #[async_trait]
    impl Reloader for CountingReloader {
        async fn reload(&self) -> Result<()> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                anyhow::bail!("reload refused");
            }
            Ok(())
        }
    }

    fn document(product: &str) -> IndicatorDocument {
        IndicatorDocument::new(
            Product {
                name: product.to_string(),
                version: "1".to_string(),
            },
            Labels::new(),
            vec![],
        )
    }

    /// `{product}.yml`, nothing for products starting with "skip", an error
    /// for products starting with "fail".
    fn product_converter(document: &IndicatorDocument) -> Result<Option<Artifact>> {
        let name = document.product_name();
        if name.starts_with("skip") {
            return Ok(None);
        }
        if name.starts_with("fail") {
            anyhow::bail!("conversion failed");
        }
        Ok(Some(Artifact::new(
            format!("{}.yml", name),
            name.as_bytes().to_vec(),
        )))
    }

    struct Fixture {
        registry: Arc<FakeRegistry>,
        filesystem: Arc<InMemoryFilesystem>,
        reloader: Arc<CountingReloader>,
        controller: ExporterController,
    }

    fn fixture(reloader: CountingReloader) -> Fixture {
        let registry = Arc::new(FakeRegistry::default());
        let filesystem = Arc::new(InMemoryFilesystem::new());
        let reloader = Arc::new(reloader);
        let controller = ExporterController::new(ExporterControllerConfig {
            document_getter: registry.clone(),
            converter: Arc::new(product_converter),
            output_directory: PathBuf::from("/output"),
            filesystem: filesystem.clone(),
            update_frequency: Duration::from_millis(10),
            doc_type: "test artifacts".to_string(),
            reloader: Some(reloader.clone()),
        });
        Fixture {
            registry,
            filesystem,
            reloader,
            controller,
        }
    }

    #[tokio::test]
    async fn test_full_replace() {
        let f = fixture(CountingReloader::default());

        f.registry.set(Some(vec![document("A")]));
        f.controller.update().await.unwrap();
        assert_eq!(f.filesystem.file_names(Path::new("/output")), vec!["A.yml"]);

        f.registry.set(Some(vec![document("B")]));
        f.controller.update().await.unwrap();
        assert_eq!(f.filesystem.file_names(Path::new("/output")), vec!["B.yml"]);
        assert_eq!(f.reloader.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_directory_matches_converted_documents() {
        let f = fixture(CountingReloader::default());
        f.filesystem
            .write(Path::new("/output/stale.yml"), b"stale")
            .unwrap();
        f.filesystem
            .write(Path::new("/elsewhere/kept.yml"), b"kept")
            .unwrap();

        f.registry.set(Some(vec![
            document("A"),
            document("skip-me"),
            document("fail-me"),
            document("C"),
        ]));
        f.controller.update().await.unwrap();

        assert_eq!(
            f.filesystem.file_names(Path::new("/output")),
            vec!["A.yml", "C.yml"]
        );
        assert_eq!(
            f.filesystem.read(Path::new("/output/C.yml")),
            Some(b"C".to_vec())
        );
        assert_eq!(
            f.filesystem.file_names(Path::new("/elsewhere")),
            vec!["kept.yml"]
        );
    }

    #[tokio::test]
    async fn test_artifacts_outside_the_directory_are_refused() {
        let f = fixture(CountingReloader::default());
        f.registry.set(Some(vec![
            document("/elsewhere/absolute"),
            document("../escaped"),
            document("nested/file"),
            document("A"),
        ]));
        f.controller.update().await.unwrap();

        assert_eq!(f.filesystem.file_names(Path::new("/output")), vec!["A.yml"]);
        assert!(f.filesystem.file_names(Path::new("/elsewhere")).is_empty());
        assert!(f.filesystem.file_names(Path::new("/")).is_empty());
        assert_eq!(f.filesystem.read(Path::new("/output/../escaped.yml")), None);
        assert_eq!(f.filesystem.read(Path::new("/output/nested/file.yml")), None);
    }

    #[test]
    fn test_plain_file_names() {
        assert!(is_plain_file_name("product-0123.yml"));
        assert!(is_plain_file_name("..product.yml"));
        assert!(!is_plain_file_name("/etc/passwd"));
        assert!(!is_plain_file_name("../up.yml"));
        assert!(!is_plain_file_name("nested/file.yml"));
        assert!(!is_plain_file_name("nested\\file.yml"));
        assert!(!is_plain_file_name(".."));
        assert!(!is_plain_file_name(""));
    }

    #[tokio::test]
    async fn test_fetch_failure_keeps_directory() {
        let f = fixture(CountingReloader::default());
        f.registry.set(Some(vec![document("A")]));
        f.controller.update().await.unwrap();

        f.registry.set(None);
        let error = f.controller.update().await.unwrap_err();
        assert_eq!(error.to_string(), "failed to fetch indicator documents");
        assert_eq!(f.filesystem.file_names(Path::new("/output")), vec!["A.yml"]);
        assert_eq!(f.reloader.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_reload_error_is_returned() {
        let f = fixture(CountingReloader {
            fail: true,
            ..Default::default()
        });
        f.registry.set(Some(vec![document("A")]));

        let error = f.controller.update().await.unwrap_err();
        assert!(format!("{:#}", error).contains("reload refused"));
        // files are written before the reload
        assert_eq!(f.filesystem.file_names(Path::new("/output")), vec!["A.yml"]);
    }

    #[tokio::test]
    async fn test_start_updates_until_cancelled() {
        let f = fixture(CountingReloader::default());
        f.registry.set(Some(vec![document("A")]));
        let token = CancellationToken::new();

        let Fixture {
            controller,
            reloader,
            filesystem,
            ..
        } = f;
        let task = {
            let token = token.clone();
            tokio::spawn(async move { controller.start(token).await })
        };

        tokio::time::sleep(Duration::from_millis(100)).await;
        token.cancel();
        tokio::time::timeout(Duration::from_secs(5), task)
            .await
            .unwrap()
            .unwrap();

        assert!(reloader.calls.load(Ordering::SeqCst) >= 2);
        assert_eq!(filesystem.file_names(Path::new("/output")), vec!["A.yml"]);
    }
}
