use super::Patch;
use anyhow::{Context, Result};
use std::fmt::Debug;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Provides the patches to apply on documents before registration.
///
/// Loaders are synchronous: they run on the task that registers documents.
pub trait PatchSource: Send + Sync + Debug {
    fn load(&self) -> Result<Vec<Patch>>;
}

/// Fixed list of patches, mostly useful in tests and embeddings.
#[derive(Debug, Default, Clone)]
pub struct StaticPatchSource {
    patches: Vec<Patch>,
}

impl StaticPatchSource {
    pub fn new(patches: Vec<Patch>) -> Self {
        Self { patches }
    }
}

impl PatchSource for StaticPatchSource {
    fn load(&self) -> Result<Vec<Patch>> {
        Ok(self.patches.clone())
    }
}

/// Reads every `*.yml` and `*.yaml` file of a directory as a patch.
///
/// Files are read in name order. A file that cannot be parsed is logged and
/// skipped so that one broken patch does not block the others.
#[derive(Debug, Clone)]
pub struct DirectoryPatchSource {
    directory: PathBuf,
}

impl DirectoryPatchSource {
    pub fn new(directory: impl Into<PathBuf>) -> Self {
        Self {
            directory: directory.into(),
        }
    }
}

fn is_yaml(path: &Path) -> bool {
    matches!(
        path.extension().and_then(|e| e.to_str()),
        Some("yml") | Some("yaml")
    )
}

impl PatchSource for DirectoryPatchSource {
    fn load(&self) -> Result<Vec<Patch>> {
        let entries = std::fs::read_dir(&self.directory).with_context(|| {
            format!(
                "Failed to read patch directory: {}",
                self.directory.display()
            )
        })?;

        let mut paths: Vec<PathBuf> = entries
            .filter_map(|entry| entry.ok())
            .map(|entry| entry.path())
            .filter(|path| path.is_file() && is_yaml(path))
            .collect();
        paths.sort();

        let mut patches = Vec::with_capacity(paths.len());
        for path in paths {
            let content = match std::fs::read(&path) {
                Ok(content) => content,
                Err(error) => {
                    warn!("Failed to read patch file {}: {}", path.display(), error);
                    continue;
                }
            };
            match serde_yaml::from_slice::<Patch>(&content) {
                Ok(mut patch) => {
                    patch.origin = path.display().to_string();
                    debug!("Loaded patch {}", patch.origin);
                    patches.push(patch);
                }
                Err(error) => {
                    warn!("Failed to parse patch file {}: {}", path.display(), error);
                }
            }
        }

        Ok(patches)
    }
}
