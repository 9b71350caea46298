//! Conditional patches applied to raw indicator documents.
//!
//! Patches are applied on the generic structure of a document, before it is
//! converted into the typed model, so that out of tree overrides can touch
//! any field. Application is best effort: a failing operation is logged and
//! skipped, the operations before and after it are kept.

pub mod error;
pub mod pointer;
pub mod source;

pub use error::PatchError;
pub use source::{DirectoryPatchSource, PatchSource, StaticPatchSource};

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use tracing::{debug, info};

/// One operation, with JSON Patch semantics.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "lowercase")]
pub enum Operation {
    Add { path: String, value: Value },
    Remove { path: String },
    Replace { path: String, value: Value },
    /// Evaluated and logged, but never stops the following operations.
    Test { path: String, value: Value },
    Move { from: String, path: String },
    Copy { from: String, path: String },
}

impl Operation {
    pub fn path(&self) -> &str {
        match self {
            Operation::Add { path, .. }
            | Operation::Remove { path }
            | Operation::Replace { path, .. }
            | Operation::Test { path, .. }
            | Operation::Move { path, .. }
            | Operation::Copy { path, .. } => path,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Operation::Add { .. } => "add",
            Operation::Remove { .. } => "remove",
            Operation::Replace { .. } => "replace",
            Operation::Test { .. } => "test",
            Operation::Move { .. } => "move",
            Operation::Copy { .. } => "copy",
        }
    }

    /// Applies the operation on a document value.
    pub fn apply(&self, document: &mut Value) -> Result<(), PatchError> {
        match self {
            Operation::Add { path, value } => {
                let tokens = pointer::parse_path(path)?;
                pointer::add(document, &tokens, path, value.clone())
            }
            Operation::Remove { path } => {
                let tokens = pointer::parse_path(path)?;
                pointer::remove(document, &tokens, path).map(|_| ())
            }
            Operation::Replace { path, value } => {
                let tokens = pointer::parse_path(path)?;
                pointer::replace(document, &tokens, path, value.clone())
            }
            Operation::Test { path, value } => {
                let tokens = pointer::parse_path(path)?;
                if pointer::get(document, &tokens, path)? == value {
                    Ok(())
                } else {
                    Err(PatchError::TestFailed(path.clone()))
                }
            }
            Operation::Move { from, path } => {
                let from_tokens = pointer::parse_path(from)?;
                let tokens = pointer::parse_path(path)?;
                // the document is only touched once both halves succeed
                let mut moved = document.clone();
                let value = pointer::remove(&mut moved, &from_tokens, from)?;
                pointer::add(&mut moved, &tokens, path, value)?;
                *document = moved;
                Ok(())
            }
            Operation::Copy { from, path } => {
                let from_tokens = pointer::parse_path(from)?;
                let tokens = pointer::parse_path(path)?;
                let value = pointer::get(document, &from_tokens, from)?.clone();
                pointer::add(document, &tokens, path, value)
            }
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProductMatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MetadataMatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub labels: Option<BTreeMap<String, String>>,
}

/// Predicate selecting the documents a patch applies to.
///
/// Each absent part matches anything. Present parts require exact equality;
/// labels must be equal as a whole map.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PatchMatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub product: Option<ProductMatch>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<MetadataMatch>,
}

fn string_at<'a>(document: &'a Value, path: &str) -> Option<&'a str> {
    document.pointer(path).and_then(Value::as_str)
}

fn labels_of(document: &Value) -> BTreeMap<String, String> {
    document
        .pointer("/metadata/labels")
        .and_then(Value::as_object)
        .map(|labels| {
            labels
                .iter()
                .map(|(key, value)| {
                    let value = match value {
                        Value::String(s) => s.clone(),
                        other => other.to_string(),
                    };
                    (key.clone(), value)
                })
                .collect()
        })
        .unwrap_or_default()
}

impl PatchMatch {
    pub fn matches(&self, document: &Value) -> bool {
        if let Some(product) = &self.product {
            if let Some(name) = &product.name {
                if string_at(document, "/spec/product/name") != Some(name.as_str()) {
                    return false;
                }
            }
            if let Some(version) = &product.version {
                if string_at(document, "/spec/product/version") != Some(version.as_str()) {
                    return false;
                }
            }
        }

        if let Some(labels) = self.metadata.as_ref().and_then(|m| m.labels.as_ref()) {
            if labels_of(document) != *labels {
                return false;
            }
        }

        true
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Patch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_version: Option<String>,
    #[serde(default, rename = "match", skip_serializing_if = "Option::is_none")]
    pub match_: Option<PatchMatch>,
    #[serde(default)]
    pub operations: Vec<Operation>,
    /// Where the patch was loaded from, for logs.
    #[serde(skip)]
    pub origin: String,
}

impl Patch {
    pub fn matches(&self, document: &Value) -> bool {
        self.match_
            .as_ref()
            .map(|m| m.matches(document))
            .unwrap_or(true)
    }

    /// Applies every operation in order and returns the number of
    /// operations that failed.
    pub fn apply(&self, document: &mut Value) -> usize {
        let mut failures = 0;
        for operation in &self.operations {
            if let Err(error) = operation.apply(document) {
                failures += 1;
                info!(
                    patch = %self.origin,
                    op = operation.name(),
                    path = operation.path(),
                    "Patch operation failed, continuing: {}",
                    error
                );
            }
        }
        failures
    }
}

/// Applies every matching patch to a generic document value.
pub fn apply_patches_to_value(patches: &[Patch], document: &mut Value) {
    for patch in patches {
        if patch.matches(document) {
            debug!(patch = %patch.origin, "Applying patch");
            patch.apply(document);
        }
    }
}

/// Applies every matching patch to raw document bytes (YAML or JSON) and
/// returns the patched document serialised as YAML.
pub fn apply_patches(patches: &[Patch], document_bytes: &[u8]) -> Result<Vec<u8>, PatchError> {
    let mut document: Value = serde_yaml::from_slice(document_bytes)
        .map_err(|e| PatchError::Parse(e.to_string()))?;

    apply_patches_to_value(patches, &mut document);

    serde_yaml::to_string(&document)
        .map(String::into_bytes)
        .map_err(|e| PatchError::Serialise(e.to_string()))
}
