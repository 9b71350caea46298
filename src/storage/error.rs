use thiserror::Error;

/// Errors returned by the in-memory stores.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// No status recorded for this document and indicator
    #[error("Status not found: document {uid}, indicator {indicator}")]
    StatusNotFound { uid: String, indicator: String },
}

impl StoreError {
    pub fn status_not_found(uid: &str, indicator: &str) -> Self {
        StoreError::StatusNotFound {
            uid: uid.to_string(),
            indicator: indicator.to_string(),
        }
    }
}
