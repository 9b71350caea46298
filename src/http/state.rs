use super::metrics::HttpMetrics;
use crate::storage::{DocumentStore, StatusStore};
use std::sync::Arc;

#[derive(Clone, Debug)]
pub struct HttpServerState {
    pub document_store: Arc<DocumentStore>,
    pub status_store: Arc<StatusStore>,
    pub metrics: Arc<HttpMetrics>,
}

impl HttpServerState {
    pub fn new(
        document_store: Arc<DocumentStore>,
        status_store: Arc<StatusStore>,
    ) -> prometheus::Result<Self> {
        Ok(Self {
            document_store,
            status_store,
            metrics: Arc::new(HttpMetrics::new()?),
        })
    }
}
