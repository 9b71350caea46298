use super::clock::Clock;
use crate::datamodel::IndicatorDocument;
use chrono::{DateTime, Duration, Utc};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

#[derive(Debug, Clone)]
struct StoredDocument {
    document: IndicatorDocument,
    last_seen_at: DateTime<Utc>,
}

/// In-memory collection of registered documents.
///
/// Documents are keyed by product name and labels. They expire once they
/// have not been registered again for the configured time to live. Expiry
/// happens lazily, when the store is read.
#[derive(Debug)]
pub struct DocumentStore {
    documents: Mutex<Vec<StoredDocument>>,
    ttl: Duration,
    clock: Arc<dyn Clock>,
}

impl DocumentStore {
    pub fn new(ttl: Duration, clock: Arc<dyn Clock>) -> Self {
        Self {
            documents: Mutex::new(Vec::new()),
            ttl,
            clock,
        }
    }

    fn lock(&self) -> MutexGuard<'_, Vec<StoredDocument>> {
        self.documents.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Inserts a document, or replaces the document with the same identity
    /// in place and refreshes its expiry.
    pub fn upsert(&self, document: IndicatorDocument) {
        let now = self.clock.now();
        let mut documents = self.lock();

        match documents
            .iter_mut()
            .find(|stored| stored.document.same_identity(&document))
        {
            Some(stored) => {
                stored.document = document;
                stored.last_seen_at = now;
            }
            None => documents.push(StoredDocument {
                document,
                last_seen_at: now,
            }),
        }
    }

    /// Evicts expired documents and returns a copy of the others, in
    /// insertion order.
    pub fn all(&self) -> Vec<IndicatorDocument> {
        let now = self.clock.now();
        let mut documents = self.lock();

        // a document whose ttl is exactly elapsed is expired
        documents.retain(|stored| stored.last_seen_at + self.ttl > now);

        documents
            .iter()
            .map(|stored| stored.document.clone())
            .collect()
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }
}
