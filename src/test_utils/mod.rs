use crate::config::{self, load_configuration_for_tests};
use crate::http::state::HttpServerState;
use crate::storage::{Clock, DocumentStore, ManualClock, StatusStore};
use anyhow::Result;
use chrono::{DateTime, Duration, Utc};
use std::sync::Arc;

pub mod fixtures;
pub mod http;

/// Start of the manual clock used by [`TestRegistry`].
pub fn test_epoch() -> DateTime<Utc> {
    DateTime::from_timestamp(1_700_000_000, 0).unwrap_or_default()
}

/// Registry state backed by a manual clock, so tests control expiry.
pub struct TestRegistry {
    pub state: HttpServerState,
    pub clock: Arc<ManualClock>,
}

impl TestRegistry {
    /// Loads the test configuration and builds the stores with the
    /// configured document time to live.
    pub fn new() -> Result<Self> {
        load_configuration_for_tests()?;
        let ttl = config::get()?.document_ttl()?;
        Self::with_ttl(ttl)
    }

    pub fn with_ttl(ttl: Duration) -> Result<Self> {
        let clock = Arc::new(ManualClock::new(test_epoch()));
        let shared: Arc<dyn Clock> = clock.clone();
        let state = HttpServerState::new(
            Arc::new(DocumentStore::new(ttl, shared.clone())),
            Arc::new(StatusStore::new(shared)),
        )?;
        Ok(Self { state, clock })
    }
}
