use super::clock::Clock;
use super::error::StoreError;
use crate::datamodel::IndicatorStatus;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

type StatusKey = (String, String);

/// Last known status per document uid and indicator name.
///
/// Entries live independently from the documents they refer to.
#[derive(Debug)]
pub struct StatusStore {
    statuses: Mutex<HashMap<StatusKey, IndicatorStatus>>,
    clock: Arc<dyn Clock>,
}

impl StatusStore {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            statuses: Mutex::new(HashMap::new()),
            clock,
        }
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<StatusKey, IndicatorStatus>> {
        self.statuses.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn update_status(&self, uid: &str, indicator: &str, value: Option<String>) {
        let status = IndicatorStatus {
            value,
            updated_at: self.clock.now(),
        };
        self.lock()
            .insert((uid.to_string(), indicator.to_string()), status);
    }

    pub fn status_for(&self, uid: &str, indicator: &str) -> Result<IndicatorStatus, StoreError> {
        self.lock()
            .get(&(uid.to_string(), indicator.to_string()))
            .cloned()
            .ok_or_else(|| StoreError::status_not_found(uid, indicator))
    }
}
