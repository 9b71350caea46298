use super::matcher::match_thresholds;
use crate::client::{DocumentGetter, PromQLClient, StatusUpdater};
use crate::datamodel::StatusUpdate;
use crate::scheduler::run_periodically;
use anyhow::{Context, Result};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{Level, event};

/// Periodically evaluates the thresholds of every registered indicator and
/// writes the resulting statuses back to the registry.
pub struct StatusController {
    document_getter: Arc<dyn DocumentGetter>,
    status_updater: Arc<dyn StatusUpdater>,
    promql_client: Arc<dyn PromQLClient>,
    interval: Duration,
}

impl StatusController {
    pub fn new(
        document_getter: Arc<dyn DocumentGetter>,
        status_updater: Arc<dyn StatusUpdater>,
        promql_client: Arc<dyn PromQLClient>,
        interval: Duration,
    ) -> Self {
        Self {
            document_getter,
            status_updater,
            promql_client,
            interval,
        }
    }

    pub async fn start(&self, token: CancellationToken) {
        run_periodically("status controller", self.interval, token, || {
            self.update_statuses()
        })
        .await
    }

    /// One evaluation cycle. Only a failure to fetch the documents is
    /// returned, other failures are logged and skipped.
    pub async fn update_statuses(&self) -> Result<()> {
        let documents = self
            .document_getter
            .indicator_documents()
            .await
            .context("failed to fetch indicator documents")?;

        for document in documents {
            let uid = document.registered_uid();
            let mut updates = Vec::new();

            for indicator in &document.spec.indicators {
                if indicator.thresholds.is_empty() {
                    continue;
                }

                let values = match self.promql_client.query(&indicator.promql).await {
                    Ok(values) => values,
                    Err(error) => {
                        event!(
                            Level::WARN,
                            "Query of indicator {} of document {} failed: {:#}",
                            indicator.name,
                            uid,
                            error
                        );
                        continue;
                    }
                };

                updates.push(StatusUpdate::new(
                    indicator.name.clone(),
                    match_thresholds(&indicator.thresholds, &values),
                ));
            }

            if let Err(error) = self
                .status_updater
                .bulk_status_update(&updates, &uid)
                .await
            {
                event!(
                    Level::ERROR,
                    "Unable to update the statuses of document {}: {:#}",
                    uid,
                    error
                );
            }
        }

        Ok(())
    }
}
