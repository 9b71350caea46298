pub mod promql;
pub mod registry_client;

pub use promql::{PromQLClient, PrometheusClient};
pub use registry_client::{DocumentGetter, DocumentRegistrar, RegistryClient, StatusUpdater};
