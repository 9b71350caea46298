use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

pub const STATUS_UNDEFINED: &str = "UNDEFINED";
pub const STATUS_UNKNOWN: &str = "UNKNOWN";
pub const STATUS_HEALTHY: &str = "HEALTHY";

pub const LEVEL_CRITICAL: &str = "critical";
pub const LEVEL_WARNING: &str = "warning";

/// One element of a bulk status update body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct StatusUpdate {
    #[schema(example = "latency")]
    pub name: String,
    #[schema(example = "critical")]
    pub status: String,
}

impl StatusUpdate {
    pub fn new(name: impl Into<String>, status: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            status: status.into(),
        }
    }
}
