pub mod api;
pub mod model;
pub mod session;
pub mod sync;

use serde::{Deserialize, Serialize};

pub use crate::api::{ApiClient, ApiError};
pub use crate::session::{Session, SessionState};
pub use crate::sync::{
    next_interval, NullSink, PollConfig, ResourceKind, ScanSource, ScanWatcher, SinkRef,
    SyncCache, WatchSink,
};

/// Client configuration shared by the CLI and library consumers.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ClientConfig {
    pub base_url: String,
    pub timeout_secs: u64,
    pub status_interval_ms: u64,
    pub findings_interval_ms: u64,
    pub logs_interval_ms: u64,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.fetchbot.dev".to_string(),
            timeout_secs: 15,
            status_interval_ms: 5_000,
            findings_interval_ms: 3_000,
            logs_interval_ms: 2_500,
        }
    }
}

impl ClientConfig {
    pub fn poll_config(&self) -> PollConfig {
        use std::time::Duration;
        PollConfig {
            status_interval: Duration::from_millis(self.status_interval_ms),
            findings_interval: Duration::from_millis(self.findings_interval_ms),
            logs_interval: Duration::from_millis(self.logs_interval_ms),
        }
    }
}
