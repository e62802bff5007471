use async_trait::async_trait;

use crate::api::{ApiClient, ApiError};
use crate::model::{FindingsPage, LogEntry, Scan};

/// Fetch seam between the watcher and the remote API.
///
/// The watcher only ever needs these three reads; putting them behind a trait
/// keeps the polling and cache semantics testable with scripted in-memory
/// sources instead of a live backend.
#[async_trait]
pub trait ScanSource: Send + Sync {
    async fn fetch_scan(&self, job_id: &str) -> Result<Scan, ApiError>;
    async fn fetch_findings(&self, job_id: &str) -> Result<FindingsPage, ApiError>;
    async fn fetch_logs(&self, job_id: &str) -> Result<Vec<LogEntry>, ApiError>;
}

#[async_trait]
impl ScanSource for ApiClient {
    async fn fetch_scan(&self, job_id: &str) -> Result<Scan, ApiError> {
        self.get_scan(job_id).await
    }

    async fn fetch_findings(&self, job_id: &str) -> Result<FindingsPage, ApiError> {
        self.scan_findings(job_id, None).await
    }

    async fn fetch_logs(&self, job_id: &str) -> Result<Vec<LogEntry>, ApiError> {
        self.scan_logs(job_id).await
    }
}
