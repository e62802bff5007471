//! Scan endpoints. Creation starts the job server-side at `queued` or
//! `running`; pause/resume/cancel are side-channel commands the server may or
//! may not honor, reflected back through the next poll.

use super::{ApiClient, ApiError};
use crate::model::{CreateScanRequest, LogEntry, LogsResponse, Scan};

impl ApiClient {
    pub async fn create_scan(&self, request: &CreateScanRequest) -> Result<Scan, ApiError> {
        self.post("/scan", request).await
    }

    pub async fn list_scans(&self) -> Result<Vec<Scan>, ApiError> {
        self.get("/scans").await
    }

    pub async fn get_scan(&self, job_id: &str) -> Result<Scan, ApiError> {
        self.get(&format!("/scan/{}", job_id)).await
    }

    pub async fn scan_logs(&self, job_id: &str) -> Result<Vec<LogEntry>, ApiError> {
        let response: LogsResponse = self.get(&format!("/scan/{}/logs", job_id)).await?;
        Ok(response.logs)
    }

    pub async fn pause_scan(&self, job_id: &str) -> Result<Scan, ApiError> {
        self.post(&format!("/scan/{}/pause", job_id), &()).await
    }

    pub async fn resume_scan(&self, job_id: &str) -> Result<Scan, ApiError> {
        self.post(&format!("/scan/{}/resume", job_id), &()).await
    }

    pub async fn cancel_scan(&self, job_id: &str) -> Result<Scan, ApiError> {
        self.post(&format!("/scan/{}/cancel", job_id), &()).await
    }

    pub async fn delete_scan(&self, job_id: &str) -> Result<(), ApiError> {
        self.delete(&format!("/scan/{}", job_id)).await
    }
}
