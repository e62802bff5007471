use serde::Serialize;

use super::{ApiClient, ApiError};
use crate::model::{Finding, FindingDetail, FindingFilters, FindingStatus, FindingsPage};

#[derive(Serialize)]
struct UpdateStatusRequest {
    status: FindingStatus,
}

impl ApiClient {
    /// Full findings snapshot for one scan. The server returns the complete
    /// current set each time, not a delta.
    pub async fn scan_findings(
        &self,
        job_id: &str,
        filters: Option<&FindingFilters>,
    ) -> Result<FindingsPage, ApiError> {
        let path = format!("/scan/{}/findings", job_id);
        match filters {
            Some(filters) if !filters.is_empty() => {
                self.get_with_query(&path, &filters.to_query_pairs()).await
            }
            _ => self.get(&path).await,
        }
    }

    /// Cross-scan findings listing. The endpoint does not exist on older
    /// backends; callers should treat `NotFound` as "not available", not as
    /// an error.
    pub async fn list_findings(
        &self,
        filters: Option<&FindingFilters>,
    ) -> Result<Vec<Finding>, ApiError> {
        match filters {
            Some(filters) if !filters.is_empty() => {
                self.get_with_query("/findings", &filters.to_query_pairs())
                    .await
            }
            _ => self.get("/findings").await,
        }
    }

    pub async fn get_finding(&self, id: u64) -> Result<FindingDetail, ApiError> {
        self.get(&format!("/findings/{}", id)).await
    }

    /// Updates a finding's lifecycle status. The covering findings cache
    /// entries must be marked stale afterwards so the next refresh reflects
    /// the server's view.
    pub async fn update_finding_status(
        &self,
        id: u64,
        status: FindingStatus,
    ) -> Result<Finding, ApiError> {
        self.patch(&format!("/findings/{}", id), &UpdateStatusRequest { status })
            .await
    }
}
