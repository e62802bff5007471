//! Report endpoints. Generation is synchronous server-side; the response
//! points at the rendered document, which is fetched separately.

use serde::Serialize;

use super::{ApiClient, ApiError};
use crate::model::{GeneratedReport, ReportFormat};

#[derive(Serialize)]
struct GenerateReportRequest {
    format: ReportFormat,
}

impl ApiClient {
    pub async fn generate_report(
        &self,
        job_id: &str,
        format: ReportFormat,
    ) -> Result<GeneratedReport, ApiError> {
        self.post(
            &format!("/scan/{}/report", job_id),
            &GenerateReportRequest { format },
        )
        .await
    }

    /// Fetches the rendered document. `report_url` may be absolute or
    /// relative to the API base; the bearer token is attached either way.
    pub async fn download_report(&self, report_url: &str) -> Result<Vec<u8>, ApiError> {
        self.get_bytes(report_url).await
    }
}
