use super::{ApiClient, ApiError};
use crate::model::DashboardStats;

impl ApiClient {
    pub async fn dashboard_stats(&self) -> Result<DashboardStats, ApiError> {
        self.get("/stats").await
    }
}
