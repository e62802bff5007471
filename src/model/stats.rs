use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{ScanStatus, Severity, SeverityCounts};

/// Aggregate dashboard statistics, refreshed on a slow cadence (the numbers
/// change far less often than an in-flight scan's findings).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DashboardStats {
    #[serde(default)]
    pub total_scans: u64,
    #[serde(default)]
    pub running_scans: u64,
    #[serde(default)]
    pub completed_scans: u64,
    #[serde(default)]
    pub failed_scans: u64,
    #[serde(default)]
    pub total_findings: u64,
    #[serde(default)]
    pub by_severity: SeverityCounts,
    #[serde(default)]
    pub recent_scans: Vec<RecentScan>,
    #[serde(default)]
    pub recent_findings: Vec<RecentFinding>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecentScan {
    pub job_id: String,
    pub target: String,
    #[serde(default)]
    pub status: ScanStatus,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecentFinding {
    pub id: u64,
    pub title: String,
    pub severity: Severity,
    #[serde(default)]
    pub discovered_at: Option<DateTime<Utc>>,
}
