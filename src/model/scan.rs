use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::SeverityCounts;

/// Scan lifecycle as observed by the client.
///
/// The client never drives transitions; pause/resume/cancel are side-channel
/// commands the server may or may not honor, reflected back through the next
/// poll. Any status string outside the known set deserializes to `Unknown`:
/// the client stops assuming progress instead of erroring.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ScanStatus {
    Queued,
    Running,
    Completed,
    Failed,
    #[default]
    #[serde(other)]
    Unknown,
}

impl ScanStatus {
    /// True while the server may still produce new findings or logs.
    pub fn is_active(&self) -> bool {
        matches!(self, ScanStatus::Queued | ScanStatus::Running)
    }

    /// True once the scan can no longer change on the server.
    pub fn is_terminal(&self) -> bool {
        matches!(self, ScanStatus::Completed | ScanStatus::Failed)
    }

    /// Monotonic position in the lifecycle, used for out-of-order detection.
    /// A response carrying a lower rank than the cached one is older.
    pub fn rank(&self) -> u64 {
        match self {
            ScanStatus::Unknown => 0,
            ScanStatus::Queued => 1,
            ScanStatus::Running => 2,
            ScanStatus::Completed | ScanStatus::Failed => 3,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ScanStatus::Queued => "queued",
            ScanStatus::Running => "running",
            ScanStatus::Completed => "completed",
            ScanStatus::Failed => "failed",
            ScanStatus::Unknown => "unknown",
        }
    }
}

impl std::fmt::Display for ScanStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One security-assessment run against a target, identified by `job_id`.
/// Mutable only by the server; the client holds a read-only projection that
/// goes stale between polls.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Scan {
    pub job_id: String,
    pub target: String,
    #[serde(default)]
    pub scan_type: Option<String>,
    #[serde(default)]
    pub status: ScanStatus,
    #[serde(default)]
    pub progress: u8,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub completed_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub duration_secs: Option<u64>,
    #[serde(default)]
    pub total_findings: Option<u64>,
    #[serde(default)]
    pub by_severity: Option<SeverityCounts>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateScanRequest {
    pub target: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scan_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub config: Option<serde_json::Value>,
}

impl CreateScanRequest {
    pub fn new(target: impl Into<String>) -> Self {
        Self {
            target: target.into(),
            scan_type: None,
            config: None,
        }
    }

    pub fn with_scan_type(mut self, scan_type: impl Into<String>) -> Self {
        self.scan_type = Some(scan_type.into());
        self
    }
}

/// One append-only execution-log line scoped to a scan. Immutable once
/// emitted; entries accumulate in timestamp order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogEntry {
    pub timestamp: DateTime<Utc>,
    pub agent: String,
    pub action: String,
    #[serde(default)]
    pub details: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogsResponse {
    #[serde(default)]
    pub logs: Vec<LogEntry>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_roundtrip() {
        let s: ScanStatus = serde_json::from_str("\"running\"").unwrap();
        assert_eq!(s, ScanStatus::Running);
        assert_eq!(serde_json::to_string(&s).unwrap(), "\"running\"");
    }

    #[test]
    fn test_unrecognized_status_maps_to_unknown() {
        for raw in ["\"paused\"", "\"cancelled\"", "\"pending\"", "\"whatever\""] {
            let s: ScanStatus = serde_json::from_str(raw).unwrap();
            assert_eq!(s, ScanStatus::Unknown);
            assert!(!s.is_active());
            assert!(!s.is_terminal());
        }
    }

    #[test]
    fn test_rank_is_monotone_over_lifecycle() {
        assert!(ScanStatus::Unknown.rank() < ScanStatus::Queued.rank());
        assert!(ScanStatus::Queued.rank() < ScanStatus::Running.rank());
        assert!(ScanStatus::Running.rank() < ScanStatus::Completed.rank());
        assert_eq!(ScanStatus::Completed.rank(), ScanStatus::Failed.rank());
    }

    #[test]
    fn test_scan_tolerates_sparse_payload() {
        let scan: Scan =
            serde_json::from_str(r#"{"job_id":"abc","target":"https://example.com"}"#).unwrap();
        assert_eq!(scan.status, ScanStatus::Unknown);
        assert_eq!(scan.progress, 0);
        assert!(scan.created_at.is_none());
        assert!(scan.total_findings.is_none());
    }
}
