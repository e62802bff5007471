use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Finding severity. Canonical wire representation is lowercase; the
/// upper-case spellings some endpoints emit are accepted on input only.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    #[serde(alias = "CRITICAL")]
    Critical,
    #[serde(alias = "HIGH")]
    High,
    #[serde(alias = "MEDIUM")]
    Medium,
    #[serde(alias = "LOW")]
    Low,
    #[serde(alias = "INFO")]
    Info,
}

impl Severity {
    pub const ALL: [Severity; 5] = [
        Severity::Critical,
        Severity::High,
        Severity::Medium,
        Severity::Low,
        Severity::Info,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Critical => "critical",
            Severity::High => "high",
            Severity::Medium => "medium",
            Severity::Low => "low",
            Severity::Info => "info",
        }
    }
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Severity {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "critical" => Ok(Severity::Critical),
            "high" => Ok(Severity::High),
            "medium" => Ok(Severity::Medium),
            "low" => Ok(Severity::Low),
            "info" => Ok(Severity::Info),
            other => Err(format!("unknown severity '{}'", other)),
        }
    }
}

/// Finding lifecycle, independent of severity and mutable by the client.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FindingStatus {
    Open,
    InProgress,
    Resolved,
    FalsePositive,
}

impl FindingStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            FindingStatus::Open => "open",
            FindingStatus::InProgress => "in_progress",
            FindingStatus::Resolved => "resolved",
            FindingStatus::FalsePositive => "false_positive",
        }
    }
}

impl std::fmt::Display for FindingStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for FindingStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "open" => Ok(FindingStatus::Open),
            "in_progress" => Ok(FindingStatus::InProgress),
            "resolved" => Ok(FindingStatus::Resolved),
            "false_positive" => Ok(FindingStatus::FalsePositive),
            other => Err(format!("unknown finding status '{}'", other)),
        }
    }
}

/// One discovered vulnerability, scoped to a scan.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Finding {
    pub id: u64,
    pub title: String,
    pub severity: Severity,
    #[serde(rename = "type", default)]
    pub finding_type: Option<String>,
    #[serde(default = "default_finding_status")]
    pub status: FindingStatus,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub affected_url: String,
    #[serde(default)]
    pub payload: Option<String>,
    #[serde(default)]
    pub evidence: Option<String>,
    #[serde(default)]
    pub remediation: Option<String>,
    #[serde(default)]
    pub discovered_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub discovered_by: Option<String>,
}

fn default_finding_status() -> FindingStatus {
    FindingStatus::Open
}

/// Finding detail as returned by `GET /findings/{id}`, with scan context.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FindingDetail {
    #[serde(flatten)]
    pub finding: Finding,
    #[serde(default)]
    pub scan: Option<FindingScanRef>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FindingScanRef {
    pub job_id: String,
    pub target: String,
}

/// Counts by severity, always derived from a findings snapshot so the count
/// and the list it describes cannot drift apart.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeverityCounts {
    #[serde(default, alias = "CRITICAL")]
    pub critical: u64,
    #[serde(default, alias = "HIGH")]
    pub high: u64,
    #[serde(default, alias = "MEDIUM")]
    pub medium: u64,
    #[serde(default, alias = "LOW")]
    pub low: u64,
    #[serde(default, alias = "INFO")]
    pub info: u64,
}

impl SeverityCounts {
    pub fn from_findings(findings: &[Finding]) -> Self {
        let mut counts = Self::default();
        for finding in findings {
            match finding.severity {
                Severity::Critical => counts.critical += 1,
                Severity::High => counts.high += 1,
                Severity::Medium => counts.medium += 1,
                Severity::Low => counts.low += 1,
                Severity::Info => counts.info += 1,
            }
        }
        counts
    }

    pub fn total(&self) -> u64 {
        self.critical + self.high + self.medium + self.low + self.info
    }

    pub fn get(&self, severity: Severity) -> u64 {
        match severity {
            Severity::Critical => self.critical,
            Severity::High => self.high,
            Severity::Medium => self.medium,
            Severity::Low => self.low,
            Severity::Info => self.info,
        }
    }
}

/// Complete findings snapshot for one scan. The server returns the full
/// current set on every poll, never a delta.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FindingsPage {
    #[serde(default)]
    pub job_id: Option<String>,
    #[serde(default)]
    pub findings: Vec<Finding>,
    #[serde(default)]
    pub total: u64,
    #[serde(default)]
    pub by_severity: Option<SeverityCounts>,
}

impl FindingsPage {
    /// Severity breakdown for this snapshot, recomputed from the list itself
    /// rather than trusting a server-side aggregate.
    pub fn severity_counts(&self) -> SeverityCounts {
        SeverityCounts::from_findings(&self.findings)
    }
}

/// Server-side filters for findings listings.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FindingFilters {
    pub severity: Vec<Severity>,
    pub finding_type: Vec<String>,
    pub job_id: Option<String>,
}

impl FindingFilters {
    pub fn is_empty(&self) -> bool {
        self.severity.is_empty() && self.finding_type.is_empty() && self.job_id.is_none()
    }

    pub fn to_query_pairs(&self) -> Vec<(String, String)> {
        let mut pairs = Vec::new();
        for severity in &self.severity {
            pairs.push(("severity".to_string(), severity.to_string()));
        }
        for finding_type in &self.finding_type {
            pairs.push(("type".to_string(), finding_type.clone()));
        }
        if let Some(ref job_id) = self.job_id {
            pairs.push(("job_id".to_string(), job_id.clone()));
        }
        pairs
    }

    /// Stable string form used as part of a cache key. Identical filter sets
    /// must produce identical fingerprints.
    pub fn fingerprint(&self) -> String {
        let mut severities: Vec<&str> = self.severity.iter().map(Severity::as_str).collect();
        severities.sort_unstable();
        let mut types: Vec<&str> = self.finding_type.iter().map(String::as_str).collect();
        types.sort_unstable();
        format!(
            "sev={};type={};job={}",
            severities.join(","),
            types.join(","),
            self.job_id.as_deref().unwrap_or("")
        )
    }
}
