pub mod finding;
pub mod report;
pub mod scan;
pub mod stats;
pub mod user;

pub use finding::{
    Finding, FindingDetail, FindingFilters, FindingStatus, FindingsPage, Severity, SeverityCounts,
};
pub use report::{GeneratedReport, ReportFormat};
pub use scan::{CreateScanRequest, LogEntry, LogsResponse, Scan, ScanStatus};
pub use stats::{DashboardStats, RecentFinding, RecentScan};
pub use user::{AuthResponse, Credentials, RegisterRequest, User};
