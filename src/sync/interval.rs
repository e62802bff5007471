//! Refetch cadence policy.
//!
//! `next_interval` is a pure function of the last observed scan status, kept
//! separate from the cache and the fetch machinery so the policy is
//! unit-testable on its own.

use std::time::Duration;

use crate::model::ScanStatus;

/// The three independently refreshable resources of one scan.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResourceKind {
    Status,
    Findings,
    Logs,
}

impl std::fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            ResourceKind::Status => "status",
            ResourceKind::Findings => "findings",
            ResourceKind::Logs => "logs",
        };
        f.write_str(name)
    }
}

/// Base refetch intervals per resource kind. Logs and findings change more
/// often than the status line during execution, so they poll faster.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollConfig {
    pub status_interval: Duration,
    pub findings_interval: Duration,
    pub logs_interval: Duration,
}

impl Default for PollConfig {
    fn default() -> Self {
        Self {
            status_interval: Duration::from_secs(5),
            findings_interval: Duration::from_secs(3),
            logs_interval: Duration::from_millis(2500),
        }
    }
}

impl PollConfig {
    pub fn base_interval(&self, kind: ResourceKind) -> Duration {
        match kind {
            ResourceKind::Status => self.status_interval,
            ResourceKind::Findings => self.findings_interval,
            ResourceKind::Logs => self.logs_interval,
        }
    }
}

/// Decides whether and how soon a resource should be refetched.
///
/// While the scan is active every resource polls at its base interval. Once
/// the status is terminal nothing refetches automatically (the watcher issues
/// the one forced final refresh itself). An `Unknown` status stops the
/// findings/logs pollers from assuming progress, but the status resource
/// keeps polling at its base interval: it is the only way the lifecycle
/// position can be discovered.
pub fn next_interval(status: ScanStatus, kind: ResourceKind, config: &PollConfig) -> Option<Duration> {
    if status.is_active() {
        return Some(config.base_interval(kind));
    }
    if status == ScanStatus::Unknown && kind == ResourceKind::Status {
        return Some(config.base_interval(kind));
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    const KINDS: [ResourceKind; 3] = [
        ResourceKind::Status,
        ResourceKind::Findings,
        ResourceKind::Logs,
    ];

    #[test]
    fn test_active_statuses_poll_every_kind() {
        let config = PollConfig::default();
        for status in [ScanStatus::Queued, ScanStatus::Running] {
            for kind in KINDS {
                let interval = next_interval(status, kind, &config).unwrap();
                assert!(interval > Duration::ZERO);
            }
        }
    }

    #[test]
    fn test_terminal_statuses_never_poll() {
        let config = PollConfig::default();
        for status in [ScanStatus::Completed, ScanStatus::Failed] {
            for kind in KINDS {
                assert_eq!(next_interval(status, kind, &config), None);
            }
        }
    }

    #[test]
    fn test_unknown_polls_status_only() {
        let config = PollConfig::default();
        assert!(next_interval(ScanStatus::Unknown, ResourceKind::Status, &config).is_some());
        assert_eq!(
            next_interval(ScanStatus::Unknown, ResourceKind::Findings, &config),
            None
        );
        assert_eq!(
            next_interval(ScanStatus::Unknown, ResourceKind::Logs, &config),
            None
        );
    }

    #[test]
    fn test_findings_and_logs_poll_faster_than_status() {
        let config = PollConfig::default();
        let status = next_interval(ScanStatus::Running, ResourceKind::Status, &config).unwrap();
        let findings = next_interval(ScanStatus::Running, ResourceKind::Findings, &config).unwrap();
        let logs = next_interval(ScanStatus::Running, ResourceKind::Logs, &config).unwrap();
        assert!(findings < status);
        assert!(logs < status);
    }
}
