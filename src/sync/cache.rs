//! Last-known-good snapshots per (resource kind, job id) key.
//!
//! Each key is written by exactly one active poller at a time, so a plain
//! mutex with key-scoped last-write-wins is enough. The one extra rule is
//! monotonicity: a snapshot whose sequence is lower than the cached one is an
//! out-of-order straggler and is discarded, never applied.
//!
//! Sequences per resource:
//!   scan      — (status rank, progress): the lifecycle never moves backwards
//!   findings  — total: the set never shrinks while the scan is active
//!   logs      — entry count: append-only

use std::collections::HashMap;
use std::sync::Mutex;

use super::ResourceKind;
use crate::model::{FindingsPage, LogEntry, Scan};

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    pub kind: ResourceKind,
    pub job_id: String,
    /// Filter fingerprint; only findings entries carry one.
    pub filter: Option<String>,
}

impl CacheKey {
    pub fn scan(job_id: &str) -> Self {
        Self {
            kind: ResourceKind::Status,
            job_id: job_id.to_string(),
            filter: None,
        }
    }

    pub fn findings(job_id: &str, filter: Option<&str>) -> Self {
        Self {
            kind: ResourceKind::Findings,
            job_id: job_id.to_string(),
            filter: filter.map(str::to_string),
        }
    }

    pub fn logs(job_id: &str) -> Self {
        Self {
            kind: ResourceKind::Logs,
            job_id: job_id.to_string(),
            filter: None,
        }
    }
}

#[derive(Debug, Clone)]
enum Snapshot {
    Scan(Scan),
    Findings(FindingsPage),
    Logs(Vec<LogEntry>),
}

#[derive(Debug)]
struct Entry {
    snapshot: Snapshot,
    seq: u64,
    stale: bool,
}

/// What a reader sees for one resource: the latest snapshot if any, whether
/// the first fetch is still outstanding, and whether a mutation has marked
/// the entry stale pending refresh.
#[derive(Debug, Clone)]
pub struct CacheView<T> {
    pub data: Option<T>,
    pub is_loading: bool,
    pub is_stale: bool,
}

impl<T> CacheView<T> {
    fn missing() -> Self {
        Self {
            data: None,
            is_loading: true,
            is_stale: false,
        }
    }
}

#[derive(Debug, Default)]
pub struct SyncCache {
    entries: Mutex<HashMap<CacheKey, Entry>>,
}

impl SyncCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Applies a scan snapshot. Returns false if the snapshot was discarded
    /// as older than the cached one.
    pub fn apply_scan(&self, job_id: &str, scan: Scan) -> bool {
        let seq = scan_seq(&scan);
        self.apply(CacheKey::scan(job_id), Snapshot::Scan(scan), seq)
    }

    pub fn apply_findings(&self, job_id: &str, filter: Option<&str>, page: FindingsPage) -> bool {
        let seq = page.total;
        self.apply(
            CacheKey::findings(job_id, filter),
            Snapshot::Findings(page),
            seq,
        )
    }

    pub fn apply_logs(&self, job_id: &str, logs: Vec<LogEntry>) -> bool {
        let seq = logs.len() as u64;
        self.apply(CacheKey::logs(job_id), Snapshot::Logs(logs), seq)
    }

    fn apply(&self, key: CacheKey, snapshot: Snapshot, seq: u64) -> bool {
        let mut entries = self.entries.lock().expect("cache lock poisoned");
        match entries.get_mut(&key) {
            Some(entry) => {
                // Equal sequence still replaces: same shape, fresher fields.
                // A stale entry accepts whatever the next fetch returns.
                if !entry.stale && seq < entry.seq {
                    return false;
                }
                entry.snapshot = snapshot;
                entry.seq = seq;
                entry.stale = false;
                true
            }
            None => {
                entries.insert(
                    key,
                    Entry {
                        snapshot,
                        seq,
                        stale: false,
                    },
                );
                true
            }
        }
    }

    /// Marks every entry of the given kind for the given job stale (all
    /// filter variants). Stale entries keep serving their data but accept
    /// the next snapshot unconditionally.
    pub fn mark_stale(&self, kind: ResourceKind, job_id: &str) {
        let mut entries = self.entries.lock().expect("cache lock poisoned");
        for (key, entry) in entries.iter_mut() {
            if key.kind == kind && key.job_id == job_id {
                entry.stale = true;
            }
        }
    }

    /// Drops every entry for a job. Used when the job itself is deleted.
    pub fn evict_job(&self, job_id: &str) {
        let mut entries = self.entries.lock().expect("cache lock poisoned");
        entries.retain(|key, _| key.job_id != job_id);
    }

    pub fn scan(&self, job_id: &str) -> CacheView<Scan> {
        self.view(&CacheKey::scan(job_id), |snapshot| match snapshot {
            Snapshot::Scan(scan) => Some(scan.clone()),
            _ => None,
        })
    }

    pub fn findings(&self, job_id: &str, filter: Option<&str>) -> CacheView<FindingsPage> {
        self.view(&CacheKey::findings(job_id, filter), |snapshot| {
            match snapshot {
                Snapshot::Findings(page) => Some(page.clone()),
                _ => None,
            }
        })
    }

    pub fn logs(&self, job_id: &str) -> CacheView<Vec<LogEntry>> {
        self.view(&CacheKey::logs(job_id), |snapshot| match snapshot {
            Snapshot::Logs(logs) => Some(logs.clone()),
            _ => None,
        })
    }

    fn view<T>(&self, key: &CacheKey, project: impl Fn(&Snapshot) -> Option<T>) -> CacheView<T> {
        let entries = self.entries.lock().expect("cache lock poisoned");
        match entries.get(key) {
            Some(entry) => CacheView {
                data: project(&entry.snapshot),
                is_loading: false,
                is_stale: entry.stale,
            },
            None => CacheView::missing(),
        }
    }
}

/// Scan snapshots order by lifecycle position first, progress second.
fn scan_seq(scan: &Scan) -> u64 {
    (scan.status.rank() << 32) | u64::from(scan.progress)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Finding, ScanStatus, Severity};

    fn scan(job_id: &str, status: ScanStatus, progress: u8) -> Scan {
        Scan {
            job_id: job_id.to_string(),
            target: "https://example.com".to_string(),
            scan_type: None,
            status,
            progress,
            created_at: None,
            completed_at: None,
            duration_secs: None,
            total_findings: None,
            by_severity: None,
        }
    }

    fn finding(id: u64, severity: Severity) -> Finding {
        serde_json::from_value(serde_json::json!({
            "id": id,
            "title": format!("finding {}", id),
            "severity": severity.as_str(),
        }))
        .unwrap()
    }

    fn page(job_id: &str, ids: &[u64]) -> FindingsPage {
        FindingsPage {
            job_id: Some(job_id.to_string()),
            findings: ids.iter().map(|id| finding(*id, Severity::High)).collect(),
            total: ids.len() as u64,
            by_severity: None,
        }
    }

    #[test]
    fn test_loading_until_first_snapshot() {
        let cache = SyncCache::new();
        assert!(cache.scan("abc").is_loading);

        cache.apply_scan("abc", scan("abc", ScanStatus::Queued, 0));
        let view = cache.scan("abc");
        assert!(!view.is_loading);
        assert_eq!(view.data.unwrap().status, ScanStatus::Queued);
    }

    #[test]
    fn test_findings_total_never_regresses() {
        let cache = SyncCache::new();
        assert!(cache.apply_findings("abc", None, page("abc", &[1, 2, 3])));

        // Straggler response from an earlier poll arrives late.
        assert!(!cache.apply_findings("abc", None, page("abc", &[1])));
        assert_eq!(cache.findings("abc", None).data.unwrap().total, 3);

        // Equal total is accepted (statuses may have changed server-side).
        assert!(cache.apply_findings("abc", None, page("abc", &[1, 2, 4])));
    }

    #[test]
    fn test_scan_status_never_regresses() {
        let cache = SyncCache::new();
        cache.apply_scan("abc", scan("abc", ScanStatus::Running, 40));
        assert!(!cache.apply_scan("abc", scan("abc", ScanStatus::Queued, 0)));
        assert!(!cache.apply_scan("abc", scan("abc", ScanStatus::Running, 10)));
        assert!(cache.apply_scan("abc", scan("abc", ScanStatus::Completed, 100)));
        assert_eq!(
            cache.scan("abc").data.unwrap().status,
            ScanStatus::Completed
        );
    }

    #[test]
    fn test_logs_are_append_only() {
        let cache = SyncCache::new();
        let longer: Vec<LogEntry> = serde_json::from_value(serde_json::json!([
            {"timestamp": "2026-01-01T00:00:00Z", "agent": "recon", "action": "Started"},
            {"timestamp": "2026-01-01T00:00:05Z", "agent": "recon", "action": "Crawling"}
        ]))
        .unwrap();
        let shorter = vec![longer[0].clone()];

        assert!(cache.apply_logs("abc", longer));
        assert!(!cache.apply_logs("abc", shorter));
        assert_eq!(cache.logs("abc").data.unwrap().len(), 2);
    }

    #[test]
    fn test_stale_entry_accepts_next_snapshot_unconditionally() {
        let cache = SyncCache::new();
        cache.apply_findings("abc", None, page("abc", &[1, 2, 3]));

        cache.mark_stale(ResourceKind::Findings, "abc");
        assert!(cache.findings("abc", None).is_stale);

        // After a mutation the server is authoritative even if the total
        // looks older (e.g. the scan finished and a duplicate was merged).
        assert!(cache.apply_findings("abc", None, page("abc", &[1, 2])));
        let view = cache.findings("abc", None);
        assert!(!view.is_stale);
        assert_eq!(view.data.unwrap().total, 2);
    }

    #[test]
    fn test_jobs_are_independent() {
        let cache = SyncCache::new();
        cache.apply_findings("job-a", None, page("job-a", &[1, 2]));
        cache.apply_findings("job-b", None, page("job-b", &[9]));

        cache.mark_stale(ResourceKind::Findings, "job-a");
        assert!(cache.findings("job-a", None).is_stale);
        assert!(!cache.findings("job-b", None).is_stale);

        cache.evict_job("job-a");
        assert!(cache.findings("job-a", None).is_loading);
        assert_eq!(cache.findings("job-b", None).data.unwrap().total, 1);
    }

    #[test]
    fn test_filter_variants_are_distinct_keys() {
        let cache = SyncCache::new();
        cache.apply_findings("abc", None, page("abc", &[1, 2, 3]));
        cache.apply_findings("abc", Some("sev=critical"), page("abc", &[1]));

        assert_eq!(cache.findings("abc", None).data.unwrap().total, 3);
        assert_eq!(
            cache
                .findings("abc", Some("sev=critical"))
                .data
                .unwrap()
                .total,
            1
        );
    }
}
