//! Timer-driven refresh tasks for one watched scan.
//!
//! `ScanWatcher::spawn` starts one task per resource kind. The status task
//! owns the lifecycle: it publishes every observed `ScanStatus` over a watch
//! channel and exits after the terminal state. The findings and logs tasks
//! tick at the `next_interval` cadence, and on observing the transition into
//! a terminal state issue exactly one forced final refresh before exiting,
//! so the last batch produced just before completion is not missed.
//!
//! Transient fetch errors never stop a task; they are logged and retried on
//! the next tick. A 401 is fatal to the whole watch (the session is already
//! cleared by the client). Dropping the watcher aborts all tasks.

use std::sync::Arc;

use tokio::sync::{watch, Notify};
use tokio::task::JoinHandle;
use tokio::time::sleep;

use super::cache::SyncCache;
use super::interval::{next_interval, PollConfig, ResourceKind};
use super::source::ScanSource;
use crate::api::ApiError;
use crate::model::{FindingsPage, LogEntry, Scan, ScanStatus};

/// Event fan-out for a watched scan.
/// The CLI implements this with colored terminal output; headless consumers
/// can rely on the cache alone and use `NullSink`.
pub trait WatchSink: Send + Sync {
    fn on_status(&self, _scan: &Scan) {}
    fn on_findings(&self, _page: &FindingsPage) {}
    fn on_log(&self, _entry: &LogEntry) {}
    fn on_terminal(&self, _scan: &Scan) {}
    fn on_poll_error(&self, _kind: ResourceKind, _error: &ApiError) {}
}

pub type SinkRef = Arc<dyn WatchSink>;

/// Sink that ignores every event.
pub struct NullSink;

impl WatchSink for NullSink {}

/// Handle over the refresh tasks for one job. Cancellation is idempotent and
/// tied to the handle's lifetime: dropping the watcher aborts every task, so
/// a consumer tearing down (or switching job ids by spawning a new watcher)
/// leaves no timers behind.
pub struct ScanWatcher {
    kick: Arc<Notify>,
    tasks: Vec<JoinHandle<()>>,
}

impl ScanWatcher {
    /// Starts watching a scan. Refuses an empty job id outright: no request
    /// is ever issued without an identifier.
    pub fn spawn(
        source: Arc<dyn ScanSource>,
        cache: Arc<SyncCache>,
        sink: SinkRef,
        job_id: &str,
        config: PollConfig,
    ) -> anyhow::Result<Self> {
        let job_id = job_id.trim();
        if job_id.is_empty() {
            anyhow::bail!("cannot watch a scan without a job id");
        }
        let job_id = job_id.to_string();

        let (status_tx, status_rx) = watch::channel(ScanStatus::Unknown);
        let kick = Arc::new(Notify::new());

        let tasks = vec![
            tokio::spawn(run_status_task(
                Arc::clone(&source),
                Arc::clone(&cache),
                Arc::clone(&sink),
                job_id.clone(),
                config,
                status_tx,
            )),
            tokio::spawn(run_findings_task(
                Arc::clone(&source),
                Arc::clone(&cache),
                Arc::clone(&sink),
                job_id.clone(),
                config,
                status_rx.clone(),
                Arc::clone(&kick),
            )),
            tokio::spawn(run_logs_task(
                source,
                cache,
                sink,
                job_id,
                config,
                status_rx,
            )),
        ];

        Ok(Self { kick, tasks })
    }

    /// Wakes the findings poller ahead of its next tick. Called after a
    /// finding mutation (paired with `SyncCache::mark_stale`) so the view
    /// reaches consistency without waiting out the interval.
    pub fn refresh_findings(&self) {
        self.kick.notify_one();
    }

    /// Runs until the scan reaches a terminal state (or the watch dies to a
    /// 401). The final forced refreshes have completed when this returns.
    pub async fn wait(mut self) {
        for task in self.tasks.drain(..) {
            let _ = task.await;
        }
    }

    /// Aborts all refresh tasks. Idempotent.
    pub fn cancel(&mut self) {
        for task in self.tasks.drain(..) {
            task.abort();
        }
    }
}

impl Drop for ScanWatcher {
    fn drop(&mut self) {
        self.cancel();
    }
}

async fn run_status_task(
    source: Arc<dyn ScanSource>,
    cache: Arc<SyncCache>,
    sink: SinkRef,
    job_id: String,
    config: PollConfig,
    status_tx: watch::Sender<ScanStatus>,
) {
    let mut current = ScanStatus::Unknown;
    loop {
        match source.fetch_scan(&job_id).await {
            Ok(scan) => {
                current = scan.status;
                if cache.apply_scan(&job_id, scan.clone()) {
                    sink.on_status(&scan);
                }
                let _ = status_tx.send(current);
                if current.is_terminal() {
                    sink.on_terminal(&scan);
                    break;
                }
            }
            Err(ApiError::Unauthorized) => {
                sink.on_poll_error(ResourceKind::Status, &ApiError::Unauthorized);
                break;
            }
            Err(e) => {
                log::warn!("scan {}: status poll failed, will retry: {}", job_id, e);
                sink.on_poll_error(ResourceKind::Status, &e);
            }
        }

        match next_interval(current, ResourceKind::Status, &config) {
            Some(interval) => sleep(interval).await,
            None => break,
        }
    }
    // status_tx drops here; dependent tasks observe the channel closing
}

async fn run_findings_task(
    source: Arc<dyn ScanSource>,
    cache: Arc<SyncCache>,
    sink: SinkRef,
    job_id: String,
    config: PollConfig,
    mut status_rx: watch::Receiver<ScanStatus>,
    kick: Arc<Notify>,
) {
    // First fetch is unconditional; next_interval only governs refetches.
    if !fetch_findings_once(&source, &cache, &sink, &job_id).await {
        return;
    }

    loop {
        let status = *status_rx.borrow_and_update();
        if status.is_terminal() {
            // Forced final refresh on the terminal transition.
            fetch_findings_once(&source, &cache, &sink, &job_id).await;
            break;
        }

        match next_interval(status, ResourceKind::Findings, &config) {
            Some(interval) => {
                tokio::select! {
                    _ = sleep(interval) => {
                        if !fetch_findings_once(&source, &cache, &sink, &job_id).await {
                            break;
                        }
                    }
                    _ = kick.notified() => {
                        if !fetch_findings_once(&source, &cache, &sink, &job_id).await {
                            break;
                        }
                    }
                    changed = status_rx.changed() => {
                        if changed.is_err() && !status_rx.borrow().is_terminal() {
                            break;
                        }
                    }
                }
            }
            // Not polling (unknown status): wait for news or a kick.
            None => {
                tokio::select! {
                    _ = kick.notified() => {
                        if !fetch_findings_once(&source, &cache, &sink, &job_id).await {
                            break;
                        }
                    }
                    changed = status_rx.changed() => {
                        if changed.is_err() && !status_rx.borrow().is_terminal() {
                            break;
                        }
                    }
                }
            }
        }
    }
}

async fn run_logs_task(
    source: Arc<dyn ScanSource>,
    cache: Arc<SyncCache>,
    sink: SinkRef,
    job_id: String,
    config: PollConfig,
    mut status_rx: watch::Receiver<ScanStatus>,
) {
    let mut seen = 0usize;

    if !fetch_logs_once(&source, &cache, &sink, &job_id, &mut seen).await {
        return;
    }

    loop {
        let status = *status_rx.borrow_and_update();
        if status.is_terminal() {
            fetch_logs_once(&source, &cache, &sink, &job_id, &mut seen).await;
            break;
        }

        match next_interval(status, ResourceKind::Logs, &config) {
            Some(interval) => {
                tokio::select! {
                    _ = sleep(interval) => {
                        if !fetch_logs_once(&source, &cache, &sink, &job_id, &mut seen).await {
                            break;
                        }
                    }
                    changed = status_rx.changed() => {
                        if changed.is_err() && !status_rx.borrow().is_terminal() {
                            break;
                        }
                    }
                }
            }
            None => {
                if status_rx.changed().await.is_err() && !status_rx.borrow().is_terminal() {
                    break;
                }
            }
        }
    }
}

/// Returns false only when the watch must die (401). Transient failures are
/// logged and retried on the next tick; a 404 means the resource does not
/// exist yet and is not worth a warning.
async fn fetch_findings_once(
    source: &Arc<dyn ScanSource>,
    cache: &SyncCache,
    sink: &SinkRef,
    job_id: &str,
) -> bool {
    match source.fetch_findings(job_id).await {
        Ok(page) => {
            if cache.apply_findings(job_id, None, page.clone()) {
                sink.on_findings(&page);
            }
            true
        }
        Err(ApiError::Unauthorized) => {
            sink.on_poll_error(ResourceKind::Findings, &ApiError::Unauthorized);
            false
        }
        Err(ApiError::NotFound) => {
            log::debug!("scan {}: findings not available yet", job_id);
            true
        }
        Err(e) => {
            log::warn!("scan {}: findings poll failed, will retry: {}", job_id, e);
            sink.on_poll_error(ResourceKind::Findings, &e);
            true
        }
    }
}

async fn fetch_logs_once(
    source: &Arc<dyn ScanSource>,
    cache: &SyncCache,
    sink: &SinkRef,
    job_id: &str,
    seen: &mut usize,
) -> bool {
    match source.fetch_logs(job_id).await {
        Ok(logs) => {
            if cache.apply_logs(job_id, logs.clone()) {
                if logs.len() > *seen {
                    for entry in &logs[*seen..] {
                        sink.on_log(entry);
                    }
                }
                *seen = logs.len();
            }
            true
        }
        Err(ApiError::Unauthorized) => {
            sink.on_poll_error(ResourceKind::Logs, &ApiError::Unauthorized);
            false
        }
        Err(ApiError::NotFound) => {
            log::debug!("scan {}: logs not available yet", job_id);
            true
        }
        Err(e) => {
            log::warn!("scan {}: logs poll failed, will retry: {}", job_id, e);
            sink.on_poll_error(ResourceKind::Logs, &e);
            true
        }
    }
}
