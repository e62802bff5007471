//! Scan liveness and synchronization.
//!
//! Three pieces, deliberately separable: the pure refetch-cadence policy
//! (`interval`), the key-addressed snapshot cache with its monotonicity rule
//! (`cache`), and the timer-driven tasks that tie a remote source to the
//! cache for one watched scan (`watcher`).

pub mod cache;
pub mod interval;
pub mod source;
pub mod watcher;

pub use cache::{CacheKey, CacheView, SyncCache};
pub use interval::{next_interval, PollConfig, ResourceKind};
pub use source::ScanSource;
pub use watcher::{NullSink, ScanWatcher, SinkRef, WatchSink};
