// Coordination metrics
//
// Lightweight counters for the dispatcher, the busy-indicator pipeline and startup

use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::time::{Duration, Instant};

/// Process-wide coordination counters
///
/// Uses atomic operations so loader threads and the interaction thread can
/// record without taking a lock. One instance is created by the composition
/// root and shared by every component through an `Arc`.
#[derive(Debug)]
pub struct Metrics {
    /// Work items executed synchronously because the caller was the interaction thread
    pub tasks_inline: AtomicU64,

    /// Work items queued for the interaction thread
    pub tasks_queued: AtomicU64,

    /// Queued work items executed by the main loop
    pub tasks_executed: AtomicU64,

    /// Busy values delivered to a foreground screen
    pub busy_publishes: AtomicU64,

    /// Busy values dropped because no screen was in the foreground
    pub publishes_dropped: AtomicU64,

    /// Stop events ignored because a different screen (or none) was visible
    pub stale_stops_ignored: AtomicU64,

    /// Directories that ended startup with the requested mode
    pub directories_ready: AtomicUsize,

    /// Directories that could not be created or chmod-ed
    pub directory_failures: AtomicUsize,

    /// One-time migrations that ran to completion
    pub migrations_completed: AtomicUsize,

    /// One-time migrations that failed or were deferred
    pub migrations_failed: AtomicUsize,

    start_time: Instant,
}

impl Metrics {
    /// Create a new Metrics instance
    pub fn new() -> Self {
        Self {
            tasks_inline: AtomicU64::new(0),
            tasks_queued: AtomicU64::new(0),
            tasks_executed: AtomicU64::new(0),
            busy_publishes: AtomicU64::new(0),
            publishes_dropped: AtomicU64::new(0),
            stale_stops_ignored: AtomicU64::new(0),
            directories_ready: AtomicUsize::new(0),
            directory_failures: AtomicUsize::new(0),
            migrations_completed: AtomicUsize::new(0),
            migrations_failed: AtomicUsize::new(0),
            start_time: Instant::now(),
        }
    }

    pub fn record_task_inline(&self) {
        self.tasks_inline.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_task_queued(&self) {
        self.tasks_queued.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_task_executed(&self) {
        self.tasks_executed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_busy_publish(&self) {
        self.busy_publishes.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_publish_dropped(&self) {
        self.publishes_dropped.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_stale_stop(&self) {
        self.stale_stops_ignored.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_directory_ready(&self) {
        self.directories_ready.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_directory_failure(&self) {
        self.directory_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_migration_completed(&self) {
        self.migrations_completed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_migration_failed(&self) {
        self.migrations_failed.fetch_add(1, Ordering::Relaxed);
    }

    /// Get total uptime
    pub fn uptime(&self) -> Duration {
        self.start_time.elapsed()
    }

    /// Number of queued items not yet executed by the main loop
    pub fn tasks_pending(&self) -> u64 {
        self.tasks_queued
            .load(Ordering::Relaxed)
            .saturating_sub(self.tasks_executed.load(Ordering::Relaxed))
    }

    /// Log metrics summary
    pub fn log_summary(&self) {
        tracing::info!("=== Coordination Metrics Summary ===");
        tracing::info!("Uptime: {:.2}s", self.uptime().as_secs_f64());
        tracing::info!(
            "Startup: {} directories ready, {} failed; {} migrations completed, {} failed",
            self.directories_ready.load(Ordering::Relaxed),
            self.directory_failures.load(Ordering::Relaxed),
            self.migrations_completed.load(Ordering::Relaxed),
            self.migrations_failed.load(Ordering::Relaxed)
        );
        tracing::info!(
            "Dispatcher: {} inline, {} queued, {} executed",
            self.tasks_inline.load(Ordering::Relaxed),
            self.tasks_queued.load(Ordering::Relaxed),
            self.tasks_executed.load(Ordering::Relaxed)
        );
        tracing::info!(
            "Busy indicator: {} delivered, {} dropped, {} stale stops ignored",
            self.busy_publishes.load(Ordering::Relaxed),
            self.publishes_dropped.load(Ordering::Relaxed),
            self.stale_stops_ignored.load(Ordering::Relaxed)
        );
    }
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}
