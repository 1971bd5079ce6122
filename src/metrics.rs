// Process metrics
//
// Lightweight counters for what the cycles have done since startup

use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::time::{Duration, Instant};

/// Process-wide counters.
///
/// Uses atomic operations so the scheduler and tests can read them without
/// locks. A one-line summary is logged after every cycle and a full summary
/// on shutdown.
#[derive(Debug)]
pub struct Metrics {
    /// Cycles that ran to the end (service-level failures included)
    pub cycles_completed: AtomicU64,

    /// Cycles aborted by a fatal fetch error
    pub cycles_failed: AtomicU64,

    /// Queue records deleted and blocklisted
    pub torrents_removed: AtomicUsize,

    /// Queue record deletes that failed
    pub removal_failures: AtomicUsize,

    /// Matches only logged because pretend mode is on
    pub pretend_matches: AtomicUsize,

    /// Queue fetches that failed, aborting one service's reconciliation
    pub queue_fetch_failures: AtomicU64,

    /// Replacement searches accepted by a service
    pub searches_triggered: AtomicU64,

    /// Replacement searches that failed
    pub search_failures: AtomicU64,

    /// Total time spent in cycles in milliseconds
    pub total_cycle_time_ms: AtomicU64,

    start_time: Instant,
}

impl Metrics {
    pub fn new() -> Self {
        Self {
            cycles_completed: AtomicU64::new(0),
            cycles_failed: AtomicU64::new(0),
            torrents_removed: AtomicUsize::new(0),
            removal_failures: AtomicUsize::new(0),
            pretend_matches: AtomicUsize::new(0),
            queue_fetch_failures: AtomicU64::new(0),
            searches_triggered: AtomicU64::new(0),
            search_failures: AtomicU64::new(0),
            total_cycle_time_ms: AtomicU64::new(0),
            start_time: Instant::now(),
        }
    }

    pub fn record_cycle_completed(&self, duration: Duration) {
        self.cycles_completed.fetch_add(1, Ordering::Relaxed);
        self.record_cycle_time(duration);
    }

    pub fn record_cycle_failed(&self, duration: Duration) {
        self.cycles_failed.fetch_add(1, Ordering::Relaxed);
        self.record_cycle_time(duration);
    }

    fn record_cycle_time(&self, duration: Duration) {
        self.total_cycle_time_ms
            .fetch_add(duration.as_millis() as u64, Ordering::Relaxed);
    }

    pub fn record_removed(&self, count: usize) {
        self.torrents_removed.fetch_add(count, Ordering::Relaxed);
    }

    pub fn record_removal_failures(&self, count: usize) {
        self.removal_failures.fetch_add(count, Ordering::Relaxed);
    }

    pub fn record_pretend_matches(&self, count: usize) {
        self.pretend_matches.fetch_add(count, Ordering::Relaxed);
    }

    pub fn record_queue_fetch_failure(&self) {
        self.queue_fetch_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_search_triggered(&self) {
        self.searches_triggered.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_search_failed(&self) {
        self.search_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn uptime(&self) -> Duration {
        self.start_time.elapsed()
    }

    /// Average cycle duration in milliseconds over all finished or failed cycles
    pub fn avg_cycle_time_ms(&self) -> f64 {
        let total = self.total_cycle_time_ms.load(Ordering::Relaxed);
        let count = self.cycles_completed.load(Ordering::Relaxed)
            + self.cycles_failed.load(Ordering::Relaxed);
        if count > 0 {
            total as f64 / count as f64
        } else {
            0.0
        }
    }

    /// Log metrics summary
    pub fn log_summary(&self) {
        tracing::info!("=== Metrics Summary ===");
        tracing::info!("Uptime: {:.0}s", self.uptime().as_secs_f64());
        tracing::info!(
            "Cycles: {} completed, {} failed (avg {:.0}ms)",
            self.cycles_completed.load(Ordering::Relaxed),
            self.cycles_failed.load(Ordering::Relaxed),
            self.avg_cycle_time_ms()
        );
        tracing::info!(
            "Torrents: {} removed, {} removal failures, {} pretend matches",
            self.torrents_removed.load(Ordering::Relaxed),
            self.removal_failures.load(Ordering::Relaxed),
            self.pretend_matches.load(Ordering::Relaxed)
        );
        tracing::info!(
            "Searches: {} triggered, {} failed; queue fetch failures: {}",
            self.searches_triggered.load(Ordering::Relaxed),
            self.search_failures.load(Ordering::Relaxed),
            self.queue_fetch_failures.load(Ordering::Relaxed)
        );
    }

    /// One-line running totals, logged after each cycle
    pub fn log_periodic(&self) {
        tracing::info!(
            "Metrics: {} cycles, {} removed, {} failed removals, {} searches, uptime {:.0}s",
            self.cycles_completed.load(Ordering::Relaxed)
                + self.cycles_failed.load(Ordering::Relaxed),
            self.torrents_removed.load(Ordering::Relaxed),
            self.removal_failures.load(Ordering::Relaxed),
            self.searches_triggered.load(Ordering::Relaxed),
            self.uptime().as_secs_f64()
        );
    }
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}
