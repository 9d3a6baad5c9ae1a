//! Access check statistics
//!
//! Lock-free counters for checks and reloads, served by the HTTP API.

use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Instant, SystemTime};

/// Outcome of one guarded check, as counted
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CheckOutcome {
    Allowed,
    Redirected,
    DanglingReference,
    Failed,
}

/// Counters shared by the guard and the reload service
pub struct GuardStats {
    start_time: Instant,
    start_system_time: SystemTime,
    checks: AtomicU64,
    allowed: AtomicU64,
    redirected: AtomicU64,
    dangling: AtomicU64,
    failed: AtomicU64,
    reloads: AtomicU64,
    reload_failures: AtomicU64,
}

/// Serializable view of the counters
#[derive(Debug, Clone, Serialize)]
pub struct StatsSnapshot {
    pub uptime_secs: u64,
    pub start_time: u64,
    pub checks: u64,
    pub allowed: u64,
    pub redirected: u64,
    pub dangling_references: u64,
    pub failed: u64,
    pub reloads: u64,
    pub reload_failures: u64,
}

impl GuardStats {
    pub fn new() -> Self {
        Self {
            start_time: Instant::now(),
            start_system_time: SystemTime::now(),
            checks: AtomicU64::new(0),
            allowed: AtomicU64::new(0),
            redirected: AtomicU64::new(0),
            dangling: AtomicU64::new(0),
            failed: AtomicU64::new(0),
            reloads: AtomicU64::new(0),
            reload_failures: AtomicU64::new(0),
        }
    }

    pub fn record_check(&self, outcome: CheckOutcome) {
        self.checks.fetch_add(1, Ordering::Relaxed);
        let counter = match outcome {
            CheckOutcome::Allowed => &self.allowed,
            CheckOutcome::Redirected => &self.redirected,
            CheckOutcome::DanglingReference => &self.dangling,
            CheckOutcome::Failed => &self.failed,
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_reload(&self, success: bool) {
        if success {
            self.reloads.fetch_add(1, Ordering::Relaxed);
        } else {
            self.reload_failures.fetch_add(1, Ordering::Relaxed);
        }
    }

    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            uptime_secs: self.start_time.elapsed().as_secs(),
            start_time: self
                .start_system_time
                .duration_since(SystemTime::UNIX_EPOCH)
                .map(|d| d.as_secs())
                .unwrap_or(0),
            checks: self.checks.load(Ordering::Relaxed),
            allowed: self.allowed.load(Ordering::Relaxed),
            redirected: self.redirected.load(Ordering::Relaxed),
            dangling_references: self.dangling.load(Ordering::Relaxed),
            failed: self.failed.load(Ordering::Relaxed),
            reloads: self.reloads.load(Ordering::Relaxed),
            reload_failures: self.reload_failures.load(Ordering::Relaxed),
        }
    }
}

impl Default for GuardStats {
    fn default() -> Self {
        Self::new()
    }
}
