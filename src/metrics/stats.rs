//! Refresh statistics backed by atomics.

use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

#[derive(Default)]
struct Counters {
    refresh_attempts: AtomicU64,
    refresh_successes: AtomicU64,
    refresh_failures: AtomicU64,
    queued_requests: AtomicU64,
    replays: AtomicU64,
    redirects: AtomicU64,
}

/// Cheap to clone; every clone records into the same counters.
#[derive(Clone, Default)]
pub struct RefreshStats {
    counters: Arc<Counters>,
}

/// A point-in-time copy of [`RefreshStats`].
#[derive(Serialize, Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StatsSnapshot {
    pub refresh_attempts: u64,
    pub refresh_successes: u64,
    pub refresh_failures: u64,
    pub queued_requests: u64,
    pub replays: u64,
    pub redirects: u64,
}

impl RefreshStats {
    pub fn new() -> Self {
        Self::default()
    }

    /// A call to the refresh endpoint is about to be made.
    pub fn record_refresh_attempt(&self) {
        self.counters.refresh_attempts.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_refresh_result(&self, success: bool) {
        let counter = if success {
            &self.counters.refresh_successes
        } else {
            &self.counters.refresh_failures
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }

    /// A request parked behind an in-flight refresh.
    pub fn record_queued_request(&self) {
        self.counters.queued_requests.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_replay(&self) {
        self.counters.replays.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_redirect(&self) {
        self.counters.redirects.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> StatsSnapshot {
        let c = &self.counters;
        StatsSnapshot {
            refresh_attempts: c.refresh_attempts.load(Ordering::Relaxed),
            refresh_successes: c.refresh_successes.load(Ordering::Relaxed),
            refresh_failures: c.refresh_failures.load(Ordering::Relaxed),
            queued_requests: c.queued_requests.load(Ordering::Relaxed),
            replays: c.replays.load(Ordering::Relaxed),
            redirects: c.redirects.load(Ordering::Relaxed),
        }
    }
}
