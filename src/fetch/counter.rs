//! Request counting for throughput measurement

use std::sync::atomic::{AtomicU64, Ordering};

/// Counts completed HTTP exchanges
///
/// The fetcher increments a counter once per successful exchange, never per
/// failed attempt.
pub trait RequestCounter: Send + Sync {
    /// Records one successful exchange
    fn increment(&self);

    /// Returns the number of exchanges recorded so far
    fn count(&self) -> u64;
}

/// Lock-free counter shared between a run and its fetches
#[derive(Debug, Default)]
pub struct AtomicRequestCounter {
    count: AtomicU64,
}

impl AtomicRequestCounter {
    pub fn new() -> Self {
        Self::default()
    }
}

impl RequestCounter for AtomicRequestCounter {
    fn increment(&self) {
        self.count.fetch_add(1, Ordering::SeqCst);
    }

    fn count(&self) -> u64 {
        self.count.load(Ordering::SeqCst)
    }
}
