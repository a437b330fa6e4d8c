//! Round-robin rotation cursor.

use std::sync::atomic::{AtomicUsize, Ordering};

/// Per-service rotation cursor.
///
/// Every call takes the next slot, whatever happens to the attempt, so
/// repeated failures still rotate across the pool. The counter wraps on
/// overflow; the index is always taken modulo the pool size.
#[derive(Debug, Default)]
pub struct RoundRobin {
    counter: AtomicUsize,
}

impl RoundRobin {
    pub fn new() -> Self {
        Self::default()
    }

    /// Atomically advance the cursor and return the index it pointed at.
    ///
    /// Returns `None` for an empty pool.
    pub fn next_index(&self, len: usize) -> Option<usize> {
        if len == 0 {
            return None;
        }
        Some(self.counter.fetch_add(1, Ordering::Relaxed) % len)
    }
}
