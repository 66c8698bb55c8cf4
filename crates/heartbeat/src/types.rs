//! Shared handles and constants passed to every background task.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

/// Cadence of the stats job. Not configurable.
pub const STATS_INTERVAL: Duration = Duration::from_secs(5);

/// Time each HTTP server gets to drain in-flight requests after cancellation.
pub const SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(5);

/// Number of messages printed so far.
///
/// Cloning yields another handle to the same counter. Increments are
/// `AcqRel` and reads are `Acquire`, so a reader never sees a partially
/// applied increment.
#[derive(Debug, Clone, Default)]
pub struct MessageCounter {
    inner: Arc<AtomicU64>,
}

impl MessageCounter {
    /// Create a counter starting at zero
    pub fn new() -> Self {
        Self::default()
    }

    /// Add one and return the new value
    pub fn increment(&self) -> u64 {
        self.inner.fetch_add(1, Ordering::AcqRel) + 1
    }

    /// Current value
    pub fn get(&self) -> u64 {
        self.inner.load(Ordering::Acquire)
    }
}

/// Final totals reported by the supervisor once every task has stopped.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Summary {
    /// Messages printed over the process lifetime
    pub messages: u64,
    /// Wall-clock runtime
    pub elapsed: Duration,
}
