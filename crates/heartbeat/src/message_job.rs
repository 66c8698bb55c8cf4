//! Periodic job printing the configured message.

use crate::metrics::MetricsRegistry;
use crate::types::MessageCounter;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::{Instant, MissedTickBehavior, interval_at};
use tokio_util::sync::CancellationToken;
use tracing::info;

/// Prints a message on every tick and counts it
pub struct MessageJob {
    /// Text printed on each tick
    message: String,

    /// Interval between ticks
    tick_interval: Duration,

    /// Shared message counter
    counter: MessageCounter,

    /// Metrics registry
    metrics: Arc<MetricsRegistry>,
}

impl MessageJob {
    /// Create a new message job
    ///
    /// `tick_interval` must be non-zero.
    pub fn new(
        message: String,
        tick_interval: Duration,
        counter: MessageCounter,
        metrics: Arc<MetricsRegistry>,
    ) -> Self {
        Self {
            message,
            tick_interval,
            counter,
            metrics,
        }
    }

    /// Run until `cancel` fires. The first tick happens one full interval
    /// after start.
    pub async fn run(self, cancel: CancellationToken) {
        info!(interval = ?self.tick_interval, "Message job started");

        let mut ticker = interval_at(Instant::now() + self.tick_interval, self.tick_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                biased;

                _ = cancel.cancelled() => {
                    info!("Shutting down message job");
                    break;
                }

                _ = ticker.tick() => {
                    self.tick();
                }
            }
        }
    }

    fn tick(&self) {
        let count = self.counter.increment();
        info!(count, "[Print] {} (Message #{})", self.message, count);
        self.metrics.record_message();
    }
}
