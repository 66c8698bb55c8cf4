//! Periodic job logging runtime statistics.

use crate::metrics::MetricsRegistry;
use crate::types::{MessageCounter, STATS_INTERVAL};
use std::sync::Arc;
use tokio::time::{Instant, MissedTickBehavior, interval_at};
use tokio_util::sync::CancellationToken;
use tracing::info;

/// Logs elapsed runtime and the message count every [`STATS_INTERVAL`]
pub struct StatsJob {
    /// Process start time
    started: Instant,

    /// Shared message counter
    counter: MessageCounter,

    /// Metrics registry
    metrics: Arc<MetricsRegistry>,
}

impl StatsJob {
    /// Create a new stats job
    pub fn new(started: Instant, counter: MessageCounter, metrics: Arc<MetricsRegistry>) -> Self {
        Self {
            started,
            counter,
            metrics,
        }
    }

    /// Run until `cancel` fires
    pub async fn run(self, cancel: CancellationToken) {
        info!(interval = ?STATS_INTERVAL, "Stats job started");

        let mut ticker = interval_at(Instant::now() + STATS_INTERVAL, STATS_INTERVAL);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                biased;

                _ = cancel.cancelled() => {
                    info!("Shutting down stats job");
                    break;
                }

                _ = ticker.tick() => {
                    self.tick();
                }
            }
        }
    }

    fn tick(&self) {
        let elapsed = self.started.elapsed();
        let count = self.counter.get();
        info!(
            elapsed_secs = elapsed.as_secs_f64(),
            count,
            "[Stats] Elapsed time: {:.2}s | Messages printed: {}",
            elapsed.as_secs_f64(),
            count
        );
        self.metrics.set_runtime(elapsed);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test(start_paused = true)]
    async fn test_sets_runtime_gauge_every_interval() {
        let counter = MessageCounter::new();
        let metrics = Arc::new(MetricsRegistry::new());
        let cancel = CancellationToken::new();

        let job = StatsJob::new(Instant::now(), counter.clone(), metrics.clone());
        let handle = tokio::spawn(job.run(cancel.clone()));

        tokio::time::sleep(Duration::from_millis(4_900)).await;
        assert_eq!(metrics.runtime_seconds(), 0.0);

        tokio::time::sleep(Duration::from_millis(200)).await;
        assert_eq!(metrics.runtime_seconds(), 5.0);

        tokio::time::sleep(Duration::from_secs(5)).await;
        assert_eq!(metrics.runtime_seconds(), 10.0);

        cancel.cancel();
        handle.await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn test_elapsed_counts_from_given_start() {
        let started = Instant::now();
        tokio::time::sleep(Duration::from_secs(2)).await;

        let metrics = Arc::new(MetricsRegistry::new());
        let cancel = CancellationToken::new();
        let job = StatsJob::new(started, MessageCounter::new(), metrics.clone());
        let handle = tokio::spawn(job.run(cancel.clone()));

        tokio::time::sleep(Duration::from_millis(5_100)).await;
        assert_eq!(metrics.runtime_seconds(), 7.0);

        cancel.cancel();
        handle.await.unwrap();
    }

    #[tokio::test]
    async fn test_stops_on_cancel() {
        let cancel = CancellationToken::new();
        let job = StatsJob::new(
            Instant::now(),
            MessageCounter::new(),
            Arc::new(MetricsRegistry::new()),
        );
        let handle = tokio::spawn(job.run(cancel.clone()));

        cancel.cancel();
        // Cancelling twice is harmless
        cancel.cancel();

        tokio::time::timeout(Duration::from_secs(1), handle)
            .await
            .expect("stats job should stop promptly")
            .unwrap();
    }
}
