//! Process supervisor: spawns every background task, owns the cancellation
//! token, and waits for all tasks to finish before reporting totals.

use crate::config::Config;
use crate::http_server::HttpServer;
use crate::message_job::MessageJob;
use crate::metrics::MetricsRegistry;
use crate::signal::ShutdownSignal;
use crate::stats_job::StatsJob;
use crate::types::{MessageCounter, Summary};
use std::future::Future;
use std::sync::Arc;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;
use tracing::{error, info};

/// Heartbeat supervisor
pub struct Supervisor {
    config: Config,
    cancel: CancellationToken,
}

impl Supervisor {
    /// Create a new supervisor
    pub fn new(config: Config) -> Self {
        Self {
            config,
            cancel: CancellationToken::new(),
        }
    }

    /// Handle that requests shutdown when cancelled. Cancelling more than
    /// once has no further effect.
    pub fn shutdown_handle(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Run until SIGINT or SIGTERM arrives
    pub async fn run(self) -> common::Result<Summary> {
        let mut signals = ShutdownSignal::register()?;
        Ok(self.run_until(async move { signals.recv().await }).await)
    }

    /// Run until `shutdown` completes or the shutdown handle is cancelled
    pub async fn run_until<F>(self, shutdown: F) -> Summary
    where
        F: Future<Output = ()>,
    {
        let started = Instant::now();
        let counter = MessageCounter::new();
        let metrics = Arc::new(MetricsRegistry::new());
        let tracker = TaskTracker::new();

        let metrics_server = HttpServer::metrics(metrics.clone(), self.config.metrics_addr());
        tracker.spawn(run_server(metrics_server, self.cancel.clone()));

        let health_server = HttpServer::health(self.config.health_addr());
        tracker.spawn(run_server(health_server, self.cancel.clone()));

        info!("App started. Press Ctrl+C to exit.");

        let message_job = MessageJob::new(
            self.config.message.clone(),
            self.config.tick_interval,
            counter.clone(),
            metrics.clone(),
        );
        tracker.spawn(message_job.run(self.cancel.clone()));

        let stats_job = StatsJob::new(started, counter.clone(), metrics.clone());
        tracker.spawn(stats_job.run(self.cancel.clone()));

        tracker.close();

        tokio::select! {
            _ = shutdown => {
                info!("Termination signal received. Shutting down...");
            }
            _ = self.cancel.cancelled() => {
                info!("Shutdown requested. Shutting down...");
            }
        }

        self.cancel.cancel();
        tracker.wait().await;

        let summary = Summary {
            messages: counter.get(),
            elapsed: started.elapsed(),
        };

        info!(
            messages = summary.messages,
            elapsed_secs = summary.elapsed.as_secs_f64(),
            "Total messages printed: {} | Total runtime: {:.2}s",
            summary.messages,
            summary.elapsed.as_secs_f64()
        );
        info!("Goodbye!");

        summary
    }
}

/// Run a server, logging instead of propagating its failure
async fn run_server(server: HttpServer, cancel: CancellationToken) {
    let name = server.name();
    let addr = server.listen_addr().to_string();

    if let Err(e) = server.run(cancel).await {
        error!(server = name, addr = %addr, error = %e, "{} server error", name);
    }
}
