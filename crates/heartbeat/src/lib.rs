//! Heartbeat - a small long-running service
//!
//! Prints a configurable message on a fixed tick, logs runtime statistics,
//! and exposes Prometheus metrics plus a liveness probe until it receives
//! SIGINT or SIGTERM.
//!
//! # Components
//!
//! - **Config**: flags > `HEARTBEAT_*` environment > YAML file > defaults
//! - **MessageJob**: prints the message and bumps the shared counter
//! - **StatsJob**: logs elapsed time and the counter every 5 seconds
//! - **HttpServer**: `/metrics` and `/healthz`, each on its own port
//! - **Supervisor**: spawns the above, cancels them on signal and joins them

pub mod config;
pub mod health;
pub mod http_server;
pub mod message_job;
pub mod metrics;
pub mod signal;
pub mod stats_job;
pub mod supervisor;
pub mod types;

pub use config::{Config, ConfigError, ConfigLoader};
pub use http_server::{HttpServer, ServerError};
pub use metrics::MetricsRegistry;
pub use supervisor::Supervisor;
pub use types::{MessageCounter, Summary};
