//! Heartbeat binary

use common::LogFormat;
use heartbeat::{Config, ConfigError, Supervisor};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // The loader logs, so tracing comes up before the config is read
    common::logging::init(LogFormat::from_env());

    let config = match Config::load() {
        Ok(cfg) => cfg,
        // --help and --version
        Err(ConfigError::Args(e)) if !e.use_stderr() => e.exit(),
        Err(e) => {
            tracing::error!(error = %e, "Error loading configuration");
            return Err(common::Error::config(e).into());
        }
    };

    tracing::info!(
        tick_interval = ?config.tick_interval,
        message = %config.message,
        metrics_port = %config.metrics_port,
        health_port = %config.health_port,
        "Configuration loaded"
    );

    Supervisor::new(config).run().await?;

    Ok(())
}
