//! Process-level error type for Heartbeat.

use std::fmt;

/// A specialized Result type for Heartbeat operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that stop the process before or while it runs.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl Error {
    /// Create a new configuration error.
    pub fn config(msg: impl fmt::Display) -> Self {
        Error::Config(msg.to_string())
    }
}
