//! Error types for the watchdog engine.

use std::io;
use thiserror::Error;

/// Errors that terminate the watchdog (startup validation failures and
/// exhausted runtime failure budgets). Transient conditions are handled
/// locally and never surface as a `WatchError`.
#[derive(Error, Debug)]
pub enum WatchError {
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("failed to encode alert record: {0}")]
    Encode(#[from] serde_json::Error),

    #[error("failed to install signal handler: {0}")]
    SignalHandler(String),

    #[error("process enumeration failed {consecutive} consecutive times: {source}")]
    SnapshotFailed { consecutive: u32, source: io::Error },

    #[error("log sink failed {consecutive} consecutive writes: {source}")]
    SinkFailed { consecutive: u32, source: io::Error },
}

/// Result type alias used across the crate.
pub type Result<T> = std::result::Result<T, WatchError>;

impl WatchError {
    /// Create an invalid-configuration error
    pub fn invalid_config<S: Into<String>>(msg: S) -> Self {
        WatchError::InvalidConfig(msg.into())
    }
}
