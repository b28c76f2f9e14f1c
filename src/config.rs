//! Watchdog configuration.
//!
//! `WatchConfig` is built once at startup through a validating builder and
//! stays immutable for the lifetime of the engine.

use std::path::PathBuf;
use std::time::Duration;

use crate::error::{Result, WatchError};

/// Validated configuration for one watchdog run.
#[derive(Debug, Clone)]
pub struct WatchConfig {
    /// Polling cadence.
    pub interval: Duration,
    /// CPU violation threshold in percent. Per-core scale: the value sysinfo
    /// reports for a process, which can exceed 100 on multi-core hosts, so
    /// thresholds above 100 are legal.
    pub cpu_threshold: f32,
    /// Memory violation threshold in percent of total system memory (0-100).
    pub mem_threshold: f32,
    /// Optional exact-match process name filter. When set, processes with a
    /// different name are excluded from evaluation entirely.
    pub process_name: Option<String>,
    /// Alert record destination. `None` means stdout only.
    pub log_file: Option<PathBuf>,
    /// How often an unchanged ongoing violation is re-emitted as CONTINUING.
    /// Zero disables re-emission.
    pub heartbeat: Duration,
    /// Consecutive failed log writes tolerated before shutting down.
    pub max_write_failures: u32,
    /// Consecutive failed process enumerations tolerated before shutting down.
    pub max_snapshot_failures: u32,
    /// Emit records as JSON lines instead of plain text.
    pub json: bool,
}

impl WatchConfig {
    pub fn builder() -> WatchConfigBuilder {
        WatchConfigBuilder::default()
    }

    /// Whether a process name passes the configured filter.
    pub fn matches_filter(&self, name: &str) -> bool {
        match &self.process_name {
            Some(filter) => filter == name,
            None => true,
        }
    }

    fn validate(&self) -> Result<()> {
        if self.interval < Duration::from_secs(1) {
            return Err(WatchError::invalid_config(
                "interval must be at least 1 second",
            ));
        }
        if !self.cpu_threshold.is_finite() || self.cpu_threshold < 0.0 {
            return Err(WatchError::invalid_config(
                "cpu threshold must be a non-negative number",
            ));
        }
        if !self.mem_threshold.is_finite()
            || self.mem_threshold < 0.0
            || self.mem_threshold > 100.0
        {
            return Err(WatchError::invalid_config(
                "memory threshold must be between 0 and 100",
            ));
        }
        if let Some(name) = &self.process_name {
            if name.is_empty() {
                return Err(WatchError::invalid_config(
                    "process name filter cannot be empty",
                ));
            }
        }
        if self.max_write_failures == 0 {
            return Err(WatchError::invalid_config(
                "write failure budget must be at least 1",
            ));
        }
        if self.max_snapshot_failures == 0 {
            return Err(WatchError::invalid_config(
                "snapshot failure budget must be at least 1",
            ));
        }
        Ok(())
    }
}

/// Builder for [`WatchConfig`]; `build()` validates the result.
#[derive(Debug, Clone)]
pub struct WatchConfigBuilder {
    interval: Duration,
    cpu_threshold: f32,
    mem_threshold: f32,
    process_name: Option<String>,
    log_file: Option<PathBuf>,
    heartbeat: Duration,
    max_write_failures: u32,
    max_snapshot_failures: u32,
    json: bool,
}

impl Default for WatchConfigBuilder {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(5),
            cpu_threshold: 80.0,
            mem_threshold: 80.0,
            process_name: None,
            log_file: None,
            heartbeat: Duration::from_secs(60),
            max_write_failures: 5,
            max_snapshot_failures: 5,
            json: false,
        }
    }
}

impl WatchConfigBuilder {
    pub fn interval_secs(mut self, secs: u64) -> Self {
        self.interval = Duration::from_secs(secs);
        self
    }

    pub fn cpu_threshold(mut self, percent: f32) -> Self {
        self.cpu_threshold = percent;
        self
    }

    pub fn mem_threshold(mut self, percent: f32) -> Self {
        self.mem_threshold = percent;
        self
    }

    pub fn process_name(mut self, name: Option<String>) -> Self {
        self.process_name = name;
        self
    }

    pub fn log_file(mut self, path: Option<PathBuf>) -> Self {
        self.log_file = path;
        self
    }

    pub fn heartbeat_secs(mut self, secs: u64) -> Self {
        self.heartbeat = Duration::from_secs(secs);
        self
    }

    pub fn max_write_failures(mut self, budget: u32) -> Self {
        self.max_write_failures = budget;
        self
    }

    pub fn max_snapshot_failures(mut self, budget: u32) -> Self {
        self.max_snapshot_failures = budget;
        self
    }

    pub fn json(mut self, json: bool) -> Self {
        self.json = json;
        self
    }

    pub fn build(self) -> Result<WatchConfig> {
        let config = WatchConfig {
            interval: self.interval,
            cpu_threshold: self.cpu_threshold,
            mem_threshold: self.mem_threshold,
            process_name: self.process_name,
            log_file: self.log_file,
            heartbeat: self.heartbeat,
            max_write_failures: self.max_write_failures,
            max_snapshot_failures: self.max_snapshot_failures,
            json: self.json,
        };
        config.validate()?;
        Ok(config)
    }
}
