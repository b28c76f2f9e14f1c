//! procwatch: a lightweight host-level process watchdog.
//!
//! Snapshots the OS process table on a fixed cadence, evaluates each
//! process's CPU and memory usage against configured thresholds, and emits
//! alert records on state transitions (NEW / CONTINUING / RECOVERY) instead
//! of flooding the log every tick.

pub mod config;
pub mod engine;
pub mod error;
pub mod reporter;
pub mod snapshot;
pub mod threshold;
pub mod tracker;

// Re-export the engine and related types for use in tests and binaries
pub use config::{WatchConfig, WatchConfigBuilder};
pub use engine::WatchEngine;
pub use error::{Result, WatchError};
pub use reporter::Reporter;
pub use snapshot::{ProcessSample, ProcessSource, SystemSource};
pub use threshold::{evaluate, ViolationSet};
pub use tracker::{AlertRecord, AlertTracker, Transition};
