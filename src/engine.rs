//! The scheduler loop.
//!
//! `WatchEngine` owns the snapshot source, the alert tracker and the
//! reporter, and drives the per-tick pipeline on a fixed cadence until a
//! shutdown flag is raised.

use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use log::{info, warn};

use crate::config::WatchConfig;
use crate::error::{Result, WatchError};
use crate::reporter::Reporter;
use crate::snapshot::{ProcessSource, SystemSource};
use crate::threshold::evaluate;
use crate::tracker::AlertTracker;

// Granularity of the inter-tick sleep, so a shutdown request is noticed
// promptly even with long polling intervals.
const SHUTDOWN_POLL: Duration = Duration::from_millis(200);

pub struct WatchEngine<S: ProcessSource> {
    config: WatchConfig,
    source: S,
    tracker: AlertTracker,
    reporter: Reporter,
    snapshot_failures: u32,
}

impl WatchEngine<SystemSource> {
    /// Build an engine over the live process table.
    pub fn new(config: WatchConfig) -> Result<Self> {
        Self::with_source(config, SystemSource::new())
    }
}

impl<S: ProcessSource> WatchEngine<S> {
    /// Build an engine over an arbitrary snapshot source. Tests use this
    /// with a scripted source to replay exact per-tick process tables.
    pub fn with_source(config: WatchConfig, source: S) -> Result<Self> {
        let reporter = Reporter::from_config(&config)?;
        let tracker = AlertTracker::new(config.heartbeat);
        Ok(Self {
            config,
            source,
            tracker,
            reporter,
            snapshot_failures: 0,
        })
    }

    /// Number of currently open violation episodes.
    pub fn active_violations(&self) -> usize {
        self.tracker.active_count()
    }

    /// Run one tick of the pipeline: snapshot, evaluate, track, report.
    ///
    /// A failed enumeration skips the tick (tracked state is left untouched)
    /// and only becomes fatal after the configured number of consecutive
    /// failures.
    pub fn tick(&mut self, now: DateTime<Utc>) -> Result<()> {
        let samples = match self.source.snapshot() {
            Ok(samples) => {
                self.snapshot_failures = 0;
                samples
            }
            Err(err) => {
                self.snapshot_failures += 1;
                if self.snapshot_failures >= self.config.max_snapshot_failures {
                    return Err(WatchError::SnapshotFailed {
                        consecutive: self.snapshot_failures,
                        source: err,
                    });
                }
                warn!(
                    "process enumeration failed ({} of {} consecutive), skipping tick: {err}",
                    self.snapshot_failures, self.config.max_snapshot_failures
                );
                return Ok(());
            }
        };

        let mut records = Vec::new();
        for sample in &samples {
            if !self.config.matches_filter(&sample.name) {
                continue;
            }
            let kinds = evaluate(sample, &self.config);
            records.extend(self.tracker.observe(sample, kinds, now));
        }
        records.extend(self.tracker.sweep(now));

        for record in &records {
            self.reporter.emit(record)?;
        }
        Ok(())
    }

    /// Run until the shutdown flag is raised or a fatal error occurs.
    ///
    /// Each tick sleeps `max(0, interval - elapsed)` before the next; an
    /// overrunning tick rolls straight into the next one with a warning.
    /// Ticks never overlap.
    pub fn run(&mut self, shutdown: &AtomicBool) -> Result<()> {
        match &self.config.process_name {
            Some(name) => info!(
                "watching processes named {name:?} every {:?} (cpu > {:.1}%, mem > {:.1}%)",
                self.config.interval, self.config.cpu_threshold, self.config.mem_threshold
            ),
            None => info!(
                "watching all processes every {:?} (cpu > {:.1}%, mem > {:.1}%)",
                self.config.interval, self.config.cpu_threshold, self.config.mem_threshold
            ),
        }

        while !shutdown.load(Ordering::SeqCst) {
            let started = Instant::now();
            self.tick(Utc::now())?;

            let elapsed = started.elapsed();
            if elapsed >= self.config.interval {
                warn!(
                    "tick took {elapsed:?}, longer than the {:?} interval",
                    self.config.interval
                );
                continue;
            }

            let mut remaining = self.config.interval - elapsed;
            while !remaining.is_zero() && !shutdown.load(Ordering::SeqCst) {
                let slice = remaining.min(SHUTDOWN_POLL);
                thread::sleep(slice);
                remaining -= slice;
            }
        }

        // Processes still in violation may well outlive the watchdog; their
        // episodes are left open rather than forced to RECOVERY.
        info!(
            "shutting down with {} violation episode(s) still open",
            self.tracker.active_count()
        );
        self.reporter.close()?;
        Ok(())
    }
}
