//! Process table snapshots.
//!
//! `ProcessSource` abstracts the per-tick OS query so the engine can be
//! driven by a scripted source in tests. The real implementation,
//! `SystemSource`, is backed by sysinfo and refreshes only the CPU and
//! memory data it needs.

use std::io;

use sysinfo::{ProcessRefreshKind, ProcessesToUpdate, System};

/// One process observed in a snapshot, with its instantaneous metrics.
#[derive(Debug, Clone, PartialEq)]
pub struct ProcessSample {
    pub pid: u32,
    pub name: String,
    /// Per-core scale: 0-100 per core, so up to 100 x core count.
    pub cpu_percent: f32,
    /// Fraction of total system memory, 0-100.
    pub mem_percent: f32,
}

/// Read-only source of process snapshots, queried once per tick.
pub trait ProcessSource {
    /// Returns the current process table. A process whose metrics cannot be
    /// read mid-query (it may have exited between enumeration and the metric
    /// read) is omitted from the result, not reported as an error. An `Err`
    /// means enumeration itself failed for this tick.
    fn snapshot(&mut self) -> io::Result<Vec<ProcessSample>>;
}

/// Live snapshot source backed by sysinfo.
///
/// The `System` handle is kept across ticks: sysinfo computes CPU usage from
/// the delta between consecutive refreshes, so a fresh handle would report
/// zero for every process.
pub struct SystemSource {
    sys: System,
}

impl SystemSource {
    pub fn new() -> Self {
        let mut sys = System::new_all();
        // Priming refresh: establishes the CPU baseline so the first tick
        // reports real usage deltas instead of zeros.
        sys.refresh_processes_specifics(
            ProcessesToUpdate::All,
            true,
            ProcessRefreshKind::nothing().with_cpu().with_memory(),
        );
        Self { sys }
    }
}

impl Default for SystemSource {
    fn default() -> Self {
        Self::new()
    }
}

impl ProcessSource for SystemSource {
    fn snapshot(&mut self) -> io::Result<Vec<ProcessSample>> {
        self.sys.refresh_processes_specifics(
            ProcessesToUpdate::All,
            true,
            ProcessRefreshKind::nothing().with_cpu().with_memory(),
        );

        let total_memory = self.sys.total_memory();
        let mut samples: Vec<ProcessSample> = self
            .sys
            .processes()
            .iter()
            .map(|(pid, process)| ProcessSample {
                pid: pid.as_u32(),
                name: process.name().to_string_lossy().into_owned(),
                cpu_percent: process.cpu_usage(),
                mem_percent: if total_memory == 0 {
                    0.0
                } else {
                    (process.memory() as f64 * 100.0 / total_memory as f64) as f32
                },
            })
            .collect();

        // There is always at least the watchdog itself; an empty table means
        // the enumeration failed at the OS level.
        if samples.is_empty() {
            return Err(io::Error::other("process table came back empty"));
        }

        samples.sort_unstable_by_key(|s| s.pid);
        Ok(samples)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_snapshot_includes_current_process() {
        let mut source = SystemSource::new();
        let samples = source.snapshot().unwrap();

        let own_pid = std::process::id();
        let me = samples.iter().find(|s| s.pid == own_pid);
        assert!(me.is_some(), "snapshot should contain the test process");
    }

    #[test]
    fn test_snapshot_metrics_in_range() {
        let mut source = SystemSource::new();
        let samples = source.snapshot().unwrap();

        assert!(!samples.is_empty());
        for sample in &samples {
            assert!(sample.mem_percent >= 0.0 && sample.mem_percent <= 100.0);
            assert!(sample.cpu_percent >= 0.0);
        }
    }

    #[test]
    fn test_snapshot_sorted_by_pid() {
        let mut source = SystemSource::new();
        let samples = source.snapshot().unwrap();

        for window in samples.windows(2) {
            assert!(window[0].pid < window[1].pid);
        }
    }
}
