//! Per-process alert state tracking.
//!
//! Converts the per-tick violation sets produced by the evaluator into a
//! stream of state-transition records, so an episode spanning many ticks
//! emits one NEW, one RECOVERY, and CONTINUING only when the violation kind
//! changes or the heartbeat interval elapses.

use std::collections::{HashMap, HashSet};
use std::fmt;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::snapshot::ProcessSample;
use crate::threshold::ViolationSet;

/// How an alert record relates to its violation episode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Transition {
    New,
    Continuing,
    Recovery,
}

impl fmt::Display for Transition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Transition::New => write!(f, "NEW"),
            Transition::Continuing => write!(f, "CONTINUING"),
            Transition::Recovery => write!(f, "RECOVERY"),
        }
    }
}

/// One emitted alert fact. Write-once; streamed to the reporter.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AlertRecord {
    pub timestamp: DateTime<Utc>,
    pub transition: Transition,
    pub pid: u32,
    pub name: String,
    pub kind: ViolationSet,
    pub cpu_percent: f32,
    pub mem_percent: f32,
}

/// Tracked state for one ongoing violation episode.
#[derive(Debug, Clone)]
struct ViolationState {
    name: String,
    kinds: ViolationSet,
    first_detected: DateTime<Utc>,
    last_emitted: DateTime<Utc>,
    // Metrics from the most recent violating tick, used for the RECOVERY
    // record when the process has already exited.
    last_cpu: f32,
    last_mem: f32,
}

/// Tracks violation episodes across ticks, keyed by process ID.
///
/// Owned by the scheduler loop and mutated only from its sequential
/// per-tick pass. Call [`observe`](AlertTracker::observe) for every
/// evaluated sample of a tick, then [`sweep`](AlertTracker::sweep) once to
/// close episodes whose process vanished from the snapshot.
pub struct AlertTracker {
    heartbeat: Duration,
    active: HashMap<u32, ViolationState>,
    seen: HashSet<u32>,
}

impl AlertTracker {
    pub fn new(heartbeat: Duration) -> Self {
        Self {
            heartbeat,
            active: HashMap::new(),
            seen: HashSet::new(),
        }
    }

    /// Number of currently open violation episodes.
    pub fn active_count(&self) -> usize {
        self.active.len()
    }

    /// When an episode for the given PID started, if one is open.
    pub fn episode_start(&self, pid: u32) -> Option<DateTime<Utc>> {
        self.active.get(&pid).map(|state| state.first_detected)
    }

    /// Feed one evaluated sample into the state machine. Returns the records
    /// to emit for it: usually zero or one, two when a PID reappears under a
    /// different name while its old episode is still open (the old identity
    /// recovers, the new one may open a fresh episode).
    pub fn observe(
        &mut self,
        sample: &ProcessSample,
        kinds: ViolationSet,
        now: DateTime<Utc>,
    ) -> Vec<AlertRecord> {
        self.seen.insert(sample.pid);
        let heartbeat = self.heartbeat;
        let mut records = Vec::new();

        if let Some(state) = self.active.get(&sample.pid) {
            if state.name != sample.name {
                // PID reused by a different process: the tracked one exited.
                records.push(Self::recovery_from_state(sample.pid, state, now));
                self.active.remove(&sample.pid);
            }
        }

        match self.active.get_mut(&sample.pid) {
            Some(state) if kinds.is_empty() => {
                // ACTIVE -> ABSENT: metrics dropped below threshold.
                records.push(AlertRecord {
                    timestamp: now,
                    transition: Transition::Recovery,
                    pid: sample.pid,
                    name: state.name.clone(),
                    kind: state.kinds,
                    cpu_percent: sample.cpu_percent,
                    mem_percent: sample.mem_percent,
                });
                self.active.remove(&sample.pid);
            }
            Some(state) => {
                // ACTIVE -> ACTIVE: re-emit only on kind change or heartbeat.
                state.last_cpu = sample.cpu_percent;
                state.last_mem = sample.mem_percent;
                let kind_changed = state.kinds != kinds;
                if kind_changed || Self::heartbeat_due(heartbeat, state.last_emitted, now) {
                    state.kinds = kinds;
                    state.last_emitted = now;
                    records.push(AlertRecord {
                        timestamp: now,
                        transition: Transition::Continuing,
                        pid: sample.pid,
                        name: state.name.clone(),
                        kind: kinds,
                        cpu_percent: sample.cpu_percent,
                        mem_percent: sample.mem_percent,
                    });
                }
            }
            None if !kinds.is_empty() => {
                // ABSENT -> ACTIVE: a new episode opens.
                self.active.insert(
                    sample.pid,
                    ViolationState {
                        name: sample.name.clone(),
                        kinds,
                        first_detected: now,
                        last_emitted: now,
                        last_cpu: sample.cpu_percent,
                        last_mem: sample.mem_percent,
                    },
                );
                records.push(AlertRecord {
                    timestamp: now,
                    transition: Transition::New,
                    pid: sample.pid,
                    name: sample.name.clone(),
                    kind: kinds,
                    cpu_percent: sample.cpu_percent,
                    mem_percent: sample.mem_percent,
                });
            }
            None => {}
        }

        records
    }

    /// Close episodes for every tracked PID that was not observed since the
    /// previous sweep (the process exited or was filtered away by a name
    /// change). Purges their state so the map cannot grow unbounded.
    pub fn sweep(&mut self, now: DateTime<Utc>) -> Vec<AlertRecord> {
        let vanished: Vec<u32> = self
            .active
            .keys()
            .copied()
            .filter(|pid| !self.seen.contains(pid))
            .collect();

        let mut records = Vec::with_capacity(vanished.len());
        for pid in vanished {
            if let Some(state) = self.active.remove(&pid) {
                records.push(Self::recovery_from_state(pid, &state, now));
            }
        }
        records.sort_unstable_by_key(|r| r.pid);

        self.seen.clear();
        records
    }

    fn heartbeat_due(heartbeat: Duration, last_emitted: DateTime<Utc>, now: DateTime<Utc>) -> bool {
        if heartbeat.is_zero() {
            return false;
        }
        now.signed_duration_since(last_emitted)
            .to_std()
            .is_ok_and(|elapsed| elapsed >= heartbeat)
    }

    fn recovery_from_state(pid: u32, state: &ViolationState, now: DateTime<Utc>) -> AlertRecord {
        AlertRecord {
            timestamp: now,
            transition: Transition::Recovery,
            pid,
            name: state.name.clone(),
            kind: state.kinds,
            cpu_percent: state.last_cpu,
            mem_percent: state.last_mem,
        }
    }
}
