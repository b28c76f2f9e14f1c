//! Threshold evaluation.

use std::fmt;

use serde::{Serialize, Serializer};

use crate::config::WatchConfig;
use crate::snapshot::ProcessSample;

/// The set of thresholds a process is currently violating.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ViolationSet {
    pub cpu: bool,
    pub mem: bool,
}

impl ViolationSet {
    pub const CPU: ViolationSet = ViolationSet { cpu: true, mem: false };
    pub const MEM: ViolationSet = ViolationSet { cpu: false, mem: true };
    pub const BOTH: ViolationSet = ViolationSet { cpu: true, mem: true };

    pub fn is_empty(&self) -> bool {
        !self.cpu && !self.mem
    }
}

impl fmt::Display for ViolationSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (self.cpu, self.mem) {
            (true, true) => write!(f, "CPU,MEM"),
            (true, false) => write!(f, "CPU"),
            (false, true) => write!(f, "MEM"),
            (false, false) => write!(f, "NONE"),
        }
    }
}

impl Serialize for ViolationSet {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// Evaluate one sample against the configured thresholds.
///
/// Comparison is strict greater-than: a metric exactly equal to its
/// threshold does not violate. The name filter is applied by the engine
/// before this point, never here.
pub fn evaluate(sample: &ProcessSample, config: &WatchConfig) -> ViolationSet {
    ViolationSet {
        cpu: sample.cpu_percent > config.cpu_threshold,
        mem: sample.mem_percent > config.mem_threshold,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::WatchConfig;

    fn sample(cpu: f32, mem: f32) -> ProcessSample {
        ProcessSample {
            pid: 42,
            name: "worker".to_string(),
            cpu_percent: cpu,
            mem_percent: mem,
        }
    }

    fn config(cpu: f32, mem: f32) -> WatchConfig {
        WatchConfig::builder()
            .cpu_threshold(cpu)
            .mem_threshold(mem)
            .build()
            .unwrap()
    }

    #[test]
    fn test_over_threshold_violates() {
        let config = config(80.0, 80.0);
        assert_eq!(evaluate(&sample(80.1, 10.0), &config), ViolationSet::CPU);
        assert_eq!(evaluate(&sample(10.0, 80.1), &config), ViolationSet::MEM);
        assert_eq!(evaluate(&sample(99.0, 99.0), &config), ViolationSet::BOTH);
    }

    #[test]
    fn test_equality_does_not_violate() {
        let config = config(80.0, 80.0);
        assert!(evaluate(&sample(80.0, 80.0), &config).is_empty());
    }

    #[test]
    fn test_under_threshold_is_clean() {
        let config = config(80.0, 80.0);
        assert!(evaluate(&sample(0.0, 0.0), &config).is_empty());
        assert!(evaluate(&sample(79.9, 79.9), &config).is_empty());
    }

    #[test]
    fn test_display_labels() {
        assert_eq!(ViolationSet::CPU.to_string(), "CPU");
        assert_eq!(ViolationSet::MEM.to_string(), "MEM");
        assert_eq!(ViolationSet::BOTH.to_string(), "CPU,MEM");
        assert_eq!(ViolationSet::default().to_string(), "NONE");
    }

    #[test]
    fn test_serializes_as_label() {
        let json = serde_json::to_string(&ViolationSet::BOTH).unwrap();
        assert_eq!(json, "\"CPU,MEM\"");
    }
}
