//! Scenario tests driving the full tick pipeline with scripted snapshots.

use std::collections::VecDeque;
use std::io;
use std::path::PathBuf;

use chrono::{DateTime, TimeZone, Utc};
use procwatch::{ProcessSample, ProcessSource, WatchConfig, WatchEngine};

/// Replays a fixed sequence of snapshot results, one per tick.
struct ScriptedSource {
    ticks: VecDeque<io::Result<Vec<ProcessSample>>>,
}

impl ScriptedSource {
    fn new(ticks: Vec<io::Result<Vec<ProcessSample>>>) -> Self {
        Self {
            ticks: ticks.into(),
        }
    }
}

impl ProcessSource for ScriptedSource {
    fn snapshot(&mut self) -> io::Result<Vec<ProcessSample>> {
        self.ticks
            .pop_front()
            .unwrap_or_else(|| Ok(Vec::new()))
    }
}

fn sample(pid: u32, name: &str, cpu: f32, mem: f32) -> ProcessSample {
    ProcessSample {
        pid,
        name: name.to_string(),
        cpu_percent: cpu,
        mem_percent: mem,
    }
}

fn at(secs: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 8, 6, 12, 0, 0).unwrap() + chrono::Duration::seconds(secs as i64)
}

fn enum_error() -> io::Result<Vec<ProcessSample>> {
    Err(io::Error::new(
        io::ErrorKind::PermissionDenied,
        "enumeration denied",
    ))
}

/// Engine writing to a log file inside `dir`; returns the engine and path.
fn engine_with(
    dir: &tempfile::TempDir,
    config: procwatch::WatchConfigBuilder,
    ticks: Vec<io::Result<Vec<ProcessSample>>>,
) -> (WatchEngine<ScriptedSource>, PathBuf) {
    let path = dir.path().join("alerts.log");
    let config: WatchConfig = config.log_file(Some(path.clone())).build().unwrap();
    let engine = WatchEngine::with_source(config, ScriptedSource::new(ticks)).unwrap();
    (engine, path)
}

fn logged_lines(path: &PathBuf) -> Vec<String> {
    std::fs::read_to_string(path)
        .unwrap_or_default()
        .lines()
        .map(str::to_string)
        .collect()
}

#[test]
fn test_spike_then_recovery() {
    let dir = tempfile::tempdir().unwrap();
    let (mut engine, path) = engine_with(
        &dir,
        WatchConfig::builder().cpu_threshold(50.0),
        vec![
            Ok(vec![sample(1, "x", 60.0, 10.0)]),
            Ok(vec![sample(1, "x", 40.0, 10.0)]),
        ],
    );

    engine.tick(at(0)).unwrap();
    engine.tick(at(1)).unwrap();

    let lines = logged_lines(&path);
    assert_eq!(lines.len(), 2);
    assert!(lines[0].contains("[NEW]"));
    assert!(lines[0].contains("pid=1"));
    assert!(lines[0].contains("name=x"));
    assert!(lines[0].contains("kind=CPU"));
    assert!(lines[0].contains("cpu=60.00%"));
    assert!(lines[1].contains("[RECOVERY]"));
    assert!(lines[1].contains("pid=1"));
    assert_eq!(engine.active_violations(), 0);
}

#[test]
fn test_steady_violation_emits_single_new() {
    let dir = tempfile::tempdir().unwrap();
    let ticks: Vec<_> = (0..6)
        .map(|_| Ok(vec![sample(1, "x", 90.0, 10.0)]))
        .collect();
    let (mut engine, path) = engine_with(&dir, WatchConfig::builder(), ticks);

    // Six ticks, one second apart, far inside the 60s heartbeat.
    for tick in 0..6 {
        engine.tick(at(tick)).unwrap();
    }

    let lines = logged_lines(&path);
    assert_eq!(lines.len(), 1);
    assert!(lines[0].contains("[NEW]"));
    assert_eq!(engine.active_violations(), 1);
}

#[test]
fn test_heartbeat_reemits_continuing() {
    let dir = tempfile::tempdir().unwrap();
    let ticks: Vec<_> = (0..5)
        .map(|_| Ok(vec![sample(1, "x", 90.0, 10.0)]))
        .collect();
    let (mut engine, path) = engine_with(
        &dir,
        WatchConfig::builder().heartbeat_secs(10),
        ticks,
    );

    for tick in [0u32, 5, 10, 15, 20] {
        engine.tick(at(tick)).unwrap();
    }

    let lines = logged_lines(&path);
    // NEW at t=0, CONTINUING at t=10 and t=20.
    assert_eq!(lines.len(), 3);
    assert!(lines[0].contains("[NEW]"));
    assert!(lines[1].contains("[CONTINUING]"));
    assert!(lines[2].contains("[CONTINUING]"));
}

#[test]
fn test_name_filter_scopes_alerts() {
    let dir = tempfile::tempdir().unwrap();
    let (mut engine, path) = engine_with(
        &dir,
        WatchConfig::builder().process_name(Some("nginx".to_string())),
        vec![Ok(vec![
            sample(1, "nginx", 90.0, 10.0),
            sample(2, "bash", 95.0, 10.0),
        ])],
    );

    engine.tick(at(0)).unwrap();

    let lines = logged_lines(&path);
    assert_eq!(lines.len(), 1);
    assert!(lines[0].contains("name=nginx"));
    assert!(!lines.iter().any(|l| l.contains("bash")));
}

#[test]
fn test_vanished_process_recovers() {
    let dir = tempfile::tempdir().unwrap();
    let (mut engine, path) = engine_with(
        &dir,
        WatchConfig::builder(),
        vec![
            Ok(vec![sample(1, "x", 90.0, 10.0), sample(2, "y", 1.0, 1.0)]),
            Ok(vec![sample(2, "y", 1.0, 1.0)]),
        ],
    );

    engine.tick(at(0)).unwrap();
    assert_eq!(engine.active_violations(), 1);
    engine.tick(at(1)).unwrap();

    let lines = logged_lines(&path);
    assert_eq!(lines.len(), 2);
    assert!(lines[1].contains("[RECOVERY]"));
    assert!(lines[1].contains("pid=1"));
    assert_eq!(engine.active_violations(), 0);
}

#[test]
fn test_kind_escalation_emits_continuing() {
    let dir = tempfile::tempdir().unwrap();
    let (mut engine, path) = engine_with(
        &dir,
        WatchConfig::builder(),
        vec![
            Ok(vec![sample(1, "x", 90.0, 10.0)]),
            Ok(vec![sample(1, "x", 90.0, 85.0)]),
        ],
    );

    engine.tick(at(0)).unwrap();
    engine.tick(at(1)).unwrap();

    let lines = logged_lines(&path);
    assert_eq!(lines.len(), 2);
    assert!(lines[0].contains("kind=CPU"));
    assert!(lines[1].contains("[CONTINUING]"));
    assert!(lines[1].contains("kind=CPU,MEM"));
}

#[test]
fn test_enumeration_failure_skips_tick_and_preserves_state() {
    let dir = tempfile::tempdir().unwrap();
    let (mut engine, path) = engine_with(
        &dir,
        WatchConfig::builder(),
        vec![
            Ok(vec![sample(1, "x", 90.0, 10.0)]),
            enum_error(),
            Ok(vec![sample(1, "x", 90.0, 10.0)]),
        ],
    );

    engine.tick(at(0)).unwrap();
    // Failed tick: no records, no recoveries, state intact.
    engine.tick(at(1)).unwrap();
    assert_eq!(engine.active_violations(), 1);
    engine.tick(at(2)).unwrap();

    let lines = logged_lines(&path);
    assert_eq!(lines.len(), 1);
    assert!(lines[0].contains("[NEW]"));
}

#[test]
fn test_enumeration_failure_budget_is_fatal() {
    let dir = tempfile::tempdir().unwrap();
    let (mut engine, _path) = engine_with(
        &dir,
        WatchConfig::builder().max_snapshot_failures(2),
        vec![enum_error(), enum_error()],
    );

    assert!(engine.tick(at(0)).is_ok());
    assert!(engine.tick(at(1)).is_err());
}

#[test]
fn test_snapshot_success_resets_failure_budget() {
    let dir = tempfile::tempdir().unwrap();
    let (mut engine, _path) = engine_with(
        &dir,
        WatchConfig::builder().max_snapshot_failures(2),
        vec![enum_error(), Ok(Vec::new()), enum_error()],
    );

    assert!(engine.tick(at(0)).is_ok());
    assert!(engine.tick(at(1)).is_ok());
    // The counter restarted, so one more failure is still under budget.
    assert!(engine.tick(at(2)).is_ok());
}

#[test]
fn test_json_records() {
    let dir = tempfile::tempdir().unwrap();
    let (mut engine, path) = engine_with(
        &dir,
        WatchConfig::builder().json(true),
        vec![Ok(vec![sample(1, "x", 90.0, 85.0)])],
    );

    engine.tick(at(0)).unwrap();

    let lines = logged_lines(&path);
    assert_eq!(lines.len(), 1);
    let value: serde_json::Value = serde_json::from_str(&lines[0]).unwrap();
    assert_eq!(value["transition"], "NEW");
    assert_eq!(value["pid"], 1);
    assert_eq!(value["kind"], "CPU,MEM");
}

#[test]
fn test_equal_metrics_do_not_alert() {
    let dir = tempfile::tempdir().unwrap();
    let (mut engine, path) = engine_with(
        &dir,
        WatchConfig::builder(),
        vec![Ok(vec![sample(1, "x", 80.0, 80.0)])],
    );

    engine.tick(at(0)).unwrap();

    assert!(logged_lines(&path).is_empty());
    assert_eq!(engine.active_violations(), 0);
}
