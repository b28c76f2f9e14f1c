use clap::Parser;
use procwatch::{Result, WatchConfig, WatchEngine, WatchError};
use std::path::PathBuf;
use std::process::exit;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Host-level process watchdog: alerts when processes exceed CPU or memory
/// thresholds.
#[derive(Parser, Debug)]
#[clap(author, version, about, long_about = None)]
struct Args {
    /// Polling interval in seconds
    #[clap(long, value_name = "SECONDS", default_value = "5")]
    interval: u64,

    /// CPU usage threshold in percent (per-core scale; may exceed 100 on
    /// multi-core hosts)
    #[clap(long = "cpu_threshold", value_name = "PERCENT", default_value = "80")]
    cpu_threshold: f32,

    /// Memory usage threshold in percent of total system memory
    #[clap(long = "mem_threshold", value_name = "PERCENT", default_value = "80")]
    mem_threshold: f32,

    /// Only monitor processes with this exact name
    #[clap(long = "process_name", value_name = "NAME")]
    process_name: Option<String>,

    /// Append alert records to this file in addition to stdout
    #[clap(long = "log_file", value_name = "PATH")]
    log_file: Option<PathBuf>,

    /// Re-emit an ongoing violation every N seconds (0 disables)
    #[clap(long, value_name = "SECONDS", default_value = "60")]
    heartbeat: u64,

    /// Shut down after this many consecutive failed log writes
    #[clap(long = "max_write_failures", value_name = "N", default_value = "5")]
    max_write_failures: u32,

    /// Emit records as JSON lines instead of plain text
    #[clap(long)]
    json: bool,
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();
    if let Err(err) = run(args) {
        // Fatal errors always reach stderr, whatever the log configuration.
        eprintln!("fatal: {err}");
        exit(1);
    }
}

fn run(args: Args) -> Result<()> {
    let config = WatchConfig::builder()
        .interval_secs(args.interval)
        .cpu_threshold(args.cpu_threshold)
        .mem_threshold(args.mem_threshold)
        .process_name(args.process_name)
        .log_file(args.log_file)
        .heartbeat_secs(args.heartbeat)
        .max_write_failures(args.max_write_failures)
        .json(args.json)
        .build()?;

    let shutdown = Arc::new(AtomicBool::new(false));
    let flag = Arc::clone(&shutdown);
    ctrlc::set_handler(move || {
        flag.store(true, Ordering::SeqCst);
        println!("\nReceived Ctrl-C, finishing...");
    })
    .map_err(|err| WatchError::SignalHandler(err.to_string()))?;

    let mut engine = WatchEngine::new(config)?;
    engine.run(&shutdown)
}
