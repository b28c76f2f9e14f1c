//! Alert record output.
//!
//! The reporter owns the log sink for the lifetime of the run: records are
//! rendered one per line, written with a flush after every line, and the
//! handle is flushed again on close and on drop. A single failed write is
//! non-fatal; a run of consecutive failures beyond the configured budget
//! shuts the watchdog down rather than letting it run blind.

use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::PathBuf;

use chrono::SecondsFormat;
use colored::Colorize;
use log::error;

use crate::config::WatchConfig;
use crate::error::{Result, WatchError};
use crate::tracker::{AlertRecord, Transition};

pub struct Reporter {
    sink: Option<File>,
    sink_path: Option<PathBuf>,
    json: bool,
    write_failures: u32,
    max_write_failures: u32,
}

impl Reporter {
    /// Open the configured log sink. Failing to open the file is a fatal
    /// startup error.
    pub fn from_config(config: &WatchConfig) -> Result<Self> {
        let sink = match &config.log_file {
            Some(path) => Some(
                OpenOptions::new()
                    .create(true)
                    .append(true)
                    .open(path)?,
            ),
            None => None,
        };

        Ok(Self {
            sink,
            sink_path: config.log_file.clone(),
            json: config.json,
            write_failures: 0,
            max_write_failures: config.max_write_failures,
        })
    }

    /// Render and emit one record to the console and, if configured, the log
    /// file. Returns an error only when the consecutive-write-failure budget
    /// is exhausted.
    pub fn emit(&mut self, record: &AlertRecord) -> Result<()> {
        let line = self.render(record)?;

        // Console first, so the record is visible even if the sink fails.
        println!("{}", self.colorize(record, &line));

        if let Some(file) = self.sink.as_mut() {
            match writeln!(file, "{line}").and_then(|_| file.flush()) {
                Ok(()) => self.write_failures = 0,
                Err(err) => {
                    self.write_failures += 1;
                    let path = self
                        .sink_path
                        .as_ref()
                        .map(|p| p.display().to_string())
                        .unwrap_or_default();
                    error!(
                        "failed to write alert record to {path} ({} of {} consecutive): {err}",
                        self.write_failures, self.max_write_failures
                    );
                    if self.write_failures >= self.max_write_failures {
                        return Err(WatchError::SinkFailed {
                            consecutive: self.write_failures,
                            source: err,
                        });
                    }
                }
            }
        }

        Ok(())
    }

    /// Flush the sink. Called on clean shutdown; also runs on drop.
    pub fn close(&mut self) -> Result<()> {
        if let Some(file) = self.sink.as_mut() {
            file.flush()?;
        }
        Ok(())
    }

    fn render(&self, record: &AlertRecord) -> Result<String> {
        if self.json {
            return Ok(serde_json::to_string(record)?);
        }
        Ok(format!(
            "{} [{}] pid={} name={} kind={} cpu={:.2}% mem={:.2}%",
            record.timestamp.to_rfc3339_opts(SecondsFormat::Secs, true),
            record.transition,
            record.pid,
            record.name,
            record.kind,
            record.cpu_percent,
            record.mem_percent,
        ))
    }

    fn colorize(&self, record: &AlertRecord, line: &str) -> String {
        if self.json {
            return line.to_string();
        }
        let tag = record.transition.to_string();
        let colored_tag = match record.transition {
            Transition::New => tag.red().bold(),
            Transition::Continuing => tag.yellow(),
            Transition::Recovery => tag.green(),
        };
        line.replacen(&format!("[{tag}]"), &format!("[{colored_tag}]"), 1)
    }
}

impl Drop for Reporter {
    fn drop(&mut self) {
        let _ = self.close();
    }
}
