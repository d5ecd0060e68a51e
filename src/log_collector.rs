//! Decoupled logging pipeline for locator runs.
//!
//! ```text
//! log::info!() / log::warn!() ...
//!     |
//! [LogCollector]  (log::Log, non-blocking)
//!     |  crossbeam unbounded channel
//!     v
//! [writer thread] -> <log_dir>/<timestamp>.log
//! ```
//!
//! Every record is echoed to stderr immediately and persisted by a dedicated
//! OS thread, so logging works the same from async tasks, blocking tasks and
//! plain threads. [`LogCollector::wait_for_empty`] blocks until everything sent
//! before it has reached the file.

use chrono::Local;
use crossbeam_channel::{unbounded, Sender};
use log::{Level, LevelFilter, Log, Metadata, Record};
use std::fs::{self, File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::mpsc;

/// Internal log line or flush marker
enum LogMessage {
    Line(LogLine),
    /// Flush marker; the writer answers once everything before it is on disk
    Flush(mpsc::Sender<()>),
}

/// A log line with metadata
#[derive(Clone, Debug)]
pub struct LogLine {
    pub level: Level,
    pub message: String,
    /// Wall clock time the line was produced, `HH:MM:SS.mmm`
    pub timestamp: String,
}

impl LogLine {
    pub fn new(level: Level, message: impl Into<String>) -> Self {
        LogLine {
            level,
            message: message.into(),
            timestamp: Local::now().format("%H:%M:%S%.3f").to_string(),
        }
    }

    /// Line as written to the log file
    pub fn format(&self) -> String {
        format!("[{}] [{}] {}", self.timestamp, self.level, self.message)
    }
}

/// Path of a fresh per-run log file below `log_dir`
fn new_log_path(log_dir: &Path) -> PathBuf {
    log_dir.join(format!("{}.log", Local::now().format("%Y%m%d_%H%M%S")))
}

/// Logger persisting every record through a background writer thread
#[derive(Clone)]
pub struct LogCollector {
    tx: Sender<LogMessage>,
    log_path: PathBuf,
    level: LevelFilter,
    echo: bool,
}

impl LogCollector {
    /// Create the log directory and file, and start the writer thread
    pub fn new(log_dir: &Path, level: LevelFilter) -> io::Result<Self> {
        fs::create_dir_all(log_dir)?;
        let log_path = new_log_path(log_dir);
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&log_path)?;

        let (tx, rx) = unbounded::<LogMessage>();

        std::thread::Builder::new()
            .name("log-writer".to_string())
            .spawn(move || {
                let mut file: File = file;
                while let Ok(message) = rx.recv() {
                    match message {
                        LogMessage::Line(line) => {
                            let _ = writeln!(file, "{}", line.format());
                        }
                        LogMessage::Flush(done) => {
                            let _ = file.flush();
                            let _ = file.sync_data();
                            let _ = done.send(());
                        }
                    }
                }
                let _ = file.flush();
            })?;

        Ok(LogCollector {
            tx,
            log_path,
            level,
            echo: true,
        })
    }

    /// Disable the stderr echo (file only)
    pub fn quiet(mut self) -> Self {
        self.echo = false;
        self
    }

    pub fn log_path(&self) -> &Path {
        &self.log_path
    }

    pub fn level(&self) -> LevelFilter {
        self.level
    }

    /// Queue a line for the writer. Never blocks.
    pub fn push(&self, line: LogLine) {
        if self.echo {
            eprintln!("{}", line.format());
        }
        let _ = self.tx.send(LogMessage::Line(line));
    }

    /// Block until every line pushed so far has been written.
    ///
    /// Returns an error only if the writer thread is gone.
    pub fn wait_for_empty(&self) -> Result<(), String> {
        let (done_tx, done_rx) = mpsc::channel::<()>();
        self.tx
            .send(LogMessage::Flush(done_tx))
            .map_err(|e| format!("Failed to send flush marker: {}", e))?;
        done_rx
            .recv()
            .map_err(|e| format!("Flush signal interrupted: {}", e))
    }
}

/// Wires `log::info!()` and friends into the collector
impl Log for LogCollector {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= self.level
    }

    fn log(&self, record: &Record) {
        if self.enabled(record.metadata()) {
            self.push(LogLine::new(record.level(), record.args().to_string()));
        }
    }

    fn flush(&self) {
        let _ = self.wait_for_empty();
    }
}
