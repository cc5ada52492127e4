//! Dual sink logger.
//!
//! One [`log::Log`] implementation feeding two sinks: the console
//! (stderr), gated by the verbosity picked on the command line, and an
//! append-mode file that always records down to debug level. The file
//! is the place to look when a run behaved strangely regardless of how
//! quiet the console was. Each record carries the originating thread's
//! name, which is how the endpoint threads are told apart in a trace.

use anyhow::{Context as _, Result};
use chrono::Local;
use log::{LevelFilter, Record};
use std::fs::{File, OpenOptions};
use std::io::Write as _;
use std::path::Path;
use std::sync::{Mutex, PoisonError};
use std::thread;

pub struct Logger {
    console_level: LevelFilter,
    file: Mutex<File>,
}

impl Logger {
    /// Open (or create) the log file in append mode and install the
    /// logger. `console_level` gates the console sink only.
    pub fn init(console_level: LevelFilter, path: &Path) -> Result<()> {
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .with_context(|| {
                format!(
                    "error opening log file {} (it might be opened by another application)",
                    path.display()
                )
            })?;

        let logger = Self {
            console_level,
            file: Mutex::new(file),
        };
        log::set_boxed_logger(Box::new(logger)).context("a logger is already installed")?;
        log::set_max_level(LevelFilter::Debug);
        Ok(())
    }
}

impl log::Log for Logger {
    fn enabled(&self, metadata: &log::Metadata) -> bool {
        // the file sink always records down to debug
        metadata.level() <= LevelFilter::Debug
    }

    fn log(&self, record: &Record) {
        if !self.enabled(record.metadata()) {
            return;
        }

        if record.level() <= self.console_level {
            eprintln!("{}", console_line(record));
        }

        let line = file_line(record);
        let mut file = self.file.lock().unwrap_or_else(PoisonError::into_inner);
        // a failing log file write is not worth stopping the run for
        let _ = writeln!(file, "{line}");
    }

    fn flush(&self) {
        let mut file = self.file.lock().unwrap_or_else(PoisonError::into_inner);
        let _ = file.flush();
    }
}

fn thread_name() -> String {
    thread::current().name().unwrap_or("?").to_owned()
}

fn file_line(record: &Record) -> String {
    format!(
        "{stamp}, {thread:<8}, {target:<15} {level:<8} - {message}",
        stamp = Local::now().format("%Y/%m/%d %I:%M:%S %p"),
        thread = thread_name(),
        target = record.target(),
        level = record.level(),
        message = record.args()
    )
}

fn console_line(record: &Record) -> String {
    format!(
        "{thread:<8}, {target:<15}: {level:<8} {message}",
        thread = thread_name(),
        target = record.target(),
        level = record.level(),
        message = record.args()
    )
}
