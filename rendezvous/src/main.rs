//! Console front-end: command line, configuration file, logging and one
//! rendezvous run.

mod config;
mod input;
mod logger;

use anyhow::{bail, Result};
use clap::Parser;
use config::Config;
use log::{debug, info};
use logger::Logger;
use rendezvous_core::{CancelToken, Rendezvous};
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Appended across runs, next to the working directory.
const LOG_FILE: &str = "rendezvous.log";

/// Loopback UDP rendezvous between a transmitter and a listener thread.
#[derive(Debug, Parser)]
#[command(version, about)]
struct Args {
    /// Path to the configuration file (written with defaults when
    /// missing)
    #[arg(short, long, default_value = "./rendezvous.cfg")]
    config: PathBuf,

    /// Show debug level messages on the console
    #[arg(short, long, conflicts_with_all = ["verbose", "quiet"])]
    debug: bool,

    /// Show information level messages on the console
    #[arg(short, long, conflicts_with_all = ["debug", "quiet"])]
    verbose: bool,

    /// Only show error level messages on the console
    #[arg(short, long, conflicts_with_all = ["debug", "verbose"])]
    quiet: bool,
}

impl Args {
    /// The console sink level; the log file always records at debug.
    fn console_level(&self) -> log::LevelFilter {
        if self.debug {
            log::LevelFilter::Debug
        } else if self.verbose {
            log::LevelFilter::Info
        } else if self.quiet {
            log::LevelFilter::Error
        } else {
            log::LevelFilter::Warn
        }
    }
}

fn main() -> Result<()> {
    let args = Args::parse();

    Logger::init(args.console_level(), Path::new(LOG_FILE))?;
    info!("successfully opened log file named: {LOG_FILE}");
    debug!("program ran with the following arguments: {args:?}");

    let resolved = Config::load(&args.config)?.resolve()?;

    let cancel = Arc::new(CancelToken::new());
    input::watch_stdin(Arc::clone(&cancel))?;
    eprintln!("press Enter to stop the run early");

    let report = Rendezvous::run(resolved, cancel)?;
    println!("{report}");

    if !report.is_clean() {
        bail!("shutdown incomplete: {report}");
    }
    debug!("program execution completed");
    Ok(())
}
