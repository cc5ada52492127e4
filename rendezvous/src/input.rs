//! Console stop control.
//!
//! A dedicated thread blocks on stdin; the first complete line requests
//! cancellation of the run. Reaching end of file detaches the watcher
//! without cancelling, so a run with stdin closed (piped input, CI) is
//! bounded by the iteration cap alone.

use anyhow::{Context as _, Result};
use log::{debug, info};
use rendezvous_core::CancelToken;
use std::io::{self, BufRead as _};
use std::sync::Arc;
use std::thread;

/// Spawn the stdin watcher. The thread is detached on purpose: it may
/// outlive the run, parked in a blocking read nothing will interrupt.
pub fn watch_stdin(cancel: Arc<CancelToken>) -> Result<()> {
    thread::Builder::new()
        .name("stdin".to_owned())
        .spawn(move || {
            let stdin = io::stdin();
            let mut line = String::new();
            match stdin.lock().read_line(&mut line) {
                Ok(0) => debug!("stdin closed, only the iteration cap stops this run"),
                Ok(_) => {
                    info!("stop requested from the console");
                    cancel.cancel();
                }
                Err(error) => debug!("could not read stdin: {error}"),
            }
        })
        .context("failed to spawn the stdin watcher")?;
    Ok(())
}
