//! Cancellation example: a long run is wound down from another thread
//! after two seconds, well before its iteration cap.
//!
//! Run with:
//!   cargo run --example cancel -p rendezvous-core

use anyhow::Result;
use rendezvous_core::{CancelToken, Rendezvous, RendezvousConfig};
use std::sync::Arc;
use std::time::Duration;

fn main() -> Result<()> {
    let config = RendezvousConfig {
        port: 0,
        max_iterations: 1_000_000,
        ..RendezvousConfig::default()
    };

    let cancel = Arc::new(CancelToken::new());
    let run = Rendezvous::start(config, Arc::clone(&cancel))?;

    let timer = std::thread::spawn(move || {
        std::thread::sleep(Duration::from_secs(2));
        println!("requesting cancellation");
        cancel.cancel();
    });

    let report = run.join();
    timer.join().unwrap();

    println!("{report}");
    Ok(())
}
