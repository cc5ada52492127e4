//! Basic example: a transmitter and a listener rendezvous over loopback
//! UDP and exchange a handful of counter datagrams.
//!
//! Run with:
//!   cargo run --example loopback -p rendezvous-core

use anyhow::Result;
use rendezvous_core::{CancelToken, Rendezvous, RendezvousConfig};
use std::sync::Arc;
use std::time::Duration;

fn main() -> Result<()> {
    let config = RendezvousConfig {
        // bind an ephemeral port instead of the default 11999
        port: 0,
        max_iterations: 5,
        send_cadence: Duration::from_millis(200),
        ..RendezvousConfig::default()
    };

    println!("running a {} datagram rendezvous...", config.max_iterations);

    let report = Rendezvous::run(config, Arc::new(CancelToken::new()))?;
    println!("{report}");

    Ok(())
}
