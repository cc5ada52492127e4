/*!
# UDP rendezvous

A pair of endpoint threads, a transmitter and a listener, coordinated
through one shared phase word and exchanging ASCII counter datagrams
over loopback UDP. The [`Rendezvous`] coordinator owns the pair:
[`Rendezvous::start`] binds the sockets and spawns the threads,
[`Rendezvous::join`] winds them down within a bounded budget and
reports what each endpoint did.

```
use rendezvous_core::{CancelToken, Rendezvous, RendezvousConfig};
use std::sync::Arc;
use std::time::Duration;

let config = RendezvousConfig {
    port: 0, // bind an ephemeral listener port
    max_iterations: 2,
    recv_timeout: Duration::from_millis(200),
    send_cadence: Duration::from_millis(10),
    ..RendezvousConfig::default()
};

let report = Rendezvous::run(config, Arc::new(CancelToken::new()))?;
assert!(report.is_clean());
# anyhow::Ok(())
```
*/

mod cancel;
mod coordinator;
pub mod defaults;
pub mod handshake;
mod listener;
mod phase;
mod report;
mod state;
mod transmitter;
mod transport;

pub use self::{
    cancel::CancelToken,
    coordinator::Rendezvous,
    listener::Listener,
    phase::{Phase, Side},
    report::{EndpointOutcome, EndpointStatus, RendezvousReport, StopReason},
    state::{SharedState, StateError},
    transmitter::Transmitter,
    transport::{Transport, TransportError},
};

use std::time::Duration;

/// Resolved configuration of one rendezvous run.
///
/// The first three fields mirror the configuration file keys (`port`,
/// `buffer_size`, `maximum_num_of_iterations`); the rest are the timing
/// knobs of the endpoints and of the coordinator. No range validation
/// happens here, that is the configuration front-end's concern, and
/// `port` 0 is meaningful: the listener binds an ephemeral port and the
/// transmitter is aimed at whatever the OS assigned.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RendezvousConfig {
    /// Loopback port the listener binds.
    pub port: u16,
    /// Receive buffer size in bytes; longer datagrams are truncated.
    pub buffer_size: usize,
    /// Datagrams the transmitter sends before stopping on its own.
    pub max_iterations: u64,
    /// Upper bound on one blocking receive.
    pub recv_timeout: Duration,
    /// Receive timeouts tolerated before the listener gives up.
    pub retry_budget: u32,
    /// Pause between two transmitted datagrams.
    pub send_cadence: Duration,
    /// Worst case cancellation latency while waiting on phase changes.
    pub handshake_poll: Duration,
    /// Time granted to the endpoints to stop once a shutdown is
    /// initiated.
    pub join_timeout: Duration,
}

impl Default for RendezvousConfig {
    fn default() -> Self {
        Self {
            port: defaults::DEFAULT_PORT,
            buffer_size: defaults::DEFAULT_BUFFER_SIZE,
            max_iterations: defaults::DEFAULT_MAX_ITERATIONS,
            recv_timeout: defaults::RECV_TIMEOUT,
            retry_budget: defaults::RETRY_BUDGET,
            send_cadence: defaults::SEND_CADENCE,
            handshake_poll: defaults::HANDSHAKE_POLL,
            join_timeout: defaults::JOIN_TIMEOUT,
        }
    }
}
